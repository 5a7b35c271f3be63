//! Owned XML document tree.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::escape;
use crate::error::{SamlError, SamlResult};
use crate::types::XML_NS;

/// Namespace-qualified element name.
///
/// `prefix` is only a rendering hint for newly created elements; matching
/// uses the namespace URI and local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    /// Namespace URI.
    pub namespace: String,
    /// Local name.
    pub local_name: String,
    /// Preferred prefix.
    pub prefix: Option<String>,
}

impl QualifiedName {
    /// Creates a name without a preferred prefix.
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
            prefix: None,
        }
    }

    /// Sets the preferred prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local_name)
    }
}

/// Namespace declaration (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Declared prefix, `None` for the default namespace.
    pub prefix: Option<String>,
    /// Namespace URI; empty undeclares the default namespace.
    pub uri: String,
}

impl NamespaceDecl {
    /// Creates a declaration.
    pub fn new(prefix: Option<&str>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            uri: uri.into(),
        }
    }
}

/// Non-namespace attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Prefix, if the attribute name is qualified.
    pub prefix: Option<String>,
    /// Local name.
    pub local_name: String,
    /// Unescaped value.
    pub value: String,
}

impl Attribute {
    /// Returns the attribute name as written (`prefix:local` or `local`).
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified(self.prefix.as_deref(), &self.local_name)
    }
}

/// Child node of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Child element.
    Element(Element),
    /// Character data (unescaped).
    Text(String),
    /// CDATA section contents.
    CData(String),
    /// Comment contents.
    Comment(String),
    /// Processing instruction contents (`target data`).
    ProcessingInstruction(String),
}

/// XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Prefix, `None` when in the default namespace.
    pub prefix: Option<String>,
    /// Local name.
    pub local_name: String,
    /// Namespace declarations made on this element.
    pub namespaces: Vec<NamespaceDecl>,
    /// Attributes other than namespace declarations, in document order.
    pub attributes: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an empty element.
    pub fn new(prefix: Option<&str>, local_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local_name: local_name.into(),
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a namespace declaration.
    #[must_use]
    pub fn with_namespace(mut self, prefix: Option<&str>, uri: impl Into<String>) -> Self {
        self.namespaces.push(NamespaceDecl::new(prefix, uri));
        self
    }

    /// Adds an unqualified attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Returns the element name as written.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified(self.prefix.as_deref(), &self.local_name)
    }

    /// Returns the value of an attribute by its written name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.qualified_name() == name)
            .map(|a| a.value.as_str())
    }

    /// Sets an unqualified attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.prefix.is_none() && a.local_name == name)
        {
            existing.value = value;
        } else {
            self.attributes.push(Attribute {
                prefix: None,
                local_name: name,
                value,
            });
        }
    }

    /// Iterates over child elements with their index in `children`.
    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &Self)> {
        self.children.iter().enumerate().filter_map(|(i, n)| match n {
            Node::Element(e) => Some((i, e)),
            _ => None,
        })
    }

    /// Finds the first child element with the given namespace and local name.
    ///
    /// `scope` must be the namespace scope of `self` (including its own
    /// declarations).
    #[must_use]
    pub fn find_child(
        &self,
        scope: &NamespaceScope,
        namespace: &str,
        local_name: &str,
    ) -> Option<(usize, &Self)> {
        self.child_elements().find(|(_, child)| {
            child.local_name == local_name && scope.namespace_of(child).as_deref() == Some(namespace)
        })
    }

    /// Concatenated text and CDATA content of this element and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Serializes the element and its subtree.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) | Node::CData(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
            Node::Comment(_) | Node::ProcessingInstruction(_) => {}
        }
    }
}

/// In-scope namespace bindings, innermost last.
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    bindings: Vec<NamespaceDecl>,
}

impl NamespaceScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scope inside `element`.
    #[must_use]
    pub fn enter(&self, element: &Element) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.extend(element.namespaces.iter().cloned());
        Self { bindings }
    }

    /// Adds a binding.
    pub fn push(&mut self, decl: NamespaceDecl) {
        self.bindings.push(decl);
    }

    /// Resolves a prefix (`None` for the default namespace).
    ///
    /// An empty default namespace resolves to `None`.
    #[must_use]
    pub fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        self.bindings
            .iter()
            .rev()
            .find(|d| d.prefix.as_deref() == prefix)
            .map(|d| d.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// Resolves the namespace of `element`, a child of the element this scope belongs to.
    #[must_use]
    pub fn namespace_of(&self, element: &Element) -> Option<String> {
        let prefix = element.prefix.as_deref();
        if let Some(own) = element
            .namespaces
            .iter()
            .rev()
            .find(|d| d.prefix.as_deref() == prefix)
        {
            return (!own.uri.is_empty()).then(|| own.uri.clone());
        }
        self.lookup(prefix).map(str::to_string)
    }

    /// Returns the effective bindings, one per prefix, innermost winning.
    #[must_use]
    pub fn effective(&self) -> Vec<NamespaceDecl> {
        let mut seen: Vec<NamespaceDecl> = Vec::new();
        for decl in self.bindings.iter().rev() {
            if !seen.iter().any(|d| d.prefix == decl.prefix) {
                seen.push(decl.clone());
            }
        }
        seen.reverse();
        seen
    }
}

/// Parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    has_declaration: bool,
    root: Element,
}

impl XmlDocument {
    /// Wraps a root element; no XML declaration is written.
    #[must_use]
    pub const fn new(root: Element) -> Self {
        Self {
            has_declaration: false,
            root,
        }
    }

    /// Parses a document.
    ///
    /// Line breaks are normalized to `\n` and literal whitespace in
    /// attribute values to spaces, as an XML processor must before handing
    /// the document on. Document type declarations are rejected.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::XmlParse` for malformed input.
    pub fn parse(xml: &str) -> SamlResult<Self> {
        let xml = normalize_line_breaks(xml);
        let mut reader = Reader::from_str(&xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut has_declaration = false;

        loop {
            match reader.read_event()? {
                Event::Decl(_) => has_declaration = true,
                Event::DocType(_) => {
                    return Err(SamlError::XmlParse(
                        "document type declarations are not allowed".to_string(),
                    ));
                }
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(end) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SamlError::XmlParse("unexpected end tag".to_string()))?;
                    if end.name().as_ref() != element.qualified_name().as_bytes() {
                        return Err(SamlError::XmlParse(format!(
                            "mismatched end tag for {}",
                            element.qualified_name()
                        )));
                    }
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let value = text.unescape()?.into_owned();
                    push_child(&mut stack, Node::Text(value))?;
                }
                Event::CData(cdata) => {
                    let value = utf8(&cdata)?;
                    push_child(&mut stack, Node::CData(value))?;
                }
                Event::Comment(comment) => {
                    let value = utf8(&comment)?;
                    push_child(&mut stack, Node::Comment(value))?;
                }
                Event::PI(pi) => {
                    let value = utf8(&pi)?;
                    push_child(&mut stack, Node::ProcessingInstruction(value))?;
                }
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(SamlError::XmlParse("unclosed element".to_string()));
        }
        let root = root.ok_or_else(|| SamlError::XmlParse("document has no root".to_string()))?;
        Ok(Self {
            has_declaration,
            root,
        })
    }

    /// Whether the source document carried an XML declaration.
    #[must_use]
    pub const fn has_declaration(&self) -> bool {
        self.has_declaration
    }

    /// Returns the root element.
    #[must_use]
    pub const fn root(&self) -> &Element {
        &self.root
    }

    /// Returns the root element mutably.
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Namespace scope inside the root element.
    #[must_use]
    pub fn root_scope(&self) -> NamespaceScope {
        NamespaceScope::new().enter(&self.root)
    }

    /// Finds the first element (document order) with the given namespace and local name.
    ///
    /// Returns the child-index path from the root; the root itself is `[]`.
    #[must_use]
    pub fn find_first(&self, namespace: &str, local_name: &str) -> Option<Vec<usize>> {
        let scope = NamespaceScope::new();
        let mut path = Vec::new();
        find_in(&self.root, &scope, namespace, local_name, &mut path).then_some(path)
    }

    /// Returns the element at `path`.
    #[must_use]
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = &self.root;
        for &index in path {
            match current.children.get(index) {
                Some(Node::Element(e)) => current = e,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Namespace scope of the parent of the element at `path`.
    #[must_use]
    pub fn parent_scope(&self, path: &[usize]) -> NamespaceScope {
        let mut scope = NamespaceScope::new();
        let mut current = &self.root;
        for &index in path {
            scope = scope.enter(current);
            if let Some(Node::Element(e)) = current.children.get(index) {
                current = e;
            }
        }
        scope
    }

    /// Replaces the element at `path`, returning the previous element.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::ElementNotFound` if `path` does not address an element.
    pub fn replace_element(&mut self, path: &[usize], replacement: Element) -> SamlResult<Element> {
        let Some((&last, parents)) = path.split_last() else {
            return Ok(std::mem::replace(&mut self.root, replacement));
        };
        let mut current = &mut self.root;
        for &index in parents {
            current = match current.children.get_mut(index) {
                Some(Node::Element(e)) => e,
                _ => return Err(SamlError::ElementNotFound(format!("path {path:?}"))),
            };
        }
        match current.children.get_mut(last) {
            Some(Node::Element(e)) => Ok(std::mem::replace(e, replacement)),
            _ => Err(SamlError::ElementNotFound(format!("path {path:?}"))),
        }
    }

    /// Serializes the document, with an XML declaration if the source had one.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if self.has_declaration {
            out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        }
        write_element(&self.root, &mut out);
        out
    }
}

fn find_in(
    element: &Element,
    parent_scope: &NamespaceScope,
    namespace: &str,
    local_name: &str,
    path: &mut Vec<usize>,
) -> bool {
    if element.local_name == local_name
        && parent_scope.namespace_of(element).as_deref() == Some(namespace)
    {
        return true;
    }
    let scope = parent_scope.enter(element);
    for (index, child) in element.child_elements() {
        path.push(index);
        if find_in(child, &scope, namespace, local_name, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn utf8(bytes: &[u8]) -> SamlResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| SamlError::XmlParse(e.to_string()))
}

fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local}"),
        None => local.to_string(),
    }
}

fn normalize_line_breaks(xml: &str) -> Cow<'_, str> {
    if xml.contains('\r') {
        Cow::Owned(xml.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(xml)
    }
}

fn element_from_start(start: &BytesStart<'_>) -> SamlResult<Element> {
    let name = utf8(start.name().as_ref())?;
    let (prefix, local) = split_name(&name);
    let mut element = Element::new(prefix, local);

    for attr in start.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?;
        let raw = utf8(&attr.value)?.replace(['\t', '\n'], " ");
        let value = quick_xml::escape::unescape(&raw)?.into_owned();
        match split_name(&key) {
            (None, "xmlns") => element.namespaces.push(NamespaceDecl::new(None, value)),
            (Some("xmlns"), p) => element.namespaces.push(NamespaceDecl::new(Some(p), value)),
            (prefix, local) => element.attributes.push(Attribute {
                prefix: prefix.map(str::to_string),
                local_name: local.to_string(),
                value,
            }),
        }
    }
    Ok(element)
}

fn push_child(stack: &mut [Element], node: Node) -> SamlResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        // Whitespace, comments and PIs around the root are dropped.
        None => match node {
            Node::Text(t) if !t.trim().is_empty() => {
                Err(SamlError::XmlParse("text outside of root element".to_string()))
            }
            _ => Ok(()),
        },
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> SamlResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(SamlError::XmlParse("multiple root elements".to_string()));
    }
    *root = Some(element);
    Ok(())
}

fn write_element(element: &Element, out: &mut String) {
    let name = element.qualified_name();
    out.push('<');
    out.push_str(&name);
    for ns in &element.namespaces {
        match &ns.prefix {
            Some(p) => out.push_str(&format!(" xmlns:{p}=\"{}\"", escape::attr(&ns.uri))),
            None => out.push_str(&format!(" xmlns=\"{}\"", escape::attr(&ns.uri))),
        }
    }
    for attr in &element.attributes {
        out.push_str(&format!(
            " {}=\"{}\"",
            attr.qualified_name(),
            escape::attr(&attr.value)
        ));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(e, out),
            Node::Text(t) => out.push_str(&escape::text(t)),
            Node::CData(t) => out.push_str(&format!("<![CDATA[{t}]]>")),
            Node::Comment(t) => out.push_str(&format!("<!--{t}-->")),
            Node::ProcessingInstruction(t) => out.push_str(&format!("<?{t}?>")),
        }
    }
    out.push_str(&format!("</{name}>"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SAMLP_NS, SAML_NS};

    const RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?><samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r1"><saml:Issuer>https://idp.example</saml:Issuer><saml:Assertion ID="_a1"><saml:Subject>alice &amp; bob</saml:Subject></saml:Assertion></samlp:Response>"#;

    #[test]
    fn parse_and_serialize_preserves_document() {
        let doc = XmlDocument::parse(RESPONSE).unwrap();
        assert!(doc.has_declaration());
        assert_eq!(doc.to_xml_string(), RESPONSE);
    }

    #[test]
    fn declaration_is_not_invented() {
        let doc = XmlDocument::parse("<a/>").unwrap();
        assert!(!doc.has_declaration());
        assert_eq!(doc.to_xml_string(), "<a/>");
    }

    #[test]
    fn find_first_resolves_namespaces() {
        let doc = XmlDocument::parse(RESPONSE).unwrap();
        assert_eq!(doc.find_first(SAMLP_NS, "Response"), Some(vec![]));
        let path = doc.find_first(SAML_NS, "Assertion").unwrap();
        assert_eq!(path, vec![1]);
        assert_eq!(doc.element_at(&path).unwrap().attribute("ID"), Some("_a1"));
        assert_eq!(doc.find_first(SAMLP_NS, "Assertion"), None);
    }

    #[test]
    fn default_namespace_matches() {
        let doc = XmlDocument::parse(
            r#"<Response xmlns="urn:oasis:names:tc:SAML:2.0:protocol"><Assertion xmlns="urn:oasis:names:tc:SAML:2.0:assertion"/></Response>"#,
        )
        .unwrap();
        assert_eq!(doc.find_first(SAML_NS, "Assertion"), Some(vec![0]));
    }

    #[test]
    fn first_match_wins() {
        let doc = XmlDocument::parse(
            r#"<r xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"><saml:Assertion ID="one"/><saml:Assertion ID="two"/></r>"#,
        )
        .unwrap();
        let path = doc.find_first(SAML_NS, "Assertion").unwrap();
        assert_eq!(doc.element_at(&path).unwrap().attribute("ID"), Some("one"));
    }

    #[test]
    fn text_is_unescaped() {
        let doc = XmlDocument::parse(RESPONSE).unwrap();
        assert_eq!(doc.root().text_content(), "https://idp.examplealice & bob");
    }

    #[test]
    fn replace_element_swaps_subtree() {
        let mut doc = XmlDocument::parse(RESPONSE).unwrap();
        let path = doc.find_first(SAML_NS, "Assertion").unwrap();
        let old = doc
            .replace_element(&path, Element::new(Some("saml"), "EncryptedAssertion"))
            .unwrap();
        assert_eq!(old.local_name, "Assertion");
        assert!(doc.to_xml_string().contains("<saml:EncryptedAssertion/>"));
        assert_eq!(doc.find_first(SAML_NS, "Assertion"), None);
    }

    #[test]
    fn parent_scope_includes_ancestors() {
        let doc = XmlDocument::parse(RESPONSE).unwrap();
        let scope = doc.parent_scope(&[1]);
        assert_eq!(scope.lookup(Some("saml")), Some(SAML_NS));
        assert_eq!(scope.lookup(Some("xs")), None);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        for bad in [
            "",
            "<a>",
            "<a></b>",
            "<a/><b/>",
            "<!DOCTYPE a [<!ENTITY x \"y\">]><a>&x;</a>",
        ] {
            assert!(
                matches!(XmlDocument::parse(bad), Err(SamlError::XmlParse(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn attribute_values_survive_serialization() {
        let doc = XmlDocument::parse(r#"<a v="x &quot;y&quot; &amp; &lt;z&gt;"/>"#).unwrap();
        assert_eq!(doc.root().attribute("v"), Some(r#"x "y" & <z>"#));
        let again = XmlDocument::parse(&doc.to_xml_string()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn line_breaks_normalize_on_parse() {
        let doc = XmlDocument::parse("<a v=\"1\r\n2\">x\r\ny\rz</a>").unwrap();
        assert_eq!(doc.root().text_content(), "x\ny\nz");
        assert_eq!(doc.root().attribute("v"), Some("1 2"));
        assert_eq!(doc.to_xml_string(), "<a v=\"1 2\">x\ny\nz</a>");
    }

    #[test]
    fn carriage_return_references_survive_serialization() {
        let doc = XmlDocument::parse("<a>x&#xD;</a>").unwrap();
        assert_eq!(doc.root().text_content(), "x\r");
        assert_eq!(doc.to_xml_string(), "<a>x&#xD;</a>");
    }
}

