//! Exclusive XML Canonicalization 1.0 (without comments).
//!
//! Only namespace declarations that are visibly utilized by an element or
//! its attributes are rendered, and only where the nearest rendered
//! ancestor does not already bind the prefix to the same URI.

use super::document::{Element, NamespaceDecl, NamespaceScope, Node};
use super::escape;

/// Canonicalizes `element`.
///
/// `parent_scope` resolves prefixes declared on ancestors that are not part
/// of the output; pass an empty scope for a document root.
#[must_use]
pub fn canonicalize(element: &Element, parent_scope: &NamespaceScope) -> String {
    let mut out = String::new();
    write_element(element, parent_scope, &[], &mut out);
    out
}

fn write_element(
    element: &Element,
    parent_scope: &NamespaceScope,
    rendered: &[NamespaceDecl],
    out: &mut String,
) {
    let scope = parent_scope.enter(element);

    let mut utilized: Vec<Option<&str>> = vec![element.prefix.as_deref()];
    for attr in &element.attributes {
        if let Some(prefix) = attr.prefix.as_deref() {
            if prefix != "xml" && !utilized.contains(&Some(prefix)) {
                utilized.push(Some(prefix));
            }
        }
    }

    let mut emitted: Vec<NamespaceDecl> = Vec::new();
    for prefix in utilized {
        let uri = scope.lookup(prefix).unwrap_or("");
        let current = rendered
            .iter()
            .rev()
            .find(|d| d.prefix.as_deref() == prefix)
            .map_or("", |d| d.uri.as_str());
        if uri != current {
            emitted.push(NamespaceDecl::new(prefix, uri));
        }
    }
    // Default namespace sorts first, then by prefix.
    emitted.sort_by(|a, b| a.prefix.cmp(&b.prefix));

    let mut attributes: Vec<(&str, &str, &str, String)> = element
        .attributes
        .iter()
        .map(|a| {
            let ns = a
                .prefix
                .as_deref()
                .and_then(|p| scope.lookup(Some(p)))
                .unwrap_or("");
            (ns, a.local_name.as_str(), a.value.as_str(), a.qualified_name())
        })
        .collect();
    attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let name = element.qualified_name();
    out.push('<');
    out.push_str(&name);
    for decl in &emitted {
        match &decl.prefix {
            Some(p) => {
                out.push_str(" xmlns:");
                out.push_str(p);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        out.push_str(&escape::attr(&decl.uri));
        out.push('"');
    }
    for (_, _, value, qname) in &attributes {
        out.push(' ');
        out.push_str(qname);
        out.push_str("=\"");
        out.push_str(&escape::attr(value));
        out.push('"');
    }
    out.push('>');

    let mut child_rendered = rendered.to_vec();
    child_rendered.extend(emitted);

    for child in &element.children {
        match child {
            Node::Element(e) => write_element(e, &scope, &child_rendered, out),
            Node::Text(t) | Node::CData(t) => out.push_str(&escape::text(t)),
            Node::ProcessingInstruction(t) => {
                out.push_str("<?");
                out.push_str(t);
                out.push_str("?>");
            }
            Node::Comment(_) => {}
        }
    }

    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn c14n(xml: &str) -> String {
        let doc = XmlDocument::parse(xml).unwrap();
        canonicalize(doc.root(), &NamespaceScope::new())
    }

    #[test]
    fn empty_elements_are_expanded() {
        assert_eq!(c14n("<a><b/></a>"), "<a><b></b></a>");
    }

    #[test]
    fn attributes_are_sorted_and_unused_namespaces_dropped() {
        assert_eq!(
            c14n(r#"<a xmlns:unused="urn:u" z="1" b="2"/>"#),
            r#"<a b="2" z="1"></a>"#
        );
    }

    #[test]
    fn namespaces_render_where_first_used() {
        assert_eq!(
            c14n(r#"<p:a xmlns:p="urn:p" xmlns:q="urn:q"><q:b><p:c/></q:b></p:a>"#),
            r#"<p:a xmlns:p="urn:p"><q:b xmlns:q="urn:q"><p:c></p:c></q:b></p:a>"#
        );
    }

    #[test]
    fn qualified_attributes_sort_by_namespace_uri() {
        assert_eq!(
            c14n(r#"<a xmlns:y="urn:a" xmlns:x="urn:b" x:attr="1" y:attr="2" plain="3"/>"#),
            r#"<a xmlns:x="urn:b" xmlns:y="urn:a" plain="3" y:attr="2" x:attr="1"></a>"#
        );
    }

    #[test]
    fn comments_are_removed_and_text_escaped() {
        assert_eq!(
            c14n("<a><!-- note -->x &amp; y &gt; z<![CDATA[<raw>]]></a>"),
            "<a>x &amp; y &gt; z&lt;raw&gt;</a>"
        );
    }

    #[test]
    fn inherited_namespace_is_rendered_on_subtree() {
        let doc = XmlDocument::parse(
            r#"<samlp:Response xmlns:samlp="urn:p" xmlns:saml="urn:a"><saml:Assertion ID="x"/></samlp:Response>"#,
        )
        .unwrap();
        let scope = doc.parent_scope(&[0]);
        let assertion = doc.element_at(&[0]).unwrap();
        assert_eq!(
            canonicalize(assertion, &scope),
            r#"<saml:Assertion xmlns:saml="urn:a" ID="x"></saml:Assertion>"#
        );
    }

    #[test]
    fn serialization_form_does_not_change_canonical_form() {
        let compact = c14n(r#"<a xmlns="urn:d" b='1'><c/></a>"#);
        let verbose = c14n(r#"<a b="1" xmlns="urn:d"><c></c></a>"#);
        assert_eq!(compact, verbose);
        assert_eq!(compact, r#"<a xmlns="urn:d" b="1"><c></c></a>"#);
    }

    // Expected forms below match `xmllint --exc-c14n`.

    #[test]
    fn line_breaks_are_normalized() {
        assert_eq!(c14n("<a>line1\r\nline2\rline3</a>"), "<a>line1\nline2\nline3</a>");
    }

    #[test]
    fn literal_attribute_whitespace_becomes_spaces() {
        assert_eq!(c14n("<a v=\"x\ny\tz\r\nw\"/>"), r#"<a v="x y z w"></a>"#);
    }

    #[test]
    fn whitespace_character_references_are_kept() {
        assert_eq!(
            c14n(r#"<a v="x&#xA;y&#x9;z&#xD;">t&#xD;</a>"#),
            r#"<a v="x&#xA;y&#x9;z&#xD;">t&#xD;</a>"#
        );
    }

    #[test]
    fn xml_attributes_sort_by_namespace_without_declaration() {
        assert_eq!(
            c14n(r#"<a xml:lang="en" z="1"/>"#),
            r#"<a z="1" xml:lang="en"></a>"#
        );
    }

    #[test]
    fn default_namespace_undeclaration_is_rendered_once() {
        assert_eq!(
            c14n(r#"<a xmlns="urn:d"><b xmlns=""><c/></b></a>"#),
            r#"<a xmlns="urn:d"><b xmlns=""><c></c></b></a>"#
        );
        assert_eq!(c14n(r#"<b xmlns=""><c/></b>"#), "<b><c></c></b>");
    }
}
