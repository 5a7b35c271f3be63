//! Assertion encryption.

use base64::Engine;
use kc_crypto::{RsaPublicKey, SymmetricKey};

use crate::error::{SamlError, SamlResult};
use crate::types::{
    digest_algorithms, encryption_algorithms, XMLDSIG_NS, XMLDSIG_PREFIX, XMLENC_NS, XMLENC_PREFIX,
};
use crate::xml::{Element, NamespaceScope, QualifiedName, XmlDocument};

use super::SamlEncryptor;

/// XML element encryptor (AES-GCM content, RSA-OAEP key transport).
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEncryptor;

impl XmlEncryptor {
    /// Creates a new encryptor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SamlEncryptor for XmlEncryptor {
    fn generate_symmetric_key(&self, bits: u32) -> SamlResult<SymmetricKey> {
        Ok(kc_crypto::generate_symmetric_key(bits)?)
    }

    fn encrypt_element(
        &self,
        document: &mut XmlDocument,
        target: &QualifiedName,
        replacement: &QualifiedName,
        recipient: &RsaPublicKey,
        key: &SymmetricKey,
    ) -> SamlResult<()> {
        let path = document
            .find_first(&target.namespace, &target.local_name)
            .ok_or_else(|| SamlError::ElementNotFound(target.to_string()))?;
        let parent_scope = document.parent_scope(&path);
        let element = document
            .element_at(&path)
            .ok_or_else(|| SamlError::ElementNotFound(target.to_string()))?;

        let plaintext = standalone(element, &parent_scope).to_xml_string();
        let sealed = kc_crypto::aes_gcm_seal(key, plaintext.as_bytes())?;
        let wrapped_key = kc_crypto::rsa_oaep_wrap(recipient, key)?;

        let prefix = replacement.prefix.clone().or_else(|| element.prefix.clone());
        let mut wrapper = Element::new(prefix.as_deref(), replacement.local_name.as_str());
        if parent_scope.lookup(prefix.as_deref()) != Some(replacement.namespace.as_str()) {
            wrapper = wrapper.with_namespace(prefix.as_deref(), replacement.namespace.as_str());
        }
        let wrapper = wrapper.with_child(encrypted_data(key, &sealed, &wrapped_key));

        document.replace_element(&path, wrapper)?;
        tracing::debug!(
            element = %target,
            algorithm = key.algorithm().uri(),
            "encrypted SAML element"
        );
        Ok(())
    }
}

/// Copies `element` with every namespace in scope declared on it.
fn standalone(element: &Element, parent_scope: &NamespaceScope) -> Element {
    let mut fragment = element.clone();
    let inherited = parent_scope
        .effective()
        .into_iter()
        .filter(|decl| !decl.uri.is_empty())
        .filter(|decl| !element.namespaces.iter().any(|own| own.prefix == decl.prefix));
    let mut namespaces: Vec<_> = inherited.collect();
    namespaces.append(&mut fragment.namespaces);
    fragment.namespaces = namespaces;
    fragment
}

fn xenc(local_name: &str) -> Element {
    Element::new(Some(XMLENC_PREFIX), local_name)
}

fn cipher_data(bytes: &[u8]) -> Element {
    xenc("CipherData").with_child(
        xenc("CipherValue").with_text(base64::engine::general_purpose::STANDARD.encode(bytes)),
    )
}

fn encrypted_data(key: &SymmetricKey, sealed: &[u8], wrapped_key: &[u8]) -> Element {
    let encrypted_key = xenc("EncryptedKey")
        .with_child(
            xenc("EncryptionMethod")
                .with_attribute("Algorithm", encryption_algorithms::RSA_OAEP_MGF1P)
                .with_child(
                    Element::new(Some(XMLDSIG_PREFIX), "DigestMethod")
                        .with_attribute("Algorithm", digest_algorithms::SHA1),
                ),
        )
        .with_child(cipher_data(wrapped_key));

    xenc("EncryptedData")
        .with_namespace(Some(XMLENC_PREFIX), XMLENC_NS)
        .with_attribute("Type", encryption_algorithms::TYPE_ELEMENT)
        .with_child(xenc("EncryptionMethod").with_attribute("Algorithm", key.algorithm().uri()))
        .with_child(
            Element::new(Some(XMLDSIG_PREFIX), "KeyInfo")
                .with_namespace(Some(XMLDSIG_PREFIX), XMLDSIG_NS)
                .with_child(encrypted_key),
        )
        .with_child(cipher_data(sealed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SAMLP_NS, SAML_NS};
    use kc_crypto::RsaKeyPair;

    const RESPONSE: &str = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r"><saml:Issuer>https://idp.example</saml:Issuer><saml:Assertion ID="_a1"><saml:Subject>alice</saml:Subject></saml:Assertion><saml:Assertion ID="_a2"/></samlp:Response>"#;

    fn recipient() -> RsaPublicKey {
        RsaKeyPair::from_pem(include_str!("../../tests/fixtures/sp-key.pem"))
            .unwrap()
            .public_key()
            .clone()
    }

    fn assertion() -> QualifiedName {
        QualifiedName::new(SAML_NS, "Assertion")
    }

    fn encrypted_assertion() -> QualifiedName {
        QualifiedName::new(SAML_NS, "EncryptedAssertion")
    }

    #[test]
    fn first_assertion_is_replaced_with_inherited_prefix() {
        let encryptor = XmlEncryptor::new();
        let key = encryptor.generate_symmetric_key(128).unwrap();
        let mut doc = XmlDocument::parse(RESPONSE).unwrap();

        encryptor
            .encrypt_element(&mut doc, &assertion(), &encrypted_assertion(), &recipient(), &key)
            .unwrap();

        let names: Vec<_> = doc
            .root()
            .child_elements()
            .map(|(_, e)| e.qualified_name())
            .collect();
        assert_eq!(names, ["saml:Issuer", "saml:EncryptedAssertion", "saml:Assertion"]);

        let xml = doc.to_xml_string();
        assert!(!xml.contains("alice"));
        assert!(xml.contains("<saml:EncryptedAssertion><xenc:EncryptedData"));
        assert!(xml.contains("http://www.w3.org/2009/xmlenc11#aes128-gcm"));
        assert!(xml.contains(encryption_algorithms::RSA_OAEP_MGF1P));
        assert!(xml.contains(r#"ID="_a2""#));
    }

    #[test]
    fn missing_target_is_element_not_found() {
        let encryptor = XmlEncryptor::new();
        let key = encryptor.generate_symmetric_key(256).unwrap();
        let mut doc =
            XmlDocument::parse(&format!(r#"<samlp:Response xmlns:samlp="{SAMLP_NS}"/>"#)).unwrap();

        let err = encryptor
            .encrypt_element(&mut doc, &assertion(), &encrypted_assertion(), &recipient(), &key)
            .unwrap_err();
        assert!(matches!(err, SamlError::ElementNotFound(_)));
    }

    #[test]
    fn default_namespace_wrapper_declares_namespace_when_needed() {
        let encryptor = XmlEncryptor::new();
        let key = encryptor.generate_symmetric_key(128).unwrap();
        let mut doc = XmlDocument::parse(&format!(
            r#"<Response xmlns="{SAMLP_NS}"><Assertion xmlns="{SAML_NS}"/></Response>"#
        ))
        .unwrap();

        encryptor
            .encrypt_element(&mut doc, &assertion(), &encrypted_assertion(), &recipient(), &key)
            .unwrap();
        assert!(doc
            .to_xml_string()
            .contains(&format!(r#"<EncryptedAssertion xmlns="{SAML_NS}">"#)));
    }

    #[test]
    fn unsupported_key_size_is_rejected() {
        assert!(matches!(
            XmlEncryptor::new().generate_symmetric_key(192),
            Err(SamlError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn standalone_fragment_declares_inherited_namespaces() {
        let doc = XmlDocument::parse(RESPONSE).unwrap();
        let path = doc.find_first(SAML_NS, "Assertion").unwrap();
        let fragment = standalone(doc.element_at(&path).unwrap(), &doc.parent_scope(&path));
        let xml = fragment.to_xml_string();
        assert!(xml.starts_with("<saml:Assertion xmlns:samlp="));
        assert!(xml.contains(&format!(r#"xmlns:saml="{SAML_NS}""#)));
    }
}
