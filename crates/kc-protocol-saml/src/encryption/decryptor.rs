//! Assertion decryption.

use base64::Engine;
use kc_crypto::{ContentEncryptionAlgorithm, RsaKeyPair};

use crate::error::{SamlError, SamlResult};
use crate::types::{XMLDSIG_NS, XMLENC_NS};
use crate::xml::{Element, NamespaceScope, QualifiedName, XmlDocument};

/// Reverses [`super::XmlEncryptor`] with the recipient's private key.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDecryptor;

impl XmlDecryptor {
    /// Creates a new decryptor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Replaces the first `wrapper` element with the element it encrypts.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::ElementNotFound` if the wrapper or its encryption
    /// structure is missing, `SamlError::UnsupportedAlgorithm` for an unknown
    /// content algorithm and `SamlError::DecryptionFailure` if the key or
    /// content cannot be recovered.
    pub fn decrypt_element(
        &self,
        document: &mut XmlDocument,
        wrapper: &QualifiedName,
        key_pair: &RsaKeyPair,
    ) -> SamlResult<()> {
        let path = document
            .find_first(&wrapper.namespace, &wrapper.local_name)
            .ok_or_else(|| SamlError::ElementNotFound(wrapper.to_string()))?;
        let element = document
            .element_at(&path)
            .ok_or_else(|| SamlError::ElementNotFound(wrapper.to_string()))?;
        let scope = document.parent_scope(&path).enter(element);

        let (encrypted_data, scope) = child(element, &scope, XMLENC_NS, "EncryptedData")?;
        let (method, _) = child(encrypted_data, &scope, XMLENC_NS, "EncryptionMethod")?;
        let method_uri = method.attribute("Algorithm").unwrap_or_default();
        let algorithm = ContentEncryptionAlgorithm::from_uri(method_uri)
            .ok_or_else(|| SamlError::UnsupportedAlgorithm(method_uri.to_string()))?;

        let (key_info, key_info_scope) = child(encrypted_data, &scope, XMLDSIG_NS, "KeyInfo")?;
        let (encrypted_key, encrypted_key_scope) =
            child(key_info, &key_info_scope, XMLENC_NS, "EncryptedKey")?;
        let wrapped_key = cipher_value(encrypted_key, &encrypted_key_scope)?;
        let sealed = cipher_value(encrypted_data, &scope)?;

        let key = kc_crypto::rsa_oaep_unwrap(key_pair, algorithm, &wrapped_key)?;
        let plaintext = kc_crypto::aes_gcm_open(&key, &sealed)?;
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| SamlError::DecryptionFailure("plaintext is not UTF-8".to_string()))?;

        let restored = XmlDocument::parse(&plaintext)?.root().clone();
        document.replace_element(&path, restored)?;
        tracing::debug!(element = %wrapper, "decrypted SAML element");
        Ok(())
    }
}

fn child<'a>(
    parent: &'a Element,
    scope: &NamespaceScope,
    namespace: &str,
    local_name: &str,
) -> SamlResult<(&'a Element, NamespaceScope)> {
    parent
        .find_child(scope, namespace, local_name)
        .map(|(_, element)| (element, scope.enter(element)))
        .ok_or_else(|| SamlError::ElementNotFound(format!("{{{namespace}}}{local_name}")))
}

fn cipher_value(parent: &Element, scope: &NamespaceScope) -> SamlResult<Vec<u8>> {
    let (cipher_data, scope) = child(parent, scope, XMLENC_NS, "CipherData")?;
    let (value, _) = child(cipher_data, &scope, XMLENC_NS, "CipherValue")?;
    let compact: String = value
        .text_content()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| SamlError::DecryptionFailure(format!("invalid CipherValue: {e}")))
}
