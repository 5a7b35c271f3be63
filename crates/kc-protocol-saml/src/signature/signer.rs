//! XML Signature creation.
//!
//! Produces enveloped XML-DSig signatures over a whole SAML document and
//! detached signatures over raw bytes for the HTTP-Redirect binding.

use base64::Engine;
use kc_crypto::{Certificate, RsaKeyPair};

use crate::error::{SamlError, SamlResult};
use crate::types::{canonicalization_algorithms, SAML_NS, XMLDSIG_NS, XMLDSIG_PREFIX};
use crate::xml::{c14n, Element, NamespaceDecl, NamespaceScope, Node, XmlDocument};

use super::SignatureAlgorithm;

/// Signing operations used by the response builder.
///
/// Implementations must be deterministic about placement: the signature
/// covers the document as it is at call time.
pub trait SamlSigner: Send + Sync {
    /// Adds an enveloped `ds:Signature` over the document root.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SigningFailure` if the RSA operation fails.
    fn sign_document(
        &self,
        document: &mut XmlDocument,
        key_pair: &RsaKeyPair,
        algorithm: SignatureAlgorithm,
        certificate: Option<&Certificate>,
    ) -> SamlResult<()>;

    /// Signs raw bytes with RSA PKCS#1 v1.5.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SigningFailure` if the RSA operation fails.
    fn sign_bytes(
        &self,
        data: &[u8],
        key_pair: &RsaKeyPair,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<Vec<u8>>;
}

/// XML document signer.
///
/// Reference `#ID` of the root (or `""` when the root has no `ID`),
/// enveloped-signature and exclusive C14N transforms, `ds:Signature`
/// placed directly after the root's `saml:Issuer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSigner;

impl XmlSigner {
    /// Creates a new signer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SamlSigner for XmlSigner {
    fn sign_document(
        &self,
        document: &mut XmlDocument,
        key_pair: &RsaKeyPair,
        algorithm: SignatureAlgorithm,
        certificate: Option<&Certificate>,
    ) -> SamlResult<()> {
        let root = document.root();
        let reference_uri = root
            .attribute("ID")
            .map_or_else(String::new, |id| format!("#{id}"));

        // Digest over the root before the Signature exists; the enveloped
        // transform removes it again on the verifying side.
        let canonical_root = c14n::canonicalize(root, &NamespaceScope::new());
        let digest = kc_crypto::hash(algorithm.hash(), canonical_root.as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest);

        let signed_info = build_signed_info(&reference_uri, &digest_b64, algorithm);

        let mut signature_scope = document.root_scope();
        signature_scope.push(NamespaceDecl::new(Some(XMLDSIG_PREFIX), XMLDSIG_NS));
        let canonical_signed_info = c14n::canonicalize(&signed_info, &signature_scope);

        let signature_value = self.sign_bytes(canonical_signed_info.as_bytes(), key_pair, algorithm)?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature_value);

        let signature = build_signature_element(signed_info, &signature_b64, certificate);
        let position = signature_position(document);
        document
            .root_mut()
            .children
            .insert(position, Node::Element(signature));

        tracing::debug!(
            algorithm = %algorithm,
            key_id = %key_pair.key_id(),
            reference = %reference_uri,
            "signed SAML document"
        );
        Ok(())
    }

    fn sign_bytes(
        &self,
        data: &[u8],
        key_pair: &RsaKeyPair,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<Vec<u8>> {
        if algorithm.is_deprecated() {
            tracing::warn!(algorithm = %algorithm, "signing with deprecated SHA-1 algorithm");
        }
        kc_crypto::rsa_sign(key_pair, algorithm.hash(), data)
            .map_err(|e| SamlError::SigningFailure(e.to_string()))
    }
}

fn ds(local_name: &str) -> Element {
    Element::new(Some(XMLDSIG_PREFIX), local_name)
}

/// Builds the `ds:SignedInfo` element.
fn build_signed_info(reference_uri: &str, digest_b64: &str, algorithm: SignatureAlgorithm) -> Element {
    let transforms = ds("Transforms")
        .with_child(
            ds("Transform")
                .with_attribute("Algorithm", canonicalization_algorithms::ENVELOPED_SIGNATURE),
        )
        .with_child(
            ds("Transform").with_attribute("Algorithm", canonicalization_algorithms::EXCLUSIVE_C14N),
        );

    let reference = ds("Reference")
        .with_attribute("URI", reference_uri)
        .with_child(transforms)
        .with_child(ds("DigestMethod").with_attribute("Algorithm", algorithm.digest_uri()))
        .with_child(ds("DigestValue").with_text(digest_b64));

    ds("SignedInfo")
        .with_child(
            ds("CanonicalizationMethod")
                .with_attribute("Algorithm", canonicalization_algorithms::EXCLUSIVE_C14N),
        )
        .with_child(ds("SignatureMethod").with_attribute("Algorithm", algorithm.uri()))
        .with_child(reference)
}

/// Builds the complete `ds:Signature` element.
fn build_signature_element(
    signed_info: Element,
    signature_value: &str,
    certificate: Option<&Certificate>,
) -> Element {
    let mut signature = ds("Signature")
        .with_namespace(Some(XMLDSIG_PREFIX), XMLDSIG_NS)
        .with_child(signed_info)
        .with_child(ds("SignatureValue").with_text(signature_value));

    if let Some(cert) = certificate {
        signature = signature.with_child(
            ds("KeyInfo").with_child(
                ds("X509Data").with_child(ds("X509Certificate").with_text(cert.to_base64())),
            ),
        );
    }
    signature
}

/// Index in the root's children where the signature goes.
fn signature_position(document: &XmlDocument) -> usize {
    let scope = document.root_scope();
    document
        .root()
        .find_child(&scope, SAML_NS, "Issuer")
        .map_or(0, |(index, _)| index + 1)
}
