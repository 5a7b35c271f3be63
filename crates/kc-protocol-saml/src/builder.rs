//! Fluent builder that secures an outgoing SAML response and binds it for transport.
//!
//! ```rust,ignore
//! let bound = SamlBindingBuilder::from_config(&config.saml)?
//!     .sign(key_pair)
//!     .signature_algorithm(SignatureAlgorithm::RsaSha256)
//!     .destination("https://sp.example/acs")
//!     .relay_state(relay_state)
//!     .bind(document)?;
//! let response = bound.post_response()?;
//! ```

use std::sync::Arc;

use kc_core::SamlConfig;
use kc_crypto::{Certificate, RsaKeyPair, RsaPublicKey};

use crate::bindings::{HttpPostBinding, HttpRedirectBinding, RedirectSigning};
use crate::encryption::{self, SamlEncryptor, XmlEncryptor};
use crate::error::{SamlError, SamlResult};
use crate::signature::{SamlSigner, SignatureAlgorithm, XmlSigner};
use crate::types::{SamlBinding, SAML_NS};
use crate::xml::{QualifiedName, XmlDocument};

/// Signing key material.
#[derive(Clone)]
struct SigningCredentials {
    key_pair: RsaKeyPair,
    certificate: Option<Certificate>,
}

/// Response security configuration.
///
/// Signing and encryption are enabled by handing over the key material
/// they need. Each call consumes and returns the builder.
#[derive(Clone)]
pub struct SamlBindingBuilder {
    signing: Option<SigningCredentials>,
    signature_algorithm: SignatureAlgorithm,
    recipient: Option<RsaPublicKey>,
    encryption_algorithm: String,
    encryption_key_size: u32,
    destination: Option<String>,
    relay_state: Option<String>,
    response_issuer: Option<String>,
    signer: Arc<dyn SamlSigner>,
    encryptor: Arc<dyn SamlEncryptor>,
}

impl Default for SamlBindingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SamlBindingBuilder {
    /// Creates a builder with protocol defaults: RSA-SHA1, AES-128, no signing or encryption.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signing: None,
            signature_algorithm: SignatureAlgorithm::default(),
            recipient: None,
            encryption_algorithm: encryption::AES.to_string(),
            encryption_key_size: 128,
            destination: None,
            relay_state: None,
            response_issuer: None,
            signer: Arc::new(XmlSigner::new()),
            encryptor: Arc::new(XmlEncryptor::new()),
        }
    }

    /// Creates a builder seeded from configuration defaults.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::UnsupportedAlgorithm` if the configured signature
    /// algorithm is unknown.
    pub fn from_config(config: &SamlConfig) -> SamlResult<Self> {
        let mut builder = Self::new()
            .signature_algorithm(SignatureAlgorithm::from_name(&config.signature_algorithm)?)
            .encryption_algorithm(config.encryption_algorithm.clone())
            .encryption_key_size(config.encryption_key_size);
        builder.response_issuer.clone_from(&config.response_issuer);
        Ok(builder)
    }

    /// Enables signing with the given key pair.
    #[must_use]
    pub fn sign(mut self, key_pair: RsaKeyPair) -> Self {
        self.signing = Some(SigningCredentials {
            key_pair,
            certificate: None,
        });
        self
    }

    /// Enables signing and embeds `certificate` in the signature's `KeyInfo`.
    #[must_use]
    pub fn sign_with_certificate(mut self, key_pair: RsaKeyPair, certificate: Certificate) -> Self {
        self.signing = Some(SigningCredentials {
            key_pair,
            certificate: Some(certificate),
        });
        self
    }

    /// Sets the signature algorithm.
    #[must_use]
    pub fn signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = algorithm;
        self
    }

    /// Enables assertion encryption for `recipient`.
    #[must_use]
    pub fn encrypt(mut self, recipient: RsaPublicKey) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Sets the symmetric algorithm family (only `AES` is supported).
    #[must_use]
    pub fn encryption_algorithm(mut self, name: impl Into<String>) -> Self {
        self.encryption_algorithm = name.into();
        self
    }

    /// Sets the symmetric key size in bits.
    #[must_use]
    pub fn encryption_key_size(mut self, bits: u32) -> Self {
        self.encryption_key_size = bits;
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets the relay state forwarded to the service provider.
    #[must_use]
    pub fn relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Sets the responder entity ID.
    #[must_use]
    pub fn response_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.response_issuer = Some(issuer.into());
        self
    }

    /// Replaces the signer.
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn SamlSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Replaces the encryptor.
    #[must_use]
    pub fn with_encryptor(mut self, encryptor: Arc<dyn SamlEncryptor>) -> Self {
        self.encryptor = encryptor;
        self
    }

    /// Whether signing is enabled.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.signing.is_some()
    }

    /// Whether assertion encryption is enabled.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.recipient.is_some()
    }

    /// Encrypts and signs `document` as configured and snapshots the configuration.
    ///
    /// The first assertion is encrypted before the document is signed, so the
    /// signature covers the encrypted form.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::MissingDestination` before any cryptographic work if
    /// no destination is set, `SamlError::UnsupportedAlgorithm` for an invalid
    /// encryption algorithm or key size, and any failure of the encryptor or signer.
    pub fn bind(&self, mut document: XmlDocument) -> SamlResult<BoundDocument> {
        let destination = self
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(SamlError::MissingDestination)?
            .to_string();

        if let Some(recipient) = &self.recipient {
            encryption::content_algorithm(&self.encryption_algorithm, self.encryption_key_size)?;
            let key = self.encryptor.generate_symmetric_key(self.encryption_key_size)?;
            self.encryptor.encrypt_element(
                &mut document,
                &QualifiedName::new(SAML_NS, "Assertion"),
                &QualifiedName::new(SAML_NS, "EncryptedAssertion"),
                recipient,
                &key,
            )?;
        }

        if let Some(signing) = &self.signing {
            self.signer.sign_document(
                &mut document,
                &signing.key_pair,
                self.signature_algorithm,
                signing.certificate.as_ref(),
            )?;
        }

        tracing::debug!(
            destination = %destination,
            signed = self.is_signed(),
            encrypted = self.is_encrypted(),
            "bound SAML response"
        );

        Ok(BoundDocument {
            document,
            destination,
            relay_state: self.relay_state.clone(),
            response_issuer: self.response_issuer.clone(),
            signing: self.signing.clone(),
            signature_algorithm: self.signature_algorithm,
            signer: Arc::clone(&self.signer),
        })
    }
}

/// A secured response ready to be serialized for either binding.
#[derive(Clone)]
pub struct BoundDocument {
    document: XmlDocument,
    destination: String,
    relay_state: Option<String>,
    response_issuer: Option<String>,
    signing: Option<SigningCredentials>,
    signature_algorithm: SignatureAlgorithm,
    signer: Arc<dyn SamlSigner>,
}

impl BoundDocument {
    /// The encrypted and/or signed document.
    #[must_use]
    pub const fn document(&self) -> &XmlDocument {
        &self.document
    }

    /// Consumes the result, returning the document.
    #[must_use]
    pub fn into_document(self) -> XmlDocument {
        self.document
    }

    /// The destination URL.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The relay state, if any.
    #[must_use]
    pub fn relay_state(&self) -> Option<&str> {
        self.relay_state.as_deref()
    }

    /// The responder entity ID, if configured.
    #[must_use]
    pub fn response_issuer(&self) -> Option<&str> {
        self.response_issuer.as_deref()
    }

    /// Builds the HTTP-POST binding response.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::EncodingFailure` if the response cannot be assembled.
    pub fn post_response(&self) -> SamlResult<http::Response<String>> {
        HttpPostBinding::response(
            &self.document.to_xml_string(),
            &self.destination,
            self.relay_state(),
        )
    }

    /// Builds the HTTP-Redirect binding URI, signing the query when signing is enabled.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::InvalidDestination`, `SamlError::EncodingFailure` or
    /// `SamlError::SigningFailure`.
    pub fn redirect_uri(&self) -> SamlResult<String> {
        HttpRedirectBinding::encode_response(
            &self.document.to_xml_string(),
            &self.destination,
            self.relay_state(),
            self.redirect_signing(),
        )
    }

    /// Builds the `302` HTTP-Redirect binding response.
    ///
    /// # Errors
    ///
    /// As [`Self::redirect_uri`].
    pub fn redirect_response(&self) -> SamlResult<http::Response<String>> {
        HttpRedirectBinding::response(
            &self.document.to_xml_string(),
            &self.destination,
            self.relay_state(),
            self.redirect_signing(),
        )
    }

    /// Builds the response for `binding`.
    ///
    /// # Errors
    ///
    /// As [`Self::post_response`] or [`Self::redirect_response`].
    pub fn response_for(&self, binding: SamlBinding) -> SamlResult<http::Response<String>> {
        match binding {
            SamlBinding::HttpPost => self.post_response(),
            SamlBinding::HttpRedirect => self.redirect_response(),
        }
    }

    fn redirect_signing(&self) -> Option<RedirectSigning<'_>> {
        self.signing.as_ref().map(|signing| RedirectSigning {
            signer: self.signer.as_ref(),
            key_pair: &signing.key_pair,
            algorithm: self.signature_algorithm,
        })
    }
}
