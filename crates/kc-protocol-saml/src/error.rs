//! SAML error types.
//!
//! Provides error types for securing and transporting outgoing SAML
//! responses: configuration problems, XML parsing, encryption, signing and
//! binding serialization.

use kc_crypto::{EncryptionError, SignatureError};
use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// No destination URL was configured before binding.
    #[error("destination is required")]
    MissingDestination,

    /// The destination is not an absolute URL.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// The element selected for encryption does not exist in the document.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Unknown signature algorithm, encryption algorithm or key size.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Element encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailure(String),

    /// Element decryption failed.
    #[error("decryption failed: {0}")]
    DecryptionFailure(String),

    /// XML or redirect signature creation failed.
    #[error("signature creation failed: {0}")]
    SigningFailure(String),

    /// XML signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// Serialization, compression or transport encoding failed.
    #[error("encoding failed: {0}")]
    EncodingFailure(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),
}

impl SamlError {
    /// Returns the SAML status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::XmlParse(_) | Self::SignatureInvalid(_) => {
                "urn:oasis:names:tc:SAML:2.0:status:Requester"
            }
            Self::UnsupportedAlgorithm(_) => {
                "urn:oasis:names:tc:SAML:2.0:status:RequestUnsupported"
            }
            _ => "urn:oasis:names:tc:SAML:2.0:status:Responder",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MissingDestination | Self::InvalidDestination(_) | Self::XmlParse(_) => 400,
            Self::SignatureInvalid(_) => 401,
            _ => 500,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for SamlError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::EncodingFailure(err.to_string())
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::EncodingFailure(err.to_string())
    }
}

impl From<url::ParseError> for SamlError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidDestination(err.to_string())
    }
}

impl From<SignatureError> for SamlError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::Verification => Self::SignatureInvalid(err.to_string()),
            other => Self::SigningFailure(other.to_string()),
        }
    }
}

impl From<EncryptionError> for SamlError {
    fn from(err: EncryptionError) -> Self {
        match err {
            EncryptionError::UnsupportedKeySize(bits) => {
                Self::UnsupportedAlgorithm(format!("AES key size {bits}"))
            }
            EncryptionError::Decrypt => Self::DecryptionFailure(err.to_string()),
            other => Self::EncryptionFailure(other.to_string()),
        }
    }
}
