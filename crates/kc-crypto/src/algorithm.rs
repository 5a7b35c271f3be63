//! Cryptographic algorithm definitions.
//!
//! SAML 2.0 deployments still negotiate SHA-1, so it is part of the
//! enumeration; [`HashAlgorithm::is_legacy`] lets callers flag it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for algorithm operations.
#[derive(Debug, Error)]
pub enum AlgorithmError {
    /// Unknown algorithm.
    #[error("unknown algorithm: {0}")]
    Unknown(String),

    /// Key size not supported by the algorithm.
    #[error("unsupported key size: {0} bits")]
    UnsupportedKeySize(u32),
}

/// Hash algorithms usable with RSA PKCS#1 v1.5 signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1 (legacy, interoperability only).
    #[serde(rename = "SHA1")]
    Sha1,

    /// SHA-256.
    #[serde(rename = "SHA256")]
    Sha256,

    /// SHA-384.
    #[serde(rename = "SHA384")]
    Sha384,

    /// SHA-512.
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Returns whether this algorithm is only kept for interoperability.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Sha1)
    }

    /// Parses an algorithm name such as `SHA-256` or `sha256`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the name is unknown.
    pub fn from_name(name: &str) -> Result<Self, AlgorithmError> {
        match name.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(AlgorithmError::Unknown(name.to_string())),
        }
    }
}
