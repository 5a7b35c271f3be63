//! XML Signature support for SAML.
//!
//! This module holds the signature algorithm policy table, the enveloped
//! XML signer used for POST responses and redirect query signing, and the
//! matching validator.
//!
//! # Signing Algorithms
//!
//! - RSA-SHA1 (interop default, deprecated)
//! - RSA-SHA256 (recommended)
//! - RSA-SHA384
//! - RSA-SHA512

mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use kc_crypto::HashAlgorithm;

use crate::error::{SamlError, SamlResult};
use crate::types::{digest_algorithms, signature_algorithms};

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureAlgorithm {
    /// Legacy RSA with SHA-1.
    #[default]
    RsaSha1,
    /// RSA with SHA-256 (recommended).
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
}

/// One row of the algorithm policy table.
#[derive(Debug, Clone, Copy)]
struct AlgorithmEntry {
    algorithm: SignatureAlgorithm,
    name: &'static str,
    uri: &'static str,
    digest_uri: &'static str,
    java_name: &'static str,
    hash: HashAlgorithm,
}

static ALGORITHMS: [AlgorithmEntry; 4] = [
    AlgorithmEntry {
        algorithm: SignatureAlgorithm::RsaSha1,
        name: "RSA_SHA1",
        uri: signature_algorithms::RSA_SHA1,
        digest_uri: digest_algorithms::SHA1,
        java_name: "SHA1withRSA",
        hash: HashAlgorithm::Sha1,
    },
    AlgorithmEntry {
        algorithm: SignatureAlgorithm::RsaSha256,
        name: "RSA_SHA256",
        uri: signature_algorithms::RSA_SHA256,
        digest_uri: digest_algorithms::SHA256,
        java_name: "SHA256withRSA",
        hash: HashAlgorithm::Sha256,
    },
    AlgorithmEntry {
        algorithm: SignatureAlgorithm::RsaSha384,
        name: "RSA_SHA384",
        uri: signature_algorithms::RSA_SHA384,
        digest_uri: digest_algorithms::SHA384,
        java_name: "SHA384withRSA",
        hash: HashAlgorithm::Sha384,
    },
    AlgorithmEntry {
        algorithm: SignatureAlgorithm::RsaSha512,
        name: "RSA_SHA512",
        uri: signature_algorithms::RSA_SHA512,
        digest_uri: digest_algorithms::SHA512,
        java_name: "SHA512withRSA",
        hash: HashAlgorithm::Sha512,
    },
];

impl SignatureAlgorithm {
    /// All supported algorithms.
    pub const ALL: [Self; 4] = [Self::RsaSha1, Self::RsaSha256, Self::RsaSha384, Self::RsaSha512];

    fn entry(self) -> &'static AlgorithmEntry {
        match self {
            Self::RsaSha1 => &ALGORITHMS[0],
            Self::RsaSha256 => &ALGORITHMS[1],
            Self::RsaSha384 => &ALGORITHMS[2],
            Self::RsaSha512 => &ALGORITHMS[3],
        }
    }

    fn find(pred: impl Fn(&AlgorithmEntry) -> bool) -> Option<Self> {
        ALGORITHMS.iter().find(|e| pred(e)).map(|e| e.algorithm)
    }

    /// Parses a symbolic name such as `RSA_SHA256`, `RSA-SHA256` or `rsa-sha256`.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::UnsupportedAlgorithm` for unknown names.
    pub fn from_name(name: &str) -> SamlResult<Self> {
        let normalized = name.trim().to_ascii_uppercase().replace('-', "_");
        Self::find(|e| e.name == normalized)
            .ok_or_else(|| SamlError::UnsupportedAlgorithm(name.to_string()))
    }

    /// Parses a signature algorithm from its XML-DSig URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::find(|e| e.uri == uri)
    }

    /// Parses a Java-style algorithm name such as `SHA256withRSA`.
    #[must_use]
    pub fn from_java_name(name: &str) -> Option<Self> {
        Self::find(|e| e.java_name.eq_ignore_ascii_case(name))
    }

    /// Returns the symbolic name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.entry().name
    }

    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub fn uri(&self) -> &'static str {
        self.entry().uri
    }

    /// Returns the corresponding digest algorithm URI.
    #[must_use]
    pub fn digest_uri(&self) -> &'static str {
        self.entry().digest_uri
    }

    /// Returns the Java-style name sent as the redirect binding `SigAlg`.
    #[must_use]
    pub fn java_name(&self) -> &'static str {
        self.entry().java_name
    }

    /// Returns the hash used by the signature and reference digest.
    #[must_use]
    pub fn hash(&self) -> HashAlgorithm {
        self.entry().hash
    }

    /// Returns true if this algorithm uses a deprecated hash (SHA-1).
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1)
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = SamlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_rsa_sha1() {
        let alg = SignatureAlgorithm::default();
        assert_eq!(alg, SignatureAlgorithm::RsaSha1);
        assert_eq!(alg.uri(), "http://www.w3.org/2000/09/xmldsig#rsa-sha1");
        assert_eq!(alg.digest_uri(), "http://www.w3.org/2000/09/xmldsig#sha1");
        assert_eq!(alg.java_name(), "SHA1withRSA");
        assert!(alg.is_deprecated());
    }

    #[test]
    fn rsa_sha256_policy_row() {
        let alg = SignatureAlgorithm::from_name("RSA_SHA256").unwrap();
        assert_eq!(alg.uri(), "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256");
        assert_eq!(alg.digest_uri(), "http://www.w3.org/2001/04/xmlenc#sha256");
        assert_eq!(alg.java_name(), "SHA256withRSA");
        assert_eq!(alg.hash(), HashAlgorithm::Sha256);
        assert!(!alg.is_deprecated());
    }

    #[test]
    fn name_spellings_are_accepted() {
        for name in ["RSA_SHA512", "RSA-SHA512", "rsa-sha512", " rsa_sha512 "] {
            assert_eq!(
                SignatureAlgorithm::from_name(name).unwrap(),
                SignatureAlgorithm::RsaSha512
            );
        }
    }

    #[test]
    fn unknown_name_is_unsupported() {
        for name in ["DSA_SHA1", "RSA_MD5", ""] {
            assert!(matches!(
                SignatureAlgorithm::from_name(name),
                Err(SamlError::UnsupportedAlgorithm(_))
            ));
        }
    }

    #[test]
    fn lookups_agree_with_table() {
        for alg in SignatureAlgorithm::ALL {
            assert_eq!(SignatureAlgorithm::from_uri(alg.uri()), Some(alg));
            assert_eq!(SignatureAlgorithm::from_java_name(alg.java_name()), Some(alg));
            assert_eq!(alg.to_string().parse::<SignatureAlgorithm>().unwrap(), alg);
        }
        assert_eq!(SignatureAlgorithm::from_uri("urn:unknown"), None);
    }
}
