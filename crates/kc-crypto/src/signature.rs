//! RSA key and signature errors.

use thiserror::Error;

/// Error type for RSA key handling and PKCS#1 v1.5 signatures.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Modulus shorter than the accepted minimum.
    #[error("RSA key size {bits} is below the minimum of {minimum} bits")]
    KeyTooSmall {
        /// Modulus size of the offending key.
        bits: usize,
        /// Smallest accepted modulus size.
        minimum: usize,
    },

    /// Key or certificate bytes could not be decoded.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Signature did not verify against the key.
    #[error("signature verification failed")]
    Verification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_too_small_names_both_sizes() {
        let err = SignatureError::KeyTooSmall {
            bits: 512,
            minimum: 2048,
        };
        assert_eq!(
            err.to_string(),
            "RSA key size 512 is below the minimum of 2048 bits"
        );
    }
}
