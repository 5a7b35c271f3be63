//! Cryptographically secure random number generation.
//!
//! Key material and IVs are drawn from the operating system CSPRNG through
//! a fresh `aws_lc_rs::rand::SystemRandom` per call, so no generator state
//! is shared between requests.

use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

/// The system random number generator could not produce output.
#[derive(Debug, Error)]
#[error("system random number generator failed")]
pub struct RandomError;

/// Generates `len` cryptographically secure random bytes.
///
/// # Errors
///
/// Returns `RandomError` if the operating system CSPRNG fails.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, RandomError> {
    let mut bytes = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| RandomError)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_produces_correct_length() {
        let bytes = random_bytes(32).unwrap();
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn random_bytes_produces_different_values() {
        let a = random_bytes(32).unwrap();
        let b = random_bytes(32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_length_is_allowed() {
        assert!(random_bytes(0).unwrap().is_empty());
    }
}
