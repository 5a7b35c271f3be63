//! Content encryption and key transport for XML Encryption.
//!
//! Content is sealed with AES-GCM; the per-message symmetric key is
//! transported to the recipient with RSA-OAEP (MGF1 with SHA-1, the
//! `xmlenc#rsa-oaep-mgf1p` profile).

use std::fmt;

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_128_GCM, AES_256_GCM, NONCE_LEN};
use rsa::Oaep;
use thiserror::Error;

use crate::keys::{RsaKeyPair, RsaPublicKey};
use crate::random::random_bytes;

/// Error type for encryption operations.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Symmetric key size is not supported.
    #[error("unsupported symmetric key size: {0} bits")]
    UnsupportedKeySize(u32),

    /// Random generation failed.
    #[error("random generation failed")]
    Random,

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Decryption failed. Details are withheld.
    #[error("decryption failed")]
    Decrypt,
}

/// AES-GCM content encryption algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncryptionAlgorithm {
    /// AES-128-GCM.
    Aes128Gcm,
    /// AES-256-GCM.
    Aes256Gcm,
}

impl ContentEncryptionAlgorithm {
    /// Selects the algorithm for a key size in bits.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedKeySize` unless `bits` is 128 or 256.
    pub fn from_key_bits(bits: u32) -> Result<Self, EncryptionError> {
        match bits {
            128 => Ok(Self::Aes128Gcm),
            256 => Ok(Self::Aes256Gcm),
            other => Err(EncryptionError::UnsupportedKeySize(other)),
        }
    }

    /// Looks up the algorithm by its XML Encryption 1.1 URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        [Self::Aes128Gcm, Self::Aes256Gcm]
            .into_iter()
            .find(|alg| alg.uri() == uri)
    }

    /// Returns the XML Encryption 1.1 algorithm URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Aes128Gcm => "http://www.w3.org/2009/xmlenc11#aes128-gcm",
            Self::Aes256Gcm => "http://www.w3.org/2009/xmlenc11#aes256-gcm",
        }
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm => 32,
        }
    }

    const fn aead(self) -> &'static aws_lc_rs::aead::Algorithm {
        match self {
            Self::Aes128Gcm => &AES_128_GCM,
            Self::Aes256Gcm => &AES_256_GCM,
        }
    }
}

/// Symmetric content-encryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    algorithm: ContentEncryptionAlgorithm,
    bytes: Vec<u8>,
}

impl SymmetricKey {
    /// Wraps existing key bytes, e.g. after RSA-OAEP unwrapping.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedKeySize` if the length does not match the algorithm.
    pub fn from_bytes(
        algorithm: ContentEncryptionAlgorithm,
        bytes: Vec<u8>,
    ) -> Result<Self, EncryptionError> {
        if bytes.len() != algorithm.key_len() {
            #[allow(clippy::cast_possible_truncation)]
            return Err(EncryptionError::UnsupportedKeySize((bytes.len() * 8) as u32));
        }
        Ok(Self { algorithm, bytes })
    }

    /// Returns the content encryption algorithm this key is for.
    #[must_use]
    pub const fn algorithm(&self) -> ContentEncryptionAlgorithm {
        self.algorithm
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Generates a random AES key of `bits` length from the system CSPRNG.
///
/// # Errors
///
/// Returns `UnsupportedKeySize` unless `bits` is 128 or 256, or `Random`
/// if the CSPRNG fails.
pub fn generate_symmetric_key(bits: u32) -> Result<SymmetricKey, EncryptionError> {
    let algorithm = ContentEncryptionAlgorithm::from_key_bits(bits)?;
    let bytes = random_bytes(algorithm.key_len()).map_err(|_| EncryptionError::Random)?;
    SymmetricKey::from_bytes(algorithm, bytes)
}

fn less_safe_key(key: &SymmetricKey) -> Result<LessSafeKey, EncryptionError> {
    let unbound = UnboundKey::new(key.algorithm.aead(), &key.bytes)
        .map_err(|_| EncryptionError::Encrypt("invalid AES key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypts `plaintext` with AES-GCM under a fresh random IV.
///
/// Returns `IV || ciphertext || tag`, the layout XML Encryption 1.1 uses
/// for `CipherValue`.
///
/// # Errors
///
/// Returns an error if the key is unusable or sealing fails.
pub fn aes_gcm_seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let aead_key = less_safe_key(key)?;
    let iv = random_bytes(NONCE_LEN).map_err(|_| EncryptionError::Random)?;
    let nonce = Nonce::try_assume_unique_for_key(&iv)
        .map_err(|_| EncryptionError::Encrypt("invalid nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    aead_key
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| EncryptionError::Encrypt("AES-GCM seal failed".to_string()))?;

    let mut output = iv;
    output.extend_from_slice(&in_out);
    Ok(output)
}

/// Decrypts `IV || ciphertext || tag` produced by [`aes_gcm_seal`].
///
/// # Errors
///
/// Returns `Decrypt` if the input is truncated or fails authentication.
pub fn aes_gcm_open(key: &SymmetricKey, sealed: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    if sealed.len() < NONCE_LEN {
        return Err(EncryptionError::Decrypt);
    }
    let aead_key = less_safe_key(key).map_err(|_| EncryptionError::Decrypt)?;
    let (iv, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(iv).map_err(|_| EncryptionError::Decrypt)?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = aead_key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| EncryptionError::Decrypt)?;
    Ok(plaintext.to_vec())
}

/// Wraps a symmetric key for `recipient` with RSA-OAEP (SHA-1, MGF1-SHA-1).
///
/// # Errors
///
/// Returns `Encrypt` if the RSA operation fails.
pub fn rsa_oaep_wrap(
    recipient: &RsaPublicKey,
    key: &SymmetricKey,
) -> Result<Vec<u8>, EncryptionError> {
    recipient
        .inner()
        .encrypt(&mut rand::thread_rng(), Oaep::new::<sha1::Sha1>(), &key.bytes)
        .map_err(|e| EncryptionError::Encrypt(format!("RSA-OAEP key transport failed: {e}")))
}

/// Unwraps an RSA-OAEP encrypted symmetric key.
///
/// # Errors
///
/// Returns `Decrypt` if the key cannot be recovered, or `UnsupportedKeySize`
/// if the recovered key does not fit `algorithm`.
pub fn rsa_oaep_unwrap(
    key_pair: &RsaKeyPair,
    algorithm: ContentEncryptionAlgorithm,
    wrapped: &[u8],
) -> Result<SymmetricKey, EncryptionError> {
    let bytes = key_pair
        .private()
        .decrypt(Oaep::new::<sha1::Sha1>(), wrapped)
        .map_err(|_| EncryptionError::Decrypt)?;
    SymmetricKey::from_bytes(algorithm, bytes)
}
