//! XML Encryption of SAML assertions.
//!
//! An assertion is replaced in place by an `EncryptedAssertion` wrapper
//! holding `xenc:EncryptedData`: the assertion sealed with AES-GCM, and a
//! `ds:KeyInfo/xenc:EncryptedKey` carrying the content key wrapped for the
//! recipient with RSA-OAEP.

mod decryptor;
mod encryptor;

pub use decryptor::XmlDecryptor;
pub use encryptor::XmlEncryptor;

use kc_crypto::{ContentEncryptionAlgorithm, RsaPublicKey, SymmetricKey};

use crate::error::{SamlError, SamlResult};
use crate::xml::{QualifiedName, XmlDocument};

/// Symmetric algorithm family supported for content encryption.
pub const AES: &str = "AES";

/// Encryption operations used by the response builder.
pub trait SamlEncryptor: Send + Sync {
    /// Generates a fresh content-encryption key of `bits` length.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::UnsupportedAlgorithm` unless `bits` is 128 or 256.
    fn generate_symmetric_key(&self, bits: u32) -> SamlResult<SymmetricKey>;

    /// Replaces the first `target` element with an encrypted `replacement` wrapper.
    ///
    /// A `replacement` without a prefix takes the prefix of the target.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::ElementNotFound` if no element matches `target`,
    /// `SamlError::EncryptionFailure` if a primitive fails.
    fn encrypt_element(
        &self,
        document: &mut XmlDocument,
        target: &QualifiedName,
        replacement: &QualifiedName,
        recipient: &RsaPublicKey,
        key: &SymmetricKey,
    ) -> SamlResult<()>;
}

/// Resolves an algorithm name and key size to a content encryption algorithm.
///
/// # Errors
///
/// Returns `SamlError::UnsupportedAlgorithm` for anything other than AES
/// with a 128 or 256 bit key.
pub fn content_algorithm(name: &str, key_size: u32) -> SamlResult<ContentEncryptionAlgorithm> {
    if !name.trim().eq_ignore_ascii_case(AES) {
        return Err(SamlError::UnsupportedAlgorithm(format!(
            "encryption algorithm {name}"
        )));
    }
    Ok(ContentEncryptionAlgorithm::from_key_bits(key_size)?)
}
