//! RSA PKCS#1 v1.5 signatures.
//!
//! The message is digested with aws-lc-rs and the `rsa` crate applies the
//! DigestInfo padding for the matching hash OID. SHA-1 is accepted here
//! because XML-DSig `rsa-sha1` is still the SAML interop default; policy
//! about whether to use it lives with the caller.

use rsa::Pkcs1v15Sign;

use crate::algorithm::HashAlgorithm;
use crate::hash::hash;
use crate::keys::{RsaKeyPair, RsaPublicKey};
use crate::signature::SignatureError;

fn padding(algorithm: HashAlgorithm) -> Pkcs1v15Sign {
    match algorithm {
        HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
    }
}

/// Signs `data` with RSA PKCS#1 v1.5 using the given hash.
///
/// # Errors
///
/// Returns `SignatureError::Signing` if the RSA operation fails.
pub fn rsa_sign(
    key: &RsaKeyPair,
    algorithm: HashAlgorithm,
    data: &[u8],
) -> Result<Vec<u8>, SignatureError> {
    let digest = hash(algorithm, data);
    key.private()
        .sign(padding(algorithm), &digest)
        .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))
}

/// Verifies an RSA PKCS#1 v1.5 signature over `data`.
///
/// # Errors
///
/// Returns `SignatureError::Verification` if the signature does not match.
pub fn rsa_verify(
    key: &RsaPublicKey,
    algorithm: HashAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let digest = hash(algorithm, data);
    key.inner()
        .verify(padding(algorithm), &digest, signature)
        .map_err(|_| SignatureError::Verification)
}
