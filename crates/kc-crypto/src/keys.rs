//! RSA key material and X.509 certificates.
//!
//! Keys wrap the `rsa` crate types so that callers never depend on the
//! backing implementation directly. Private key bytes are never exposed
//! through `Debug`.

use std::fmt;

use base64::Engine;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;

use crate::signature::SignatureError;

/// Minimum RSA modulus size accepted for signing and key transport.
pub const MIN_RSA_KEY_BITS: usize = 1024;

/// RSA private key together with its public half.
#[derive(Clone)]
pub struct RsaKeyPair {
    private: rsa::RsaPrivateKey,
    public: RsaPublicKey,
}

impl RsaKeyPair {
    /// Generates a fresh key pair with the given modulus size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is below [`MIN_RSA_KEY_BITS`] or generation fails.
    pub fn generate(bits: usize) -> Result<Self, SignatureError> {
        if bits < MIN_RSA_KEY_BITS {
            return Err(SignatureError::KeyTooSmall {
                bits,
                minimum: MIN_RSA_KEY_BITS,
            });
        }
        let private = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| SignatureError::KeyGeneration(e.to_string()))?;
        Ok(Self::from_private(private))
    }

    /// Loads a private key from DER, accepting PKCS#8 or PKCS#1 (`RSAPrivateKey`).
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not an RSA private key.
    pub fn from_der(der: &[u8]) -> Result<Self, SignatureError> {
        let private = rsa::RsaPrivateKey::from_pkcs8_der(der)
            .or_else(|_| rsa::RsaPrivateKey::from_pkcs1_der(der))
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA DER key: {e}")))?;
        Self::checked(private)
    }

    /// Loads a private key from PEM (`PRIVATE KEY` or `RSA PRIVATE KEY`).
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM block is not an RSA private key.
    pub fn from_pem(pem: &str) -> Result<Self, SignatureError> {
        let private = rsa::RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| rsa::RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA PEM key: {e}")))?;
        Self::checked(private)
    }

    fn checked(private: rsa::RsaPrivateKey) -> Result<Self, SignatureError> {
        let bits = private.size() * 8;
        if bits < MIN_RSA_KEY_BITS {
            return Err(SignatureError::KeyTooSmall {
                bits,
                minimum: MIN_RSA_KEY_BITS,
            });
        }
        Ok(Self::from_private(private))
    }

    fn from_private(private: rsa::RsaPrivateKey) -> Self {
        let public = RsaPublicKey {
            inner: private.to_public_key(),
        };
        Self { private, public }
    }

    /// Returns the public half of the key pair.
    #[must_use]
    pub const fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Returns the modulus size in bits.
    #[must_use]
    pub fn key_bits(&self) -> usize {
        self.public.key_bits()
    }

    /// Returns a short identifier derived from the public key.
    #[must_use]
    pub fn key_id(&self) -> String {
        self.public.key_id()
    }

    pub(crate) const fn private(&self) -> &rsa::RsaPrivateKey {
        &self.private
    }
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("key_id", &self.key_id())
            .field("bits", &self.key_bits())
            .finish_non_exhaustive()
    }
}

/// RSA public key.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    inner: rsa::RsaPublicKey,
}

impl RsaPublicKey {
    /// Loads a public key from DER, accepting `SubjectPublicKeyInfo` or PKCS#1.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not an RSA public key.
    pub fn from_der(der: &[u8]) -> Result<Self, SignatureError> {
        let inner = rsa::RsaPublicKey::from_public_key_der(der)
            .or_else(|_| rsa::RsaPublicKey::from_pkcs1_der(der))
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA public key: {e}")))?;
        Ok(Self { inner })
    }

    /// Loads a public key from a `PUBLIC KEY` PEM block.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM block is not an RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, SignatureError> {
        let inner = rsa::RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA public key: {e}")))?;
        Ok(Self { inner })
    }

    /// Encodes the key as DER `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_der(&self) -> Result<Vec<u8>, SignatureError> {
        self.inner
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))
    }

    /// Returns the modulus size in bits.
    #[must_use]
    pub fn key_bits(&self) -> usize {
        self.inner.size() * 8
    }

    /// Returns a short identifier derived from the modulus.
    #[must_use]
    pub fn key_id(&self) -> String {
        let hash = crate::sha256(&self.inner.n().to_bytes_be());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hash[..8])
    }

    pub(crate) const fn inner(&self) -> &rsa::RsaPublicKey {
        &self.inner
    }
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("key_id", &self.key_id())
            .field("bits", &self.key_bits())
            .finish()
    }
}

/// DER-encoded X.509 certificate.
///
/// The certificate is carried opaquely; it is embedded in signatures but
/// not parsed or path-validated here.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wraps DER-encoded certificate bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not start a DER `SEQUENCE`.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, SignatureError> {
        let der = der.into();
        if der.first() != Some(&0x30) {
            return Err(SignatureError::InvalidKey(
                "certificate is not a DER SEQUENCE".to_string(),
            ));
        }
        Ok(Self { der })
    }

    /// Parses a `CERTIFICATE` PEM block.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM block is missing or not valid base64.
    pub fn from_pem(pem: &str) -> Result<Self, SignatureError> {
        let der = pem_to_der(pem, "CERTIFICATE")
            .ok_or_else(|| SignatureError::InvalidKey("invalid certificate PEM".to_string()))?;
        Self::from_der(der)
    }

    /// Returns the DER bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the DER bytes as standard base64, as used in `ds:X509Certificate`.
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.der)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("len", &self.der.len())
            .finish()
    }
}

fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = pem.find(&end)?;
    if end_pos < start {
        return None;
    }

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD.decode(b64_data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePrivateKey;

    #[test]
    fn generated_key_has_requested_size() {
        let key = RsaKeyPair::generate(1024).unwrap();
        assert_eq!(key.key_bits(), 1024);
        assert_eq!(key.public_key().key_bits(), 1024);
    }

    #[test]
    fn small_keys_are_rejected() {
        assert!(matches!(
            RsaKeyPair::generate(512),
            Err(SignatureError::KeyTooSmall { bits: 512, .. })
        ));
    }

    #[test]
    fn pkcs8_der_round_trips_through_loader() {
        let key = RsaKeyPair::generate(1024).unwrap();
        let der = key.private().to_pkcs8_der().unwrap();
        let loaded = RsaKeyPair::from_der(der.as_bytes()).unwrap();
        assert_eq!(loaded.key_id(), key.key_id());
    }

    #[test]
    fn public_key_der_round_trips() {
        let key = RsaKeyPair::generate(1024).unwrap();
        let der = key.public_key().to_der().unwrap();
        let loaded = RsaPublicKey::from_der(&der).unwrap();
        assert_eq!(&loaded, key.public_key());
    }

    #[test]
    fn garbage_is_not_a_key() {
        assert!(matches!(
            RsaKeyPair::from_der(b"not a key"),
            Err(SignatureError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let key = RsaKeyPair::generate(1024).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("key_id"));
        assert!(!debug.contains("private"));
    }

    #[test]
    fn certificate_from_pem() {
        let pem = "-----BEGIN CERTIFICATE-----\nMAMCAQE=\n-----END CERTIFICATE-----\n";
        let cert = Certificate::from_pem(pem).unwrap();
        assert_eq!(cert.der(), &[0x30, 0x03, 0x02, 0x01, 0x01]);
        assert_eq!(cert.to_base64(), "MAMCAQE=");
    }

    #[test]
    fn certificate_must_be_a_sequence() {
        assert!(Certificate::from_der(vec![0x02, 0x01, 0x01]).is_err());
    }
}
