//! # kc-crypto
//!
//! Cryptographic operations for Keycloak Rust.
//!
//! Digests, AES-GCM and system randomness come from aws-lc-rs. RSA key
//! material, PKCS#1 v1.5 signatures and RSA-OAEP key transport use the
//! `rsa` crate so that the legacy SHA-1 based algorithms still required by
//! SAML 2.0 service providers remain available.
//!
//! ## Legacy algorithms
//!
//! SHA-1 is only provided for protocol interoperability. Callers are
//! expected to log when it is selected.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - SC-12: Cryptographic key management
//! - SC-13: Cryptographic protection

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod encryption;
pub mod hash;
pub mod keys;
pub mod pkcs1;
pub mod random;
pub mod signature;

pub use algorithm::{AlgorithmError, HashAlgorithm};
pub use encryption::{
    aes_gcm_open, aes_gcm_seal, generate_symmetric_key, rsa_oaep_unwrap, rsa_oaep_wrap,
    ContentEncryptionAlgorithm, EncryptionError, SymmetricKey,
};
pub use hash::{hash, sha1, sha256, sha384, sha512};
pub use keys::{Certificate, RsaKeyPair, RsaPublicKey};
pub use pkcs1::{rsa_sign, rsa_verify};
pub use random::{random_bytes, RandomError};
pub use signature::SignatureError;
