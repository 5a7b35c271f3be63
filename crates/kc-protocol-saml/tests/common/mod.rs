//! Common test utilities and fixtures.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kc_crypto::{Certificate, RsaKeyPair, RsaPublicKey, SymmetricKey};
use kc_protocol_saml::encryption::{SamlEncryptor, XmlEncryptor};
use kc_protocol_saml::signature::{SamlSigner, SignatureAlgorithm, XmlSigner};
use kc_protocol_saml::{QualifiedName, SamlResult, XmlDocument};

/// A SAML response with one assertion.
pub const RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_8e8dc5f69a98cc4c1ff3427e5ce34606fd672f91e6" Version="2.0" IssueInstant="2024-01-01T00:00:00Z" Destination="https://sp.example/acs">
  <saml:Issuer>https://idp.example</saml:Issuer>
  <samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>
  <saml:Assertion ID="_d71a3a8e9fcc45c9e9d248ef7049393fc8f04e5f75" Version="2.0" IssueInstant="2024-01-01T00:00:00Z">
    <saml:Issuer>https://idp.example</saml:Issuer>
    <saml:Subject><saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">alice@example.com</saml:NameID></saml:Subject>
  </saml:Assertion>
</samlp:Response>"#;

/// Parses [`RESPONSE`].
pub fn response() -> anyhow::Result<XmlDocument> {
    Ok(XmlDocument::parse(RESPONSE)?)
}

/// Identity provider signing key.
pub fn idp_key() -> anyhow::Result<RsaKeyPair> {
    Ok(RsaKeyPair::from_pem(include_str!("../fixtures/idp-key.pem"))?)
}

/// Identity provider certificate matching [`idp_key`].
pub fn idp_certificate() -> anyhow::Result<Certificate> {
    Ok(Certificate::from_pem(include_str!("../fixtures/idp-cert.pem"))?)
}

/// Service provider decryption key.
pub fn sp_key() -> anyhow::Result<RsaKeyPair> {
    Ok(RsaKeyPair::from_pem(include_str!("../fixtures/sp-key.pem"))?)
}

/// Service provider public key.
pub fn sp_public_key() -> anyhow::Result<RsaPublicKey> {
    Ok(RsaPublicKey::from_pem(include_str!("../fixtures/sp-pub.pem"))?)
}

/// Signer counting calls before delegating to [`XmlSigner`].
#[derive(Default)]
pub struct CountingSigner {
    pub calls: AtomicUsize,
}

impl CountingSigner {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SamlSigner for CountingSigner {
    fn sign_document(
        &self,
        document: &mut XmlDocument,
        key_pair: &RsaKeyPair,
        algorithm: SignatureAlgorithm,
        certificate: Option<&Certificate>,
    ) -> SamlResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        XmlSigner::new().sign_document(document, key_pair, algorithm, certificate)
    }

    fn sign_bytes(
        &self,
        data: &[u8],
        key_pair: &RsaKeyPair,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        XmlSigner::new().sign_bytes(data, key_pair, algorithm)
    }
}

/// Encryptor counting calls before delegating to [`XmlEncryptor`].
#[derive(Default)]
pub struct CountingEncryptor {
    pub calls: AtomicUsize,
}

impl CountingEncryptor {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SamlEncryptor for CountingEncryptor {
    fn generate_symmetric_key(&self, bits: u32) -> SamlResult<SymmetricKey> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        XmlEncryptor::new().generate_symmetric_key(bits)
    }

    fn encrypt_element(
        &self,
        document: &mut XmlDocument,
        target: &QualifiedName,
        replacement: &QualifiedName,
        recipient: &RsaPublicKey,
        key: &SymmetricKey,
    ) -> SamlResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        XmlEncryptor::new().encrypt_element(document, target, replacement, recipient, key)
    }
}

/// Fresh counting fakes.
pub fn counting_fakes() -> (Arc<CountingSigner>, Arc<CountingEncryptor>) {
    (
        Arc::new(CountingSigner::default()),
        Arc::new(CountingEncryptor::default()),
    )
}

/// Extracts the value of a hidden form field.
pub fn form_field<'a>(html: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!(r#"NAME="{name}" VALUE=""#);
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(&html[start..start + end])
}

/// Splits a redirect URI into its query parameters, undecoded.
pub fn query_pairs(uri: &str) -> Vec<(&str, &str)> {
    uri.split_once('?')
        .map(|(_, query)| query)
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect()
}
