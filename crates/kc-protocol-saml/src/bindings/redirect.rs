//! HTTP-Redirect Binding implementation.
//!
//! Implements the SAML 2.0 HTTP-Redirect binding for returning a SAML
//! response via URL query parameters with DEFLATE compression. Both the
//! deflated response and the signature use the URL-safe base64 alphabet
//! and are then percent-encoded.
//!
//! The detached signature covers the exact query bytes
//! `SAMLResponse=..&RelayState=..&SigAlg=..`; any reordering or
//! re-encoding invalidates it.

use std::io::Write;

use base64::Engine;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use http::header::LOCATION;
use http::StatusCode;
use kc_crypto::RsaKeyPair;

use crate::error::{SamlError, SamlResult};
use crate::signature::{SamlSigner, SignatureAlgorithm};
use crate::types::params;

use super::{finish, no_cache};

/// Signing parameters for a redirect query.
#[derive(Clone, Copy)]
pub struct RedirectSigning<'a> {
    /// Signer performing the RSA operation.
    pub signer: &'a dyn SamlSigner,
    /// Signing key pair.
    pub key_pair: &'a RsaKeyPair,
    /// Signature algorithm, also announced in `SigAlg`.
    pub algorithm: SignatureAlgorithm,
}

/// HTTP-Redirect binding encoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Builds the query string for a SAML response, signing it when requested.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::EncodingFailure` if compression fails or
    /// `SamlError::SigningFailure` if signing fails.
    pub fn encode_query(
        xml: &str,
        relay_state: Option<&str>,
        signing: Option<RedirectSigning<'_>>,
    ) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        let encoded = base64::engine::general_purpose::URL_SAFE.encode(compressed);

        let mut query = format!("{}={}", params::SAML_RESPONSE, urlencoding::encode(&encoded));
        if let Some(rs) = relay_state {
            query.push_str(&format!("&{}={}", params::RELAY_STATE, urlencoding::encode(rs)));
        }

        if let Some(signing) = signing {
            query.push_str(&format!(
                "&{}={}",
                params::SIG_ALG,
                urlencoding::encode(signing.algorithm.java_name())
            ));
            let signature = signing
                .signer
                .sign_bytes(query.as_bytes(), signing.key_pair, signing.algorithm)?;
            let signature = base64::engine::general_purpose::URL_SAFE.encode(signature);
            query.push_str(&format!(
                "&{}={}",
                params::SIGNATURE,
                urlencoding::encode(&signature)
            ));
        }

        Ok(query)
    }

    /// Builds the full redirect URI.
    ///
    /// Any query string or fragment on `destination` is dropped before the
    /// SAML parameters are appended.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::InvalidDestination` if `destination` is not an
    /// absolute URL, otherwise as [`Self::encode_query`].
    pub fn encode_response(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        signing: Option<RedirectSigning<'_>>,
    ) -> SamlResult<String> {
        let mut url = url::Url::parse(destination)?;
        url.set_query(None);
        url.set_fragment(None);

        let query = Self::encode_query(xml, relay_state, signing)?;
        tracing::debug!(
            destination = url.as_str(),
            signed = signing.is_some(),
            "serialized SAML response for HTTP-Redirect binding"
        );
        Ok(format!("{}?{query}", url.as_str()))
    }

    /// Builds the `302 Found` response redirecting to the encoded URI.
    ///
    /// # Errors
    ///
    /// As [`Self::encode_response`].
    pub fn response(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        signing: Option<RedirectSigning<'_>>,
    ) -> SamlResult<http::Response<String>> {
        let location = Self::encode_response(xml, destination, relay_state, signing)?;
        finish(
            no_cache(StatusCode::FOUND).header(LOCATION, location),
            String::new(),
        )
    }
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::EncodingFailure(format!("Compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::EncodingFailure(format!("Compression finish error: {e}")))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::DeflateDecoder;
    use http::header::{CACHE_CONTROL, PRAGMA};

    use super::*;
    use crate::signature::{XmlSignatureValidator, XmlSigner};

    const XML: &str = r#"<samlp:Response>test response</samlp:Response>"#;

    fn inflate(value: &str) -> String {
        let decoded = urlencoding::decode(value).unwrap();
        let compressed = base64::engine::general_purpose::URL_SAFE
            .decode(decoded.as_ref())
            .unwrap();
        let mut out = String::new();
        DeflateDecoder::new(compressed.as_slice())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    fn key() -> RsaKeyPair {
        RsaKeyPair::from_pem(include_str!("../../tests/fixtures/idp-key.pem")).unwrap()
    }

    #[test]
    fn unsigned_query_inflates_back() {
        let uri = HttpRedirectBinding::encode_response(XML, "https://sp.example/acs", Some("state 1"), None)
            .unwrap();

        let query = uri.strip_prefix("https://sp.example/acs?").unwrap();
        let mut parts = query.split('&');
        let response = parts.next().unwrap().strip_prefix("SAMLResponse=").unwrap();
        assert_eq!(inflate(response), XML);
        assert_eq!(parts.next(), Some("RelayState=state%201"));
        assert_eq!(parts.next(), None);
    }

    #[test]
    fn destination_query_is_dropped() {
        let uri = HttpRedirectBinding::encode_response(
            XML,
            "https://sp.example/acs?existing=param#frag",
            None,
            None,
        )
        .unwrap();
        assert!(uri.starts_with("https://sp.example/acs?SAMLResponse="));
        assert!(!uri.contains("existing"));
        assert!(!uri.contains("frag"));
    }

    #[test]
    fn invalid_destination_is_rejected() {
        let err = HttpRedirectBinding::encode_response(XML, "not a url", None, None).unwrap_err();
        assert!(matches!(err, SamlError::InvalidDestination(_)));
    }

    #[test]
    fn signed_query_has_parameter_order_and_verifies() {
        let key = key();
        let signing = RedirectSigning {
            signer: &XmlSigner::new(),
            key_pair: &key,
            algorithm: SignatureAlgorithm::RsaSha256,
        };
        let query = HttpRedirectBinding::encode_query(XML, Some("xyz"), Some(signing)).unwrap();

        let names: Vec<_> = query
            .split('&')
            .map(|pair| pair.split('=').next().unwrap())
            .collect();
        assert_eq!(names, ["SAMLResponse", "RelayState", "SigAlg", "Signature"]);
        assert!(query.contains("&SigAlg=SHA256withRSA&"));

        let validator = XmlSignatureValidator::new(vec![key.public_key().clone()]);
        assert_eq!(
            validator.validate_redirect_query(&query).unwrap(),
            SignatureAlgorithm::RsaSha256
        );
    }

    #[test]
    fn redirect_response_is_302_without_cache() {
        let response =
            HttpRedirectBinding::response(XML, "https://sp.example/acs", None, None).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers()[LOCATION]
            .to_str()
            .unwrap()
            .starts_with("https://sp.example/acs?SAMLResponse="));
        assert_eq!(response.headers()[PRAGMA], "no-cache");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-cache, no-store");
    }
}
