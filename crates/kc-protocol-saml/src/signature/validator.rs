//! XML Signature validation.
//!
//! Verifies enveloped signatures produced by [`super::XmlSigner`] and
//! detached HTTP-Redirect binding signatures against a set of trusted RSA
//! public keys.

use base64::Engine;
use kc_core::CryptoConfig;
use kc_crypto::{Certificate, RsaPublicKey};

use crate::error::{SamlError, SamlResult};
use crate::types::{canonicalization_algorithms, params, XMLDSIG_NS};
use crate::xml::{c14n, Element, NamespaceScope, XmlDocument};

use super::SignatureAlgorithm;

/// XML signature validator.
///
/// Validates signatures on SAML documents using configured trusted keys.
pub struct XmlSignatureValidator {
    /// Trusted signer keys.
    trusted_keys: Vec<RsaPublicKey>,
    /// Whether to allow SHA-1 signatures (deprecated but sometimes needed).
    allow_sha1: bool,
}

impl XmlSignatureValidator {
    /// Creates a new validator with the given trusted keys.
    #[must_use]
    pub fn new(trusted_keys: Vec<RsaPublicKey>) -> Self {
        Self {
            trusted_keys,
            allow_sha1: false,
        }
    }

    /// Creates a validator trusting the RSA keys of the given certificates.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SignatureInvalid` if a certificate cannot be parsed
    /// or does not carry an RSA key.
    pub fn from_certificates(certificates: &[Certificate]) -> SamlResult<Self> {
        let keys = certificates
            .iter()
            .map(public_key_from_certificate)
            .collect::<SamlResult<Vec<_>>>()?;
        Ok(Self::new(keys))
    }

    /// Creates a validator from PEM-encoded certificates.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SignatureInvalid` if a PEM block is not a usable certificate.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let certificates = certificates_pem
            .iter()
            .map(|pem| {
                Certificate::from_pem(pem)
                    .map_err(|e| SamlError::SignatureInvalid(format!("invalid certificate: {e}")))
            })
            .collect::<SamlResult<Vec<_>>>()?;
        Self::from_certificates(&certificates)
    }

    /// Allows SHA-1 based signatures (not recommended).
    #[must_use]
    pub fn allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Applies the deployment's signature policy.
    #[must_use]
    pub fn with_config(self, config: &CryptoConfig) -> Self {
        self.allow_sha1(config.allow_sha1)
    }

    /// Validates the enveloped signature on the document root.
    ///
    /// Returns the algorithm the document was signed with.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SignatureInvalid` if the signature is missing,
    /// malformed, does not cover the root, or does not verify with any
    /// trusted key.
    pub fn validate_document(&self, document: &XmlDocument) -> SamlResult<SignatureAlgorithm> {
        self.check_document(document).map_err(|e| {
            tracing::warn!(error = %e, "XML signature validation failed");
            e
        })
    }

    /// Parses `xml` and validates its enveloped signature.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::XmlParse` for malformed XML, otherwise as
    /// [`Self::validate_document`].
    pub fn validate(&self, xml: &str) -> SamlResult<SignatureAlgorithm> {
        self.validate_document(&XmlDocument::parse(xml)?)
    }

    /// Validates a detached signature for HTTP-Redirect binding.
    ///
    /// `signed_query` is the raw query string up to (excluding) `&Signature=`,
    /// `signature_b64` the already URL-decoded signature (standard or URL-safe
    /// base64) and `sig_alg` the
    /// `SigAlg` value, either a Java-style name or an XML-DSig URI.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SignatureInvalid` if the signature does not verify.
    pub fn validate_redirect_binding(
        &self,
        signed_query: &str,
        signature_b64: &str,
        sig_alg: &str,
    ) -> SamlResult<SignatureAlgorithm> {
        self.check_redirect(signed_query, signature_b64, sig_alg)
            .map_err(|e| {
                tracing::warn!(error = %e, "redirect binding signature validation failed");
                e
            })
    }

    /// Validates a raw redirect query string as produced by the redirect binding.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::SignatureInvalid` if the query is unsigned or the
    /// signature does not verify over the bytes preceding `&Signature=`.
    pub fn validate_redirect_query(&self, query: &str) -> SamlResult<SignatureAlgorithm> {
        let (signed_query, signature_b64, sig_alg) = split_signed_query(query)?;
        self.validate_redirect_binding(signed_query, &signature_b64, &sig_alg)
    }

    fn check_redirect(
        &self,
        signed_query: &str,
        signature_b64: &str,
        sig_alg: &str,
    ) -> SamlResult<SignatureAlgorithm> {
        let algorithm = SignatureAlgorithm::from_java_name(sig_alg)
            .or_else(|| SignatureAlgorithm::from_uri(sig_alg))
            .ok_or_else(|| {
                SamlError::SignatureInvalid(format!("Unknown signature algorithm: {sig_alg}"))
            })?;
        self.check_algorithm(algorithm)?;

        let signature = decode_b64(signature_b64)?;

        self.verify_with_trusted_keys(signed_query.as_bytes(), &signature, algorithm)?;
        Ok(algorithm)
    }

    fn check_algorithm(&self, algorithm: SignatureAlgorithm) -> SamlResult<()> {
        if algorithm.is_deprecated() && !self.allow_sha1 {
            return Err(SamlError::SignatureInvalid(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }
        Ok(())
    }

    fn check_document(&self, document: &XmlDocument) -> SamlResult<SignatureAlgorithm> {
        let root = document.root();
        let root_scope = document.root_scope();

        let (signature_index, signature) = root
            .find_child(&root_scope, XMLDSIG_NS, "Signature")
            .ok_or_else(|| invalid("No Signature element found"))?;
        let signature_scope = root_scope.enter(signature);

        let signed_info = ds_child(signature, &signature_scope, "SignedInfo")?;
        let signed_info_scope = signature_scope.enter(signed_info);

        let c14n_method = ds_child(signed_info, &signed_info_scope, "CanonicalizationMethod")?
            .attribute("Algorithm")
            .unwrap_or_default();
        if c14n_method != canonicalization_algorithms::EXCLUSIVE_C14N {
            return Err(SamlError::UnsupportedAlgorithm(c14n_method.to_string()));
        }

        let method_uri = ds_child(signed_info, &signed_info_scope, "SignatureMethod")?
            .attribute("Algorithm")
            .unwrap_or_default();
        let algorithm = SignatureAlgorithm::from_uri(method_uri)
            .ok_or_else(|| SamlError::UnsupportedAlgorithm(method_uri.to_string()))?;
        self.check_algorithm(algorithm)?;

        let reference = ds_child(signed_info, &signed_info_scope, "Reference")?;
        let reference_scope = signed_info_scope.enter(reference);
        let expected_uri = root
            .attribute("ID")
            .map_or_else(String::new, |id| format!("#{id}"));
        if reference.attribute("URI").unwrap_or_default() != expected_uri {
            return Err(invalid("Reference does not point at the document root"));
        }

        let digest_method = ds_child(reference, &reference_scope, "DigestMethod")?
            .attribute("Algorithm")
            .unwrap_or_default();
        if digest_method != algorithm.digest_uri() {
            return Err(invalid("Digest method does not match signature method"));
        }

        let expected_digest = decode_b64(&ds_child(reference, &reference_scope, "DigestValue")?.text_content())?;
        let mut unsigned_root = root.clone();
        unsigned_root.children.remove(signature_index);
        let canonical_root = c14n::canonicalize(&unsigned_root, &NamespaceScope::new());
        if kc_crypto::hash(algorithm.hash(), canonical_root.as_bytes()) != expected_digest {
            return Err(invalid("Digest value mismatch"));
        }

        let signature_value =
            decode_b64(&ds_child(signature, &signature_scope, "SignatureValue")?.text_content())?;
        let canonical_signed_info = c14n::canonicalize(signed_info, &signature_scope);
        self.verify_with_trusted_keys(canonical_signed_info.as_bytes(), &signature_value, algorithm)?;

        tracing::debug!(algorithm = %algorithm, "XML signature validated");
        Ok(algorithm)
    }

    fn verify_with_trusted_keys(
        &self,
        data: &[u8],
        signature: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<()> {
        if self
            .trusted_keys
            .iter()
            .any(|key| kc_crypto::rsa_verify(key, algorithm.hash(), data, signature).is_ok())
        {
            return Ok(());
        }
        Err(invalid(
            "Signature verification failed with all trusted keys",
        ))
    }
}

/// Splits a signed redirect query into the signed portion, the decoded
/// signature and the decoded `SigAlg` value.
///
/// # Errors
///
/// Returns `SamlError::SignatureInvalid` if `Signature` or `SigAlg` is missing.
pub fn split_signed_query(query: &str) -> SamlResult<(&str, String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let marker = format!("&{}=", params::SIGNATURE);
    let split = query
        .find(&marker)
        .ok_or_else(|| invalid("Query is not signed"))?;
    let (signed, rest) = query.split_at(split);

    let signature = urlencoding::decode(&rest[marker.len()..])
        .map_err(|e| invalid(&format!("Invalid signature encoding: {e}")))?
        .into_owned();
    let sig_alg = url::form_urlencoded::parse(signed.as_bytes())
        .find(|(key, _)| key == params::SIG_ALG)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| invalid("SigAlg parameter missing"))?;

    Ok((signed, signature, sig_alg))
}

fn invalid(message: &str) -> SamlError {
    SamlError::SignatureInvalid(message.to_string())
}

fn ds_child<'a>(parent: &'a Element, scope: &NamespaceScope, local_name: &str) -> SamlResult<&'a Element> {
    parent
        .find_child(scope, XMLDSIG_NS, local_name)
        .map(|(_, element)| element)
        .ok_or_else(|| invalid(&format!("No {local_name} element found")))
}

/// Decodes standard or URL-safe base64, ignoring whitespace.
fn decode_b64(value: &str) -> SamlResult<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let engine = if compact.contains(|c: char| c == '-' || c == '_') {
        &base64::engine::general_purpose::URL_SAFE
    } else {
        &base64::engine::general_purpose::STANDARD
    };
    engine
        .decode(compact)
        .map_err(|e| invalid(&format!("Invalid base64 value: {e}")))
}

/// Extracts the RSA public key from an X.509 certificate.
fn public_key_from_certificate(certificate: &Certificate) -> SamlResult<RsaPublicKey> {
    let (_, cert) = x509_parser::parse_x509_certificate(certificate.der())
        .map_err(|e| invalid(&format!("Failed to parse certificate: {e}")))?;

    RsaPublicKey::from_der(cert.public_key().raw)
        .map_err(|e| invalid(&format!("Certificate key is not RSA: {e}")))
}
