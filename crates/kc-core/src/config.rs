//! Configuration management for Keycloak Rust.
//!
//! Configuration is loaded from a TOML file and then overridden from
//! environment variables. Every value has an explicit default so that
//! no component relies on hidden module-level state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure for Keycloak.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SAML response defaults.
    pub saml: SamlConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Cryptographic configuration.
    pub crypto: CryptoConfig,
}

/// Defaults applied to outgoing SAML responses.
///
/// The SAML binding builder is seeded from these values; each field can
/// still be overridden per response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamlConfig {
    /// Symbolic signature algorithm name (e.g. `RSA_SHA256`).
    pub signature_algorithm: String,
    /// Symmetric algorithm family used for assertion encryption.
    pub encryption_algorithm: String,
    /// Symmetric key size in bits used for assertion encryption.
    pub encryption_key_size: u32,
    /// Entity ID of this identity provider, if known up front.
    pub response_issuer: Option<String>,
}

impl Default for SamlConfig {
    fn default() -> Self {
        Self {
            // Interop default; deployments should raise this to RSA_SHA256.
            signature_algorithm: "RSA_SHA1".to_string(),
            encryption_algorithm: "AES".to_string(),
            encryption_key_size: 128,
            response_issuer: None,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/keycloak".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

/// Cryptographic policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Whether SHA-1 based signatures are accepted when validating.
    ///
    /// On by default to match the `RSA_SHA1` signing default.
    pub allow_sha1: bool,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self { allow_sha1: true }
    }
}

impl Config {
    /// Parses configuration from a TOML string.
    ///
    /// Missing sections and fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is not valid TOML or has
    /// fields of the wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }

    /// Loads configuration from a TOML file, then applies environment overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, and `Error::Config` if
    /// it cannot be parsed or an environment override has an invalid value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)?
        } else {
            tracing::debug!("config file {} not found, using defaults", path.display());
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Applies overrides from `KC_*` and `DATABASE_URL` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a numeric variable cannot be parsed.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(alg) = lookup("KC_SAML_SIGNATURE_ALGORITHM") {
            self.saml.signature_algorithm = alg;
        }
        if let Some(alg) = lookup("KC_SAML_ENCRYPTION_ALGORITHM") {
            self.saml.encryption_algorithm = alg;
        }
        if let Some(size) = lookup("KC_SAML_ENCRYPTION_KEY_SIZE") {
            self.saml.encryption_key_size = parse_number("KC_SAML_ENCRYPTION_KEY_SIZE", &size)?;
        }
        if let Some(issuer) = lookup("KC_SAML_ISSUER") {
            self.saml.response_issuer = Some(issuer);
        }
        if let Some(allow) = lookup("KC_CRYPTO_ALLOW_SHA1") {
            self.crypto.allow_sha1 = parse_flag("KC_CRYPTO_ALLOW_SHA1", &allow)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = lookup("KC_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_number("KC_DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(min) = lookup("KC_DB_MIN_CONNECTIONS") {
            self.database.min_connections = parse_number("KC_DB_MIN_CONNECTIONS", &min)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a number, got '{value}'")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::Config(format!("{key} must be true or false, got '{value}'"))),
    }
}
