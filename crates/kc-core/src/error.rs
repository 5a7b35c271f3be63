//! Error handling for Keycloak Rust.
//!
//! ## NIST 800-53 Rev5: SI-11 (Error Handling)
//!
//! Error messages are designed to be informative for debugging while not
//! exposing sensitive information to end users.

use thiserror::Error;

/// Result type alias using the Keycloak error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Keycloak operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Internal)
    }

    /// Returns whether this error was caused by caller-supplied input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_is_generic() {
        let error = Error::Internal;
        // Don't expose internal details
        assert_eq!(error.to_string(), "internal error");
    }

    #[test]
    fn config_errors_are_client_errors() {
        let error = Error::Config("bad key size".to_string());
        assert!(error.is_client_error());
        assert!(!error.is_server_error());
        assert_eq!(error.to_string(), "configuration error: bad key size");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io.into();
        assert!(error.is_server_error());
    }
}
