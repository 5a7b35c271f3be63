//! # kc-core
//!
//! Core configuration and error handling for Keycloak Rust.
//!
//! This crate provides the configuration values shared by the SAML binding
//! layer and the storage crates, plus the workspace-level error type used
//! while loading them.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - CM-6: Configuration settings
//! - SI-11: Error handling

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod error;

pub use config::{Config, CryptoConfig, DatabaseConfig, SamlConfig};
pub use error::{Error, Result};
