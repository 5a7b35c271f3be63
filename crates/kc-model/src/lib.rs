//! # kc-model
//!
//! Domain models for Keycloak Rust.
//!
//! This crate defines the authentication execution entity consumed by
//! authentication flow evaluation.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod authentication;

pub use authentication::{AuthenticationExecution, Requirement, ValidationError};
