//! # kc-storage
//!
//! Storage abstraction traits for Keycloak Rust.
//!
//! This crate defines the storage provider interfaces that must be
//! implemented by concrete storage backends (SQL, in-memory).
//!
//! ## Provider Traits
//!
//! - [`AuthenticationExecutionProvider`] - CRUD and ordering for authentication flow executions
//!
//! [`InMemoryAuthenticationExecutionProvider`] backs tests and single-node setups.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod authentication;
pub mod error;
pub mod memory;

pub use authentication::AuthenticationExecutionProvider;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryAuthenticationExecutionProvider;
