//! # kc-storage-sql
//!
//! SQLx-based storage implementation for Keycloak Rust.
//!
//! This crate provides `PostgreSQL` storage using `SQLx`. The schema lives in
//! the workspace `migrations/` directory and is applied with
//! [`run_migrations`].

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod authentication;
mod convert;
mod entities;
pub mod error;
pub mod migrations;
pub mod pool;

pub use authentication::PgAuthenticationExecutionProvider;
pub use migrations::run_migrations;
pub use pool::{create_pool, PoolConfig};
