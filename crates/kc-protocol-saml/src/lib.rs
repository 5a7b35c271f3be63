//! SAML 2.0 response security and bindings for Keycloak Rust.
//!
//! This crate secures an already-built SAML response and serializes it for
//! transport back to a service provider:
//!
//! - **XML encryption** - Encrypt the assertion for the service provider
//! - **XML signature** - Sign and validate documents using XML-DSig
//! - **POST and Redirect bindings** - Self-submitting forms and signed redirect URIs
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`xml`] - Namespace-aware document tree and exclusive canonicalization
//! - [`signature`] - Algorithm policy, signer and validator
//! - [`encryption`] - Assertion encryption and decryption
//! - [`bindings`] - POST and Redirect binding serializers
//! - [`builder`] - Fluent builder tying the above together
//! - [`error`] - Error types for SAML operations
//!
//! # Example
//!
//! ```rust,ignore
//! use kc_protocol_saml::{SamlBindingBuilder, XmlDocument};
//!
//! let response = SamlBindingBuilder::from_config(&config.saml)?
//!     .sign(key_pair)
//!     .encrypt(sp_public_key)
//!     .destination("https://sp.example/acs")
//!     .relay_state("abc")
//!     .bind(XmlDocument::parse(&response_xml)?)?
//!     .post_response()?;
//! ```
//!
//! # SAML Specifications
//!
//! This implementation follows these specifications:
//!
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [XML Encryption 1.1](https://www.w3.org/TR/xmlenc-core1/)
//! - [Exclusive XML Canonicalization](https://www.w3.org/TR/xml-exc-c14n/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod builder;
pub mod encryption;
pub mod error;
pub mod signature;
pub mod types;
pub mod xml;

pub use builder::{BoundDocument, SamlBindingBuilder};
pub use error::{SamlError, SamlResult};
pub use signature::SignatureAlgorithm;
pub use types::*;
pub use xml::{QualifiedName, XmlDocument};
