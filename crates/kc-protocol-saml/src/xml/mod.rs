//! Minimal namespace-aware XML tree used for signing and encryption.
//!
//! Documents are parsed with `quick-xml` into an owned tree so that
//! elements can be located by namespace, replaced in place and written
//! back out. [`c14n`] renders elements in Exclusive XML Canonicalization
//! form for digests and signatures.

pub mod c14n;
mod document;
mod escape;

pub use document::{
    Attribute, Element, NamespaceDecl, NamespaceScope, Node, QualifiedName, XmlDocument,
};
