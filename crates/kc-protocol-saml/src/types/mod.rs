//! SAML 2.0 constants and shared types.

mod constants;

pub use constants::*;
