//! SAML bindings implementation.
//!
//! This module serializes an outgoing SAML response for transport:
//!
//! - **HTTP-POST Binding** - The response is base64-encoded into a self-submitting HTML form
//! - **HTTP-Redirect Binding** - The response is deflated, base64-encoded and URL-encoded,
//!   with an optional detached signature over the query string
//!
//! Both produce `http::Response<String>` values that can be returned
//! directly from an axum handler.

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

use http::header::{CACHE_CONTROL, PRAGMA};

use crate::error::{SamlError, SamlResult};

/// `Cache-Control` value sent with every binding response.
pub const NO_CACHE_CONTROL: &str = "no-cache, no-store";

/// Starts a response builder carrying the no-cache headers.
fn no_cache(status: http::StatusCode) -> http::response::Builder {
    http::Response::builder()
        .status(status)
        .header(PRAGMA, "no-cache")
        .header(CACHE_CONTROL, NO_CACHE_CONTROL)
}

fn finish(builder: http::response::Builder, body: String) -> SamlResult<http::Response<String>> {
    builder
        .body(body)
        .map_err(|e| SamlError::EncodingFailure(format!("invalid HTTP response: {e}")))
}
