//! HTTP-POST Binding implementation.
//!
//! Implements the SAML 2.0 HTTP-POST binding for returning a SAML response
//! to the service provider via an auto-submitting HTML form.

use base64::Engine;
use http::header::CONTENT_TYPE;
use http::StatusCode;

use crate::error::SamlResult;
use crate::types::params;

use super::{finish, no_cache};

/// HTTP-POST binding encoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a SAML response as an HTML form that auto-submits to `destination`.
    #[must_use]
    pub fn encode_response(xml: &str, destination: &str, relay_state: Option<&str>) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);

        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<INPUT TYPE="HIDDEN" NAME="{}" VALUE="{}"/>"#,
                    params::RELAY_STATE,
                    html_escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            concat!(
                "<HTML><HEAD><TITLE>HTTP Post Binding Response (Response)</TITLE></HEAD>",
                r#"<BODY Onload="document.forms[0].submit()">"#,
                r#"<FORM METHOD="POST" ACTION="{}">"#,
                r#"<INPUT TYPE="HIDDEN" NAME="{}" VALUE="{}"/>"#,
                "{}",
                "<NOSCRIPT>",
                "<P>JavaScript is disabled. We strongly recommend to enable it. Click the button below to continue.</P>",
                r#"<INPUT TYPE="SUBMIT" VALUE="CONTINUE" />"#,
                "</NOSCRIPT>",
                "</FORM></BODY></HTML>"
            ),
            html_escape(destination),
            params::SAML_RESPONSE,
            encoded,
            relay_state_input
        )
    }

    /// Builds the `200 OK` HTML response carrying the form.
    ///
    /// # Errors
    ///
    /// Returns `SamlError::EncodingFailure` if the HTTP response cannot be assembled.
    pub fn response(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<http::Response<String>> {
        let body = Self::encode_response(xml, destination, relay_state);
        tracing::debug!(destination, "serialized SAML response for HTTP-POST binding");
        finish(
            no_cache(StatusCode::OK).header(CONTENT_TYPE, "text/html"),
            body,
        )
    }
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
