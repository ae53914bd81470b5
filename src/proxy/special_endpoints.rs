//! Responses the proxy writes itself instead of forwarding.
//!
//! Functions return `EndpointResponse` instead of writing directly to the
//! session so they stay testable; the caller writes them out.

use bytes::Bytes;

/// Response generated locally by the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value, if the response has a body
    pub content_type: Option<&'static str>,
    /// Location header value for redirects
    pub location: Option<String>,
    /// Response body
    pub body: Bytes,
}

impl EndpointResponse {
    /// `200 OK` with body `OK` for liveness checks
    pub fn ok() -> Self {
        Self {
            status: 200,
            content_type: Some("text/plain; charset=utf-8"),
            location: None,
            body: Bytes::from_static(b"OK"),
        }
    }

    /// `404` with an empty body
    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_type: None,
            location: None,
            body: Bytes::new(),
        }
    }

    /// `307 Temporary Redirect` to `location`
    pub fn redirect(location: String) -> Self {
        Self {
            status: 307,
            content_type: None,
            location: Some(location),
            body: Bytes::new(),
        }
    }

    /// `500` with a JSON error body
    pub fn internal_error(message: &str) -> Self {
        let body = serde_json::json!({
            "error": "Internal Server Error",
            "message": message,
            "status": 500
        })
        .to_string();

        Self {
            status: 500,
            content_type: Some("application/json"),
            location: None,
            body: Bytes::from(body),
        }
    }
}
