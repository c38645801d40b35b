//! Transport layer for talking to the identity provider and the directory API
//!
//! Both the credential manager and the Graph client are written against the
//! [`HttpTransport`] trait: one method that performs a single HTTP exchange and
//! reports the status and body. The default implementation is
//! [`ReqwestTransport`]; tests substitute scripted transports.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

pub use reqwest::Method;

/// Network-level failure while performing an HTTP exchange
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Create a new transport error
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        Self::new(format!("{kind}: {err}"))
    }
}

/// A single outbound HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Optional request body
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Create a request with no headers and no body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Look up a header value (case-insensitive)
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True for 2xx statuses
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for performing HTTP exchanges
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status; `Err` is reserved for failures to complete the
/// exchange at all (DNS, connect, timeout, reset).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one HTTP exchange
    ///
    /// # Errors
    /// Returns [`TransportError`] if no response could be obtained
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub use http::ReqwestTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_and_header_lookup() {
        let request = HttpRequest::new(Method::POST, "https://login.example.com/token")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("a=b");

        assert_eq!(
            request.header_value("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.header_value("authorization"), None);
        assert_eq!(request.body.as_deref(), Some(b"a=b".as_slice()));
    }

    #[test]
    fn test_response_success_range() {
        let ok = HttpResponse {
            status: 204,
            body: Vec::new(),
        };
        let bad = HttpResponse {
            status: 400,
            body: Vec::new(),
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
