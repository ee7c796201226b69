//! network::traits
//!
//! Transport trait definition and request/response types.
//!
//! # Design
//!
//! The `Transport` trait is async because every call involves I/O. It deals
//! in already-unwrapped JSON bodies: an implementation sends one request and
//! resolves with the response body (null when the body is empty) or a
//! [`TransportError`].
//!
//! A transport performs no retries and imposes no timeouts of its own. A
//! failed request surfaces to the caller exactly once.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors from transport operations.
///
/// These map to the common failure modes of a JSON REST backend. The model
/// layer surfaces them to callers unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The server rejected the credentials or lacks permissions (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource was not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (429).
    #[error("rate limited")]
    RateLimited,

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// A success response whose body is not valid JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (bad header, bad URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP verb
    pub method: Method,
    /// Absolute (or base-relative) URL
    pub url: String,
    /// Headers to send, already merged with defaults
    pub headers: BTreeMap<String, String>,
    /// JSON body, if any
    pub body: Option<Value>,
}

impl Request {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

/// The transport the model layer talks through.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one transport can be shared by
/// every model class built from the same entry point.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name (e.g. "http", "mock").
    fn name(&self) -> &'static str;

    /// Execute a request and return the unwrapped response body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] for connection failures, non-success
    /// statuses and undecodable bodies.
    async fn execute(&self, request: Request) -> Result<Value, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.to_string(), "POST");
        assert_eq!(Method::Put.to_string(), "PUT");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn request_new_is_bare() {
        let req = Request::new(Method::Get, "/resume");
        assert_eq!(req.url, "/resume");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn transport_error_display() {
        assert_eq!(
            TransportError::Unauthorized("expired token".into()).to_string(),
            "unauthorized: expired token"
        );
        assert_eq!(
            TransportError::NotFound("/resume/9".into()).to_string(),
            "not found: /resume/9"
        );
        assert_eq!(TransportError::RateLimited.to_string(), "rate limited");
        assert_eq!(
            TransportError::Api {
                status: 422,
                message: "Validation failed".into()
            }
            .to_string(),
            "API error: 422 - Validation failed"
        );
        assert_eq!(
            TransportError::Network("connection refused".into()).to_string(),
            "network error: connection refused"
        );
        assert_eq!(
            TransportError::Decode("expected value".into()).to_string(),
            "failed to decode response: expected value"
        );
    }
}
