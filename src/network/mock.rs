//! network::mock
//!
//! Mock transport for deterministic testing.
//!
//! # Design
//!
//! The mock transport answers from canned responses keyed by method and URL.
//! Requests without a canned response echo their body back (POST/PUT) or
//! resolve to `null` (GET/DELETE), which is what a permissive backend that
//! returns the stored entity would do. Every request is recorded so tests
//! can assert on what reached the wire, and failures can be injected per
//! method or per URL.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use truck::network::mock::MockTransport;
//! use truck::network::{Method, Request, Transport};
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransport::new()
//!     .respond(Method::Get, "/resume/1", json!({ "id": 1, "name": "Alex" }));
//!
//! let body = transport.execute(Request::new(Method::Get, "/resume/1")).await.unwrap();
//! assert_eq!(body["name"], "Alex");
//! assert_eq!(transport.request_count(), 1);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::traits::{Method, Request, Transport, TransportError};

/// Mock transport for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state,
/// so a test can keep one clone for assertions while the model layer owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockTransportInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockTransportInner {
    /// Canned responses by (method, url).
    responses: HashMap<(Method, String), Value>,
    /// Failure to inject, if any.
    fail_on: Option<FailOn>,
    /// Recorded requests for verification.
    requests: Vec<Request>,
}

/// Configuration for which requests should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every request with the given error.
    All(TransportError),
    /// Fail requests with the given method.
    Method(Method, TransportError),
    /// Fail requests to the given URL.
    Url(String, TransportError),
}

impl FailOn {
    /// The error to return if this rule matches the request.
    fn matches(&self, request: &Request) -> Option<TransportError> {
        match self {
            FailOn::All(err) => Some(err.clone()),
            FailOn::Method(method, err) if *method == request.method => Some(err.clone()),
            FailOn::Url(url, err) if *url == request.url => Some(err.clone()),
            _ => None,
        }
    }
}

impl MockTransport {
    /// Create a new mock transport without canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canned response for a method and URL.
    ///
    /// A later registration for the same route replaces the earlier one.
    pub fn respond(self, method: Method, url: impl Into<String>, body: Value) -> Self {
        self.set_response(method, url, body);
        self
    }

    /// Register a canned response on a shared handle.
    pub fn set_response(&self, method: Method, url: impl Into<String>, body: Value) {
        self.inner
            .lock()
            .responses
            .insert((method, url.into()), body);
    }

    /// Configure the mock to fail matching requests.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner.lock().fail_on = None;
    }

    /// Get all recorded requests, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.inner.lock().requests.clone()
    }

    /// Number of requests that reached the transport.
    pub fn request_count(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<Request> {
        self.inner.lock().requests.last().cloned()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        self.inner.lock().requests.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn execute(&self, request: Request) -> Result<Value, TransportError> {
        let mut inner = self.inner.lock();
        inner.requests.push(request.clone());

        if let Some(err) = inner.fail_on.as_ref().and_then(|f| f.matches(&request)) {
            return Err(err);
        }

        if let Some(body) = inner
            .responses
            .get(&(request.method, request.url.clone()))
        {
            return Ok(body.clone());
        }

        Ok(match request.method {
            Method::Post | Method::Put => request.body.unwrap_or(Value::Null),
            Method::Get | Method::Delete => Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(url: &str, body: Value) -> Request {
        let mut req = Request::new(Method::Post, url);
        req.body = Some(body);
        req
    }

    #[tokio::test]
    async fn echoes_body_without_canned_response() {
        let transport = MockTransport::new();
        let body = transport
            .execute(post("/resume", json!({ "name": "Alex" })))
            .await
            .unwrap();
        assert_eq!(body, json!({ "name": "Alex" }));
    }

    #[tokio::test]
    async fn get_and_delete_default_to_null() {
        let transport = MockTransport::new();
        let got = transport
            .execute(Request::new(Method::Get, "/resume/1"))
            .await
            .unwrap();
        let deleted = transport
            .execute(Request::new(Method::Delete, "/resume/1"))
            .await
            .unwrap();
        assert!(got.is_null());
        assert!(deleted.is_null());
    }

    #[tokio::test]
    async fn canned_response_wins() {
        let transport =
            MockTransport::new().respond(Method::Post, "/resume", json!({ "id": 7 }));
        let body = transport
            .execute(post("/resume", json!({ "id": null })))
            .await
            .unwrap();
        assert_eq!(body, json!({ "id": 7 }));
    }

    #[tokio::test]
    async fn fail_on_method_only_affects_that_method() {
        let transport =
            MockTransport::new().fail_on(FailOn::Method(Method::Post, TransportError::RateLimited));

        let err = transport
            .execute(post("/resume", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::RateLimited);

        assert!(transport
            .execute(Request::new(Method::Get, "/resume"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn fail_on_url_and_clear() {
        let transport = MockTransport::new().fail_on(FailOn::Url(
            "/resume/1".to_string(),
            TransportError::NotFound("gone".into()),
        ));

        assert!(transport
            .execute(Request::new(Method::Get, "/resume/1"))
            .await
            .is_err());

        transport.clear_fail_on();
        assert!(transport
            .execute(Request::new(Method::Get, "/resume/1"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn records_requests_even_when_failing() {
        let transport =
            MockTransport::new().fail_on(FailOn::All(TransportError::Network("down".into())));
        let _ = transport
            .execute(Request::new(Method::Delete, "/resume/3"))
            .await;

        assert_eq!(transport.request_count(), 1);
        let last = transport.last_request().unwrap();
        assert_eq!(last.method, Method::Delete);
        assert_eq!(last.url, "/resume/3");

        transport.clear_requests();
        assert_eq!(transport.request_count(), 0);
    }
}
