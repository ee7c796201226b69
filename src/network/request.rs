//! network::request
//!
//! The request layer the model talks to.
//!
//! # Design
//!
//! [`NetworkRequest`] is stateless apart from its default headers. It offers
//! the four verbs the model layer needs, merges default and per-request
//! headers, and hands the request to a [`Transport`].
//!
//! Offline requests never reach the transport. POST and PUT resolve with the
//! data they were given; GET and DELETE resolve with `null`. This is how
//! offline clones flow through the same save/delete code paths as their
//! online originals without doing any I/O.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::traits::{Method, Request, Transport, TransportError};

/// Header every request carries unless overridden.
pub const DEFAULT_ACCEPT: (&str, &str) = ("Accept", "application/json");

/// Per-request configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    /// Resolve locally without touching the transport
    pub offline: bool,
    /// Extra headers for this request only
    pub headers: BTreeMap<String, String>,
}

impl RequestConfig {
    /// Configuration with only the offline flag set.
    pub fn offline(offline: bool) -> Self {
        Self {
            offline,
            ..Self::default()
        }
    }

    /// Add a header for this request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Thin request layer over a shared [`Transport`].
#[derive(Clone)]
pub struct NetworkRequest {
    /// Transport executing online requests
    transport: Arc<dyn Transport>,
    /// Headers sent with every request
    headers: BTreeMap<String, String>,
}

impl fmt::Debug for NetworkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkRequest")
            .field("transport", &self.transport.name())
            .field("headers", &self.headers)
            .finish()
    }
}

impl NetworkRequest {
    /// Create a request layer with the default header set.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(DEFAULT_ACCEPT.0.to_string(), DEFAULT_ACCEPT.1.to_string());
        Self { transport, headers }
    }

    /// Add default headers, overriding existing ones with the same name.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers.insert(name.into(), value.into());
        }
        self
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The default header set.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Make a GET request.
    pub async fn get(&self, url: &str, config: RequestConfig) -> Result<Value, TransportError> {
        self.send(Method::Get, url, None, config).await
    }

    /// Make a POST request.
    pub async fn post(
        &self,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> Result<Value, TransportError> {
        self.send(Method::Post, url, data, config).await
    }

    /// Make a PUT request.
    pub async fn put(
        &self,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> Result<Value, TransportError> {
        self.send(Method::Put, url, data, config).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, url: &str, config: RequestConfig) -> Result<Value, TransportError> {
        self.send(Method::Delete, url, None, config).await
    }

    /// Build the header set for a request: defaults, then per-request ones.
    fn build_headers(&self, config: &RequestConfig) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        headers.extend(config.headers.clone());
        headers
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        data: Option<Value>,
        config: RequestConfig,
    ) -> Result<Value, TransportError> {
        if config.offline {
            tracing::debug!(target: crate::util::LOG_TARGET, %method, url, "offline request resolved locally");
            return Ok(match method {
                Method::Post | Method::Put => data.unwrap_or(Value::Null),
                Method::Get | Method::Delete => Value::Null,
            });
        }

        tracing::debug!(
            target: crate::util::LOG_TARGET,
            %method,
            url,
            transport = self.transport.name(),
            "sending request"
        );

        let request = Request {
            method,
            url: url.to_string(),
            headers: self.build_headers(&config),
            body: data,
        };

        self.transport.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::MockTransport;
    use serde_json::json;

    fn layer() -> (NetworkRequest, MockTransport) {
        let mock = MockTransport::new();
        (NetworkRequest::new(Arc::new(mock.clone())), mock)
    }

    #[tokio::test]
    async fn offline_post_resolves_with_data() {
        let (network, mock) = layer();
        let body = network
            .post("/resume", Some(json!({ "name": "Alex" })), RequestConfig::offline(true))
            .await
            .unwrap();

        assert_eq!(body, json!({ "name": "Alex" }));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn offline_delete_resolves_with_null() {
        let (network, mock) = layer();
        let body = network
            .delete("/resume/1", RequestConfig::offline(true))
            .await
            .unwrap();

        assert!(body.is_null());
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn default_headers_are_sent() {
        let (network, mock) = layer();
        network.get("/resume", RequestConfig::default()).await.unwrap();

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.headers.get("Accept").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn request_headers_override_defaults() {
        let mock = MockTransport::new();
        let network = NetworkRequest::new(Arc::new(mock.clone()))
            .with_headers([("X-Requested-With", "XMLHttpRequest")]);

        network
            .put(
                "/resume/1",
                Some(json!({})),
                RequestConfig::default().header("Accept", "text/plain"),
            )
            .await
            .unwrap();

        let request = mock.last_request().unwrap();
        assert_eq!(request.headers.get("Accept").unwrap(), "text/plain");
        assert_eq!(
            request.headers.get("X-Requested-With").unwrap(),
            "XMLHttpRequest"
        );
        assert_eq!(request.body, Some(json!({})));
    }

    #[test]
    fn debug_hides_transport_internals() {
        let (network, _) = layer();
        let rendered = format!("{:?}", network);
        assert!(rendered.contains("mock"));
    }
}
