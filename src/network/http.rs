//! network::http
//!
//! HTTP transport backed by reqwest.
//!
//! # Design
//!
//! One [`reqwest::Client`] is shared by every request. Bodies are sent as
//! JSON; success bodies are read as text so an empty body can resolve to
//! `null` instead of a decode failure.
//!
//! Status mapping:
//! - 401 / 403 → [`TransportError::Unauthorized`]
//! - 404 → [`TransportError::NotFound`]
//! - 429 → [`TransportError::RateLimited`]
//! - any other non-success → [`TransportError::Api`]

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::traits::{Method, Request, Transport, TransportError};

/// Transport that performs real HTTP requests.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    /// HTTP client for making requests
    client: Client,
}

/// Error body shapes commonly returned by JSON APIs.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a transport around an existing client.
    ///
    /// Use this to configure timeouts, proxies or TLS on the client itself.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert request headers into a reqwest header map.
    fn header_map(request: &Request) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::InvalidRequest(format!("invalid header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("invalid header value for '{}': {}", name, e))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Unwrap a response into its JSON body, mapping errors appropriately.
    async fn handle_response(response: Response) -> Result<Value, TransportError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()));
        }

        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                message: Some(message),
                ..
            }) => message,
            Ok(ErrorBody {
                error: Some(error), ..
            }) => error,
            _ if !text.trim().is_empty() => text.trim().to_string(),
            _ => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                TransportError::Unauthorized(message)
            }
            StatusCode::NOT_FOUND => TransportError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => TransportError::RateLimited,
            _ => TransportError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn execute(&self, request: Request) -> Result<Value, TransportError> {
        let headers = Self::header_map(&request)?;

        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        let builder = match &request.body {
            Some(body) => builder.headers(headers).json(body),
            None => builder.headers(headers),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn header_map_accepts_valid_headers() {
        let mut request = Request::new(Method::Get, "http://localhost/resume");
        request
            .headers
            .insert("Accept".to_string(), "application/json".to_string());

        let headers = HttpTransport::header_map(&request).unwrap();
        assert_eq!(headers.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn header_map_rejects_invalid_name() {
        let request = Request {
            method: Method::Get,
            url: "http://localhost".to_string(),
            headers: BTreeMap::from([("bad header".to_string(), "x".to_string())]),
            body: None,
        };

        let err = HttpTransport::header_map(&request).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[test]
    fn transport_name() {
        assert_eq!(HttpTransport::new().name(), "http");
    }
}
