//! HTTP transport seam.
//!
//! Everything above this module speaks in immutable [`HttpRequest`]
//! descriptors. A [`Transport`] sends one descriptor and resolves with the
//! status and body, or a classified network failure.

mod http;
pub mod memory;
mod response;
mod user_agent;

pub use http::ReqwestTransport;
pub use memory::InMemoryTransport;
pub use response::HttpResponse;
pub use user_agent::{resolve_user_agent, USER_AGENT};

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

/// Network-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out")]
    Timeout,
    #[error("unable to build HTTP client: {0}")]
    Builder(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_builder() {
            TransportError::Builder(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Fully-formed request descriptor.
///
/// Built once per logical call and never mutated afterwards; retries and
/// concurrent sibling calls each hold their own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn query(mut self, params: Vec<(String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    /// Attach a JSON body and the matching content type.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self.header("content-type", "application/json"))
    }

    /// Look up a header (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a query parameter.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Anything that can perform an HTTP request asynchronously.
///
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new(Method::POST, "https://hypothes.is/api/annotations")
            .header("Authorization", "Bearer abc")
            .json(&serde_json::json!({"text": "Test"}))
            .unwrap();

        assert_eq!(request.header_value("authorization"), Some("Bearer abc"));
        assert_eq!(request.header_value("content-type"), Some("application/json"));
        assert_eq!(request.body.as_ref().unwrap()["text"], "Test");
    }

    #[test]
    fn test_query_lookup() {
        let request = HttpRequest::new(Method::GET, "https://hypothes.is/api/search").query(vec![
            ("limit".to_string(), "200".to_string()),
            ("offset".to_string(), "0".to_string()),
        ]);
        assert_eq!(request.query_value("limit"), Some("200"));
        assert_eq!(request.query_value("search_after"), None);
    }
}
