//! reqwest-backed transport.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{resolve_user_agent, HttpRequest, HttpResponse, Transport, TransportError};
use crate::config::ApiConfig;

/// Production transport using a pooled reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given timeout and the default user agent.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        Self::with_user_agent(timeout, None)
    }

    /// Create a transport with a custom user agent.
    pub fn with_user_agent(
        timeout: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, TransportError> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Builder(e.to_string()))?;

        Ok(Self { client })
    }

    /// Create a transport from API settings.
    pub fn from_config(config: &ApiConfig) -> Result<Self, TransportError> {
        Self::with_user_agent(
            Duration::from_secs(config.timeout_seconds),
            config.user_agent.as_deref(),
        )
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            "{} {} -> {} in {}ms",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        Ok(HttpResponse { status, body })
    }
}
