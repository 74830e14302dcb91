//! Annotation store client.
//!
//! Search and creation go through the retrying executor; the remaining
//! endpoints are single-shot wrappers.

mod annotations;
mod create;
mod groups;
mod profile;
mod search;

pub use create::CreationMode;
pub use search::order_annotations;

use std::sync::Arc;

use reqwest::Method;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::{HttpRequest, ReqwestTransport, Transport};

/// Client for a Hypothes.is-compatible annotation API.
///
/// Cloning is cheap; clones share the transport and configuration.
#[derive(Clone)]
pub struct HypothesisClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    base_uri: String,
    token: Option<String>,
}

impl std::fmt::Debug for HypothesisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HypothesisClient")
            .field("base_uri", &self.base_uri)
            .field("authenticated", &self.token.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl HypothesisClient {
    /// Create a client with default configuration.
    ///
    /// The token is optional; anonymous clients can only read.
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_config(token, ClientConfig::default())
    }

    /// Create a client with custom configuration using the reqwest transport.
    pub fn with_config(token: Option<String>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config.api)?;
        Self::with_transport(Arc::new(transport), token, config)
    }

    /// Create a client on top of any transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        token: Option<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        config.validate()?;
        let base_uri = normalize_base_uri(&config.api.base_uri);
        let token = token.filter(|t| !t.trim().is_empty());
        Ok(Self {
            transport,
            config: Arc::new(config),
            base_uri,
            token,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_uri(mut self, base_uri: &str) -> Result<Self> {
        url::Url::parse(base_uri)
            .map_err(|e| ClientError::InvalidArgument(format!("base URI {}: {}", base_uri, e)))?;
        let mut config = (*self.config).clone();
        config.api.base_uri = base_uri.to_string();
        self.base_uri = normalize_base_uri(base_uri);
        self.config = Arc::new(config);
        Ok(self)
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Full URL for an API path (`path` starts with `/`).
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_uri, path)
    }

    /// Base request with the common headers and optional authorization.
    pub(crate) fn request(&self, method: Method, path: &str) -> HttpRequest {
        let request = HttpRequest::new(method, self.url(path)).header("cache-control", "no-cache");
        match &self.token {
            Some(token) => request.header("authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Fail fast when an operation needs a token and none is configured.
    pub(crate) fn require_token(&self, action: &'static str) -> Result<()> {
        if self.token.is_some() {
            Ok(())
        } else {
            Err(ClientError::MissingCredential(action))
        }
    }
}

fn normalize_base_uri(uri: &str) -> String {
    uri.trim().trim_end_matches('/').to_string()
}

/// Percent-encode a single path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Reject empty identifiers before they turn into a collection URL.
pub(crate) fn require_id(id: &str, what: &str) -> Result<()> {
    if id.trim().is_empty() {
        Err(ClientError::InvalidArgument(format!("{} id must not be empty", what)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::transport::InMemoryTransport;

    pub const USER: &str = "acct:tester@hypothes.is";

    /// Client and store sharing the given config, with a token.
    pub fn client_with(config: ClientConfig) -> (HypothesisClient, Arc<InMemoryTransport>) {
        let store = Arc::new(InMemoryTransport::new(USER));
        let client =
            HypothesisClient::with_transport(store.clone(), Some("test-token".to_string()), config)
                .expect("valid config");
        (client, store)
    }

    pub fn client() -> (HypothesisClient, Arc<InMemoryTransport>) {
        client_with(ClientConfig::default())
    }

    pub fn anonymous_client() -> (HypothesisClient, Arc<InMemoryTransport>) {
        let store = Arc::new(InMemoryTransport::new(USER));
        let client =
            HypothesisClient::with_transport(store.clone(), None, ClientConfig::default())
                .expect("valid config");
        (client, store)
    }
}
