//! Client configuration.
//!
//! Every section is deserialized with serde defaults, so a partial TOML
//! document only overrides what it names and everything else falls back to
//! the built-in values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::retry::RetryPolicy;

/// Default API root of the public Hypothes.is service.
pub const DEFAULT_BASE_URI: &str = "https://hypothes.is/api";

/// Complete per-client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub create: CreateConfig,
    pub delete: DeleteConfig,
}

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API root, e.g. `https://hypothes.is/api`.
    pub base_uri: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout_seconds: u64,
    /// Custom user agent string (None uses the crate default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            timeout_seconds: 30,
            user_agent: None,
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hard ceiling on the number of annotations a single search may return.
    pub max_annotations: usize,
    pub max_retries: u32,
    pub retry_interval_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_annotations: 10000,
            max_retries: 5,
            retry_interval_seconds: 10,
        }
    }
}

impl SearchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_interval_seconds)
    }
}

/// Creation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateConfig {
    /// Retries per create call; also bounds verification re-submission rounds.
    pub max_retries: u32,
    pub retry_interval_seconds: u64,
    /// Batches larger than this are created one at a time.
    pub max_parallel: usize,
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_interval_seconds: 10,
            max_parallel: 10,
        }
    }
}

impl CreateConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_interval_seconds)
    }
}

/// Deletion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteConfig {
    pub max_retries: u32,
    pub retry_interval_seconds: u64,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_interval_seconds: 10,
        }
    }
}

impl DeleteConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_interval_seconds)
    }
}

impl ClientConfig {
    /// Parse a (possibly partial) TOML document over the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ClientConfig =
            toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Check values that would make the client misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.create.max_parallel == 0 {
            return Err(ClientError::Config(
                "create.max_parallel must be at least 1".to_string(),
            ));
        }
        if self.search.max_annotations == 0 {
            return Err(ClientError::Config(
                "search.max_annotations must be at least 1".to_string(),
            ));
        }
        url::Url::parse(&self.api.base_uri)
            .map_err(|e| ClientError::Config(format!("api.base_uri: {}", e)))?;
        Ok(())
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `HYPOTHESIS_API_URL`: API root
    /// - `HYPOTHESIS_TIMEOUT_SECONDS`
    /// - `HYPOTHESIS_SEARCH_MAX_ANNOTATIONS`
    /// - `HYPOTHESIS_SEARCH_MAX_RETRIES`, `HYPOTHESIS_SEARCH_RETRY_INTERVAL`
    /// - `HYPOTHESIS_CREATE_MAX_RETRIES`, `HYPOTHESIS_CREATE_RETRY_INTERVAL`
    /// - `HYPOTHESIS_CREATE_MAX_PARALLEL`
    /// - `HYPOTHESIS_DELETE_MAX_RETRIES`, `HYPOTHESIS_DELETE_RETRY_INTERVAL`
    ///
    /// Values that fail to parse are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("HYPOTHESIS_API_URL") {
            self.api.base_uri = val;
        }
        override_parsed(&lookup, "HYPOTHESIS_TIMEOUT_SECONDS", &mut self.api.timeout_seconds);
        override_parsed(
            &lookup,
            "HYPOTHESIS_SEARCH_MAX_ANNOTATIONS",
            &mut self.search.max_annotations,
        );
        override_parsed(
            &lookup,
            "HYPOTHESIS_SEARCH_MAX_RETRIES",
            &mut self.search.max_retries,
        );
        override_parsed(
            &lookup,
            "HYPOTHESIS_SEARCH_RETRY_INTERVAL",
            &mut self.search.retry_interval_seconds,
        );
        override_parsed(
            &lookup,
            "HYPOTHESIS_CREATE_MAX_RETRIES",
            &mut self.create.max_retries,
        );
        override_parsed(
            &lookup,
            "HYPOTHESIS_CREATE_RETRY_INTERVAL",
            &mut self.create.retry_interval_seconds,
        );
        override_parsed(
            &lookup,
            "HYPOTHESIS_CREATE_MAX_PARALLEL",
            &mut self.create.max_parallel,
        );
        override_parsed(
            &lookup,
            "HYPOTHESIS_DELETE_MAX_RETRIES",
            &mut self.delete.max_retries,
        );
        override_parsed(
            &lookup,
            "HYPOTHESIS_DELETE_RETRY_INTERVAL",
            &mut self.delete.retry_interval_seconds,
        );
        self
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(parsed) = lookup(key).and_then(|v| v.trim().parse().ok()) {
        *target = parsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_uri, DEFAULT_BASE_URI);
        assert_eq!(config.search.max_annotations, 10000);
        assert_eq!(config.search.max_retries, 5);
        assert_eq!(config.search.retry_interval_seconds, 10);
        assert_eq!(config.create.max_retries, 5);
        assert_eq!(config.create.retry_interval_seconds, 10);
        assert_eq!(config.create.max_parallel, 10);
        assert_eq!(config.delete.max_retries, 5);
        assert_eq!(config.delete.retry_interval_seconds, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            [create]
            max_parallel = 1
            max_retries = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.create.max_parallel, 1);
        assert_eq!(config.create.max_retries, 0);
        assert_eq!(config.create.retry_interval_seconds, 10);
        assert_eq!(config.search, SearchConfig::default());
        assert_eq!(config.delete, DeleteConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ClientConfig::from_toml_str("[create]\nmax_parallel = 0\n").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err = ClientConfig::from_toml_str("[api]\nbase_uri = \"not a url\"\n").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("HYPOTHESIS_API_URL", "https://annotations.example.org/api"),
            ("HYPOTHESIS_CREATE_MAX_PARALLEL", "3"),
            ("HYPOTHESIS_SEARCH_MAX_RETRIES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_uri, "https://annotations.example.org/api");
        assert_eq!(config.create.max_parallel, 3);
        assert_eq!(config.search.max_retries, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nmax_annotations = 500").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.search.max_annotations, 500);
        assert_eq!(config.create, CreateConfig::default());
    }

    #[test]
    fn test_toml_roundtrip_of_effective_config() {
        let rendered = ClientConfig::default().to_toml_string().unwrap();
        assert!(rendered.contains("max_parallel = 10"));
        assert_eq!(
            ClientConfig::from_toml_str(&rendered).unwrap(),
            ClientConfig::default()
        );
    }
}
