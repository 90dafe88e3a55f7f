use std::time::Duration;

use crate::error::{JobError, Result};

/// Default Gemini API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default interval between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for [`GeminiClient`](crate::client::GeminiClient) and the
/// polling loop.
///
/// Use [`ClientConfig::builder()`] for ergonomic construction or
/// [`ClientConfig::from_env()`] to pick the key up from the environment.
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL, without a trailing slash.
    pub endpoint: String,

    /// API key sent as `x-goog-api-key`.
    pub api_key: String,

    /// Sleep between status checks.
    pub poll_interval: Duration,

    /// Timeout for submit and status calls.
    pub request_timeout: Duration,

    /// Timeout for media downloads.
    pub download_timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("download_timeout", &self.download_timeout)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(300),
        }
    }
}

impl ClientConfig {
    /// Default config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Start building a config with the builder pattern.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Read `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) and optionally
    /// `VEO_ENDPOINT` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .into_iter()
            .filter_map(|k| lookup(k))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .ok_or_else(|| {
                JobError::InvalidRequest("GEMINI_API_KEY or GOOGLE_API_KEY must be set".into())
            })?;

        let mut builder = Self::builder().with_api_key(api_key);
        if let Some(endpoint) = lookup("VEO_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            builder = builder.with_endpoint(endpoint);
        }
        Ok(builder.build())
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the API base URL. Trailing slashes are stripped.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the sleep between status checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.config.download_timeout = timeout;
        self
    }

    /// Build the final [`ClientConfig`].
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("k");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.api_key, "k");
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let config = ClientConfig::builder()
            .with_endpoint("http://localhost:9000///")
            .with_poll_interval(Duration::from_millis(10))
            .build();
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ClientConfig::new("super-secret");
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_from_lookup_prefers_gemini_key() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "gem"),
            ("GOOGLE_API_KEY", "goog"),
            ("VEO_ENDPOINT", "http://proxy/"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_key, "gem");
        assert_eq!(config.endpoint, "http://proxy");
    }

    #[test]
    fn test_from_lookup_falls_back_and_fails() {
        let config = ClientConfig::from_lookup(|k| {
            (k == "GOOGLE_API_KEY").then(|| "goog".to_string())
        })
        .unwrap();
        assert_eq!(config.api_key, "goog");

        let err = ClientConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, JobError::InvalidRequest(_)));
    }
}
