//! Client configuration.

use std::time::Duration;

use labelwise_core::defaults::{
    API_PREFIX, API_URL, MAX_READ_RETRIES, REQUEST_TIMEOUT_SECS, RETRY_BASE_DELAY_MS,
    RETRY_MAX_DELAY_MS, STALE_TIME_SECS,
};

use crate::cache::RetryPolicy;

/// Connection and caching settings for the labeling backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without the `/api/v1` prefix.
    pub api_url: String,
    /// Bearer token to start with, if already logged in.
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Age after which a cached query is refetched.
    pub stale_time_secs: u64,
    /// Retries for read queries after the first attempt.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            token: None,
            timeout_secs: REQUEST_TIMEOUT_SECS,
            stale_time_secs: STALE_TIME_SECS,
            max_retries: MAX_READ_RETRIES,
            retry_base_delay_ms: RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: RETRY_MAX_DELAY_MS,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LABELWISE_API_URL` | `http://localhost:8000` | Backend origin |
    /// | `LABELWISE_TOKEN` | unset | Bearer token |
    /// | `LABELWISE_TIMEOUT_SECS` | `30` | Request timeout |
    /// | `LABELWISE_STALE_SECS` | `60` | Query stale time |
    /// | `LABELWISE_MAX_RETRIES` | `3` | Read query retries |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = std::env::var("LABELWISE_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.api_url);

        let token = std::env::var("LABELWISE_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let timeout_secs = std::env::var("LABELWISE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.timeout_secs)
            .max(1);

        let stale_time_secs = std::env::var("LABELWISE_STALE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.stale_time_secs);

        let max_retries = std::env::var("LABELWISE_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.max_retries);

        Self {
            api_url,
            token,
            timeout_secs,
            stale_time_secs,
            max_retries,
            ..defaults
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    pub fn with_stale_time_secs(mut self, secs: u64) -> Self {
        self.stale_time_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the backoff base delay. Tests use small values.
    pub fn with_retry_delays(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.retry_base_delay_ms = base_ms;
        self.retry_max_delay_ms = max_ms;
        self
    }

    /// `{api_url}/api/v1`
    pub fn base_url(&self) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), API_PREFIX)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    /// Retry policy applied to read queries.
    pub fn read_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }
}
