//! Provider configuration.
//!
//! Explicit values win; otherwise the API key and endpoint come from the
//! `RUNPOD_API_KEY` and `RUNPOD_API_URL` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RunpodError;
use crate::transport::RetryPolicy;

/// Default RunPod GraphQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.runpod.io/graphql";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "RUNPOD_API_KEY";

/// Environment variable overriding the endpoint.
pub const ENDPOINT_ENV: &str = "RUNPOD_API_URL";

/// Default timeout for a single HTTP exchange.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where the credential is attached to outgoing requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPlacement {
    /// `?api_key=...` query parameter, as the RunPod API documents.
    #[default]
    QueryParam,
    /// `Authorization: Bearer ...` header.
    BearerHeader,
}

/// Provider configuration as supplied by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// RunPod API key. Falls back to `RUNPOD_API_KEY`.
    pub api_key: Option<String>,
    /// GraphQL endpoint. Falls back to `RUNPOD_API_URL`, then [`DEFAULT_ENDPOINT`].
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum attempts per exchange.
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// How the credential is sent.
    pub credential_placement: CredentialPlacement,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            api_key: None,
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: retry.max_attempts,
            base_delay_ms: u64::try_from(retry.base_delay.as_millis()).unwrap_or(u64::MAX),
            credential_placement: CredentialPlacement::default(),
        }
    }
}

impl ProviderConfig {
    /// Create a config with an explicit API key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Resolve the API key from config or environment.
    ///
    /// # Errors
    /// Returns [`RunpodError::Config`] if neither source provides a non-empty key.
    pub fn resolve_api_key(&self) -> Result<String, RunpodError> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                RunpodError::Config(format!(
                    "missing API key: set api_key in configuration or the {API_KEY_ENV} environment variable"
                ))
            })
    }

    /// Resolve the GraphQL endpoint.
    #[must_use]
    pub fn resolve_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| std::env::var(ENDPOINT_ENV).ok().filter(|e| !e.is_empty()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry policy derived from this config.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_explicit_api_key_wins_over_env() {
        std::env::set_var(API_KEY_ENV, "from-env");
        let config = ProviderConfig::with_api_key("explicit");
        assert_eq!(config.resolve_api_key().unwrap(), "explicit");
        std::env::remove_var(API_KEY_ENV);
    }

    #[test]
    #[serial]
    fn test_api_key_falls_back_to_env() {
        std::env::set_var(API_KEY_ENV, "from-env");
        let config = ProviderConfig::default();
        assert_eq!(config.resolve_api_key().unwrap(), "from-env");
        std::env::remove_var(API_KEY_ENV);
    }

    #[test]
    #[serial]
    fn test_missing_api_key_is_config_error() {
        std::env::remove_var(API_KEY_ENV);
        let err = ProviderConfig::default().resolve_api_key().unwrap_err();
        assert!(matches!(err, RunpodError::Config(_)));
    }

    #[test]
    #[serial]
    fn test_endpoint_default() {
        std::env::remove_var(ENDPOINT_ENV);
        assert_eq!(ProviderConfig::default().resolve_endpoint(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_defaults_match_retry_policy() {
        let config = ProviderConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(60));
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"api_key": "k", "credential_placement": "bearer_header"}"#)
                .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.credential_placement, CredentialPlacement::BearerHeader);
        assert_eq!(config.max_attempts, 5);
    }
}
