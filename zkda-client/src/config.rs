//! Client configuration.

use std::env;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:16000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`crate::LedgerClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the ledger service API.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let base_url =
            env::var("ZKDA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let timeout_secs: u64 = env::var("ZKDA_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Config pointing at a specific URL, defaults elsewhere.
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}
