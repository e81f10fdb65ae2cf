//! API client configuration.
//!
//! Unique responsibility: load credentials and transport settings from the
//! environment (optionally a `.env` file).

use std::env;

use crate::pool_client::ClientError;

/// Default control-plane URL.
pub const DEFAULT_API_URL: &str = "https://api.openshift.com";

/// Path prefix of the cluster-management API.
pub const CLUSTERS_MGMT_PATH: &str = "/api/clusters_mgmt/v1";

/// Configuration shared by the control-plane and cloud inquiry clients.
#[derive(Clone)]
pub struct ApiConfig {
    /// Bearer token.
    /// Env: `POOLCTL_API_TOKEN` (required)
    pub api_token: String,

    /// Base URL of the API gateway.
    /// Env: `POOLCTL_API_URL` (default: "<https://api.openshift.com>")
    pub api_url: String,

    /// HTTP request timeout in milliseconds.
    /// Env: `POOLCTL_HTTP_TIMEOUT_MS` (default: 30000)
    pub timeout_ms: u64,

    /// Maximum number of retries for idempotent requests.
    /// Env: `POOLCTL_HTTP_RETRY_MAX` (default: 3)
    pub retry_max: u32,

    /// Initial backoff between retries in milliseconds, doubled each attempt.
    /// Env: `POOLCTL_HTTP_RETRY_BACKOFF_MS` (default: 500)
    pub retry_backoff_ms: u64,

    /// User agent sent with every request.
    /// Env: `POOLCTL_USER_AGENT` (default: "poolctl/<version>")
    pub user_agent: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("retry_max", &self.retry_max)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ClientError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);
        Ok(Self {
            api_token: vars.must("POOLCTL_API_TOKEN")?,
            api_url: vars
                .get("POOLCTL_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout_ms: vars.parse_u64("POOLCTL_HTTP_TIMEOUT_MS", 30_000)?,
            retry_max: vars.parse_u32("POOLCTL_HTTP_RETRY_MAX", 3)?,
            retry_backoff_ms: vars.parse_u64("POOLCTL_HTTP_RETRY_BACKOFF_MS", 500)?,
            user_agent: vars
                .get("POOLCTL_USER_AGENT")
                .unwrap_or_else(|| format!("poolctl/{}", env!("CARGO_PKG_VERSION"))),
        })
    }

    /// Base URL of the cluster-management API, without trailing slash.
    #[must_use]
    pub fn clusters_mgmt_url(&self) -> String {
        format!("{}{CLUSTERS_MGMT_PATH}", self.api_url.trim_end_matches('/'))
    }
}

// ============================================================================
// Helper functions
// ============================================================================

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn must(&self, key: &'static str) -> Result<String, ClientError> {
        self.get(key).ok_or(ClientError::MissingEnv(key))
    }

    fn parse_u64(&self, key: &'static str, default: u64) -> Result<u64, ClientError> {
        self.get(key).map_or(Ok(default), |v| {
            v.parse::<u64>().map_err(|_| ClientError::InvalidEnv {
                key,
                value: v,
                reason: "expected an unsigned integer",
            })
        })
    }

    fn parse_u32(&self, key: &'static str, default: u32) -> Result<u32, ClientError> {
        self.get(key).map_or(Ok(default), |v| {
            v.parse::<u32>().map_err(|_| ClientError::InvalidEnv {
                key,
                value: v,
                reason: "expected an unsigned integer",
            })
        })
    }
}
