use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Connection to the dataset service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Domain root (e.g., "https://data.example.org"). `/api` is appended.
    pub url: String,
    /// Account used for basic authentication on writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Application token, sent as `X-App-Token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_token: Option<String>,
    /// Per-request timeout in seconds (default: 60)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl ConnectionConfig {
    /// Anonymous connection to `url` with default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            app_token: None,
            timeout_secs: default_timeout(),
        }
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs as u64)
    }
}

fn default_timeout() -> u32 {
    60
}

/// Long-running operation polling.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    /// Poll budget for bounded operations (scan, publish, working copy, view CRUD).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay used when the server defers without suggesting one (milliseconds).
    #[serde(default = "default_retry_delay")]
    pub default_retry_delay_ms: u64,
    /// Fixed cadence of the pending-geocoding check before publication (seconds).
    #[serde(default = "default_geocoding_interval")]
    pub geocoding_interval_secs: u64,
}

impl PollingConfig {
    pub fn default_retry_delay(&self) -> Duration {
        Duration::from_millis(self.default_retry_delay_ms)
    }

    pub fn geocoding_interval(&self) -> Duration {
        Duration::from_secs(self.geocoding_interval_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            default_retry_delay_ms: default_retry_delay(),
            geocoding_interval_secs: default_geocoding_interval(),
        }
    }
}

fn default_max_attempts() -> u32 {
    20
}

fn default_retry_delay() -> u64 {
    4000 // 4 seconds
}

fn default_geocoding_interval() -> u64 {
    10
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub connection: SanitizedConnectionConfig,
    pub polling: PollingConfig,
}

/// Sanitized connection config (password and token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConnectionConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password_configured: bool,
    pub app_token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            connection: SanitizedConnectionConfig {
                url: config.connection.url.clone(),
                username: config.connection.username.clone(),
                password_configured: config
                    .connection
                    .password
                    .as_ref()
                    .is_some_and(|p| !p.is_empty()),
                app_token_configured: config
                    .connection
                    .app_token
                    .as_ref()
                    .is_some_and(|t| !t.is_empty()),
                timeout_secs: config.connection.timeout_secs,
            },
            polling: config.polling.clone(),
        }
    }
}
