//! Action watching and cloud API configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs, option_duration_secs};
use crate::error::ConfigError;

/// Settings for action poll sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Interval between two status fetches
    #[serde(with = "duration_millis")]
    pub tick: Duration,

    /// Give up on the action after this long (no limit when unset)
    #[serde(with = "option_duration_secs")]
    pub timeout: Option<Duration>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            timeout: None,
        }
    }
}

impl WatchConfig {
    /// Reject settings the poller cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.is_zero() {
            return Err(ConfigError::Invalid("[watch] tick must be at least 1 ms".to_string()));
        }
        Ok(())
    }
}

/// Cloud control plane endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// API base URL
    pub endpoint: String,

    /// API token; `HCLOUD_TOKEN` takes precedence when set
    pub token: Option<String>,

    /// Per-request limit for status fetches
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.hetzner.cloud/v1".to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl CloudConfig {
    /// Token from the environment, falling back to the config file
    pub fn resolve_token(&self) -> Option<String> {
        std::env::var("HCLOUD_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.clone())
    }
}
