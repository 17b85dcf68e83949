//! Remote command execution configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};
use crate::traits::{HostKeyPolicy, DEFAULT_SSH_PORT};

/// Settings for connecting to nodes and running commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Login user on the node
    pub user: String,

    /// SSH port on the node
    pub port: u16,

    /// Upper bound for a single connect-and-authenticate attempt
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Retry policy while the node's SSH daemon comes up
    pub retry: RetryPolicy,

    /// Expected host key fingerprint. Unset accepts any key, since freshly
    /// provisioned nodes have keys nobody has seen yet.
    pub host_key: Option<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            port: DEFAULT_SSH_PORT,
            connect_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            host_key: None,
        }
    }
}

impl ExecConfig {
    /// Host key policy derived from `host_key`
    pub fn host_key_policy(&self) -> HostKeyPolicy {
        match &self.host_key {
            Some(fingerprint) => HostKeyPolicy::Fingerprint(fingerprint.clone()),
            None => HostKeyPolicy::AcceptAny,
        }
    }
}

/// Fixed-interval retry with a hard attempt cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Pause between two attempts
    #[serde(with = "duration_millis")]
    pub interval: Duration,

    /// Total attempts, including the first one
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 11,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy. A cap of zero is raised to one attempt.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based), or
    /// `None` when no attempts are left
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.max_attempts {
            Some(self.interval)
        } else {
            None
        }
    }
}
