//! Configuration management for hkube

mod exec;
mod keys;
pub mod serde_utils;
mod watch;

pub use exec::{ExecConfig, RetryPolicy};
pub use keys::{expand_home, SshKeyEntry};
pub use watch::{CloudConfig, WatchConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HkConfig {
    /// Known SSH keys, looked up by name
    pub ssh_keys: Vec<SshKeyEntry>,

    /// Remote command settings
    pub exec: ExecConfig,

    /// Action polling settings
    pub watch: WatchConfig,

    /// Cloud API settings
    pub cloud: CloudConfig,
}

impl HkConfig {
    /// Check values that parse but cannot be used
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watch.validate()
    }
}

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hkube")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load configuration, falling back to defaults when the file is absent
pub fn load_or_default(path: &Path) -> Result<HkConfig, ConfigError> {
    match load_config::<HkConfig>(path) {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(ConfigError::NotFound(path)) => {
            tracing::warn!("Config file {:?} not found, using defaults", path);
            Ok(HkConfig::default())
        }
        Err(e) => Err(e),
    }
}
