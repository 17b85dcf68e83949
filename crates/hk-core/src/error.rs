//! Core error types for hkube

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ActionId;

/// Errors produced while turning a key reference into usable key material
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No key with this name is configured
    #[error("could not find SSH key '{0}'")]
    UnknownKey(String),

    /// Key file could not be read
    #[error("failed to read private key {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key material could not be parsed
    #[error("parse key failed: {0}")]
    Invalid(String),
}

/// Failures reported by a remote shell transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// TCP connect or SSH handshake failed
    #[error("failed to connect to {address}: {message}")]
    Connect { address: String, message: String },

    /// Attempt exceeded the configured connect timeout
    #[error("connection to {0} timed out")]
    Timeout(String),

    /// Server refused the offered key
    #[error("authentication rejected for user '{0}'")]
    AuthRejected(String),

    /// Server host key did not match the configured fingerprint
    #[error("host key verification failed: {0}")]
    HostKeyRejected(String),

    /// Channel-level failure on an open connection
    #[error("channel error: {0}")]
    Channel(String),
}

/// Errors fetching an action snapshot from the cloud control plane
#[derive(Error, Debug)]
pub enum FetchError {
    /// The control plane has no action with this id
    #[error("action {0} not found")]
    NotFound(ActionId),

    /// The API answered with an error status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request could not be sent or the response could not be read
    #[error("request failed: {0}")]
    Request(String),

    /// Response body was not a valid action document
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
