//! Core domain types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

/// Where a remote command runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTarget {
    /// Host name or IP address of the node
    pub address: String,
    /// Name of the SSH key registered for the node
    pub key_name: String,
}

impl NodeTarget {
    /// Create a new target
    pub fn new(address: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            key_name: key_name.into(),
        }
    }
}

/// Private key material, either on disk or inline
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    /// OpenSSH or PEM private key file
    Path(PathBuf),
    /// Private key text held in memory
    Pem(String),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            KeySource::Pem(_) => f.write_str("Pem(<redacted>)"),
        }
    }
}

/// A resolved key reference, used locally to authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Key name as configured
    pub name: String,
    /// Where the private key comes from
    pub source: KeySource,
}

impl Credential {
    /// Credential backed by a private key file
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: KeySource::Path(path.into()),
        }
    }

    /// Credential backed by in-memory key text
    pub fn from_pem(name: impl Into<String>, pem: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: KeySource::Pem(pem.into()),
        }
    }
}

/// How a remote process ended, as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// Process exited with this code
    Code(u32),
    /// Process was killed by a signal
    Signal(String),
    /// Channel closed without reporting an exit status
    Missing,
}

/// Final state of a single command run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Exit code zero
    Success,
    /// Non-zero exit code
    Exited(u32),
    /// Terminated by a signal
    Signaled(String),
    /// Session broke before an exit status was seen
    Aborted(String),
}

impl CommandOutcome {
    /// Whether the command completed with exit code zero
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }
}

impl From<ExitStatus> for CommandOutcome {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Code(0) => CommandOutcome::Success,
            ExitStatus::Code(code) => CommandOutcome::Exited(code),
            ExitStatus::Signal(name) => CommandOutcome::Signaled(name),
            ExitStatus::Missing => CommandOutcome::Aborted("no exit status reported".to_string()),
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Success => write!(f, "success"),
            CommandOutcome::Exited(code) => write!(f, "exited with status {}", code),
            CommandOutcome::Signaled(signal) => write!(f, "killed by signal {}", signal),
            CommandOutcome::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// Captured output of one remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: Bytes,
    pub stderr: Bytes,
    pub outcome: CommandOutcome,
}

impl CommandResult {
    /// Stdout decoded as UTF-8, replacing invalid sequences
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Stderr decoded as UTF-8, replacing invalid sequences
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Identifier of a cloud action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ActionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Status of a cloud action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Running,
    Success,
    Error,
}

/// Failure detail reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Snapshot of a long-running cloud operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAction {
    pub id: ActionId,
    #[serde(default)]
    pub command: String,
    pub status: ActionStatus,
    /// Percentage in 0..=100
    pub progress: u8,
    #[serde(default)]
    pub error: Option<ActionError>,
}

impl RemoteAction {
    /// Snapshot of a running action
    pub fn running(id: u64, progress: u8) -> Self {
        Self {
            id: ActionId(id),
            command: String::new(),
            status: ActionStatus::Running,
            progress: progress.min(100),
            error: None,
        }
    }

    /// Snapshot of a finished action
    pub fn success(id: u64) -> Self {
        Self {
            id: ActionId(id),
            command: String::new(),
            status: ActionStatus::Success,
            progress: 100,
            error: None,
        }
    }

    /// Snapshot of a failed action
    pub fn failed(id: u64, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: ActionId(id),
            command: String::new(),
            status: ActionStatus::Error,
            progress: 100,
            error: Some(ActionError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}
