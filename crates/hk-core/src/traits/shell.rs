//! Remote shell transport traits

use async_trait::async_trait;
use std::fmt;

use crate::error::{CredentialError, TransportError};
use crate::types::{Credential, ExitStatus};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Host, port and login user for one dial attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl DialTarget {
    /// Create a new dial target
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
        }
    }
}

impl fmt::Display for DialTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// How the server's host key is checked during the handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept whatever key the node presents
    #[default]
    AcceptAny,
    /// Require the key to match this fingerprint
    Fingerprint(String),
}

impl HostKeyPolicy {
    /// Whether a presented fingerprint is acceptable
    pub fn accepts(&self, fingerprint: &str) -> bool {
        match self {
            HostKeyPolicy::AcceptAny => true,
            HostKeyPolicy::Fingerprint(expected) => expected == fingerprint,
        }
    }
}

/// A client able to open authenticated remote shell connections
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Parsed key material ready for authentication
    type Auth: Send + Sync;

    /// Connection type produced by [`RemoteShell::dial`]
    type Connection: ShellConnection;

    /// Load and parse a credential once, before any dial attempt
    fn prepare(&self, credential: &Credential) -> Result<Self::Auth, CredentialError>;

    /// Connect and authenticate in a single attempt
    async fn dial(
        &self,
        target: &DialTarget,
        auth: &Self::Auth,
        host_keys: &HostKeyPolicy,
    ) -> Result<Self::Connection, TransportError>;
}

/// An authenticated connection
#[async_trait]
pub trait ShellConnection: Send {
    /// Session type produced by [`ShellConnection::open_session`]
    type Session: ShellSession;

    /// Open a session channel for a single command
    async fn open_session(&mut self) -> Result<Self::Session, TransportError>;

    /// Close the connection. Calling this more than once is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Release the connection immediately, without waiting on the peer
    fn abort(&mut self);
}

/// A session channel scoped to one command
#[async_trait]
pub trait ShellSession: Send {
    /// Run `command`, appending its output to the given sinks
    async fn run(
        &mut self,
        command: &str,
        stdout: &mut Vec<u8>,
        stderr: &mut Vec<u8>,
    ) -> Result<ExitStatus, TransportError>;

    /// Close the session. Calling this more than once is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Release the session immediately, without waiting on the peer
    fn abort(&mut self);
}
