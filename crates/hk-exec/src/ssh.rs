//! russh-backed remote shell transport

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::{KeyPair, PublicKey};

use hk_core::config::ExecConfig;
use hk_core::traits::{DialTarget, HostKeyPolicy, RemoteShell, ShellConnection, ShellSession};
use hk_core::{Credential, CredentialError, ExitStatus, KeySource, TransportError};

/// Extended data stream number carrying stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// SSH client transport built on russh
pub struct RusshShell {
    config: Arc<Config>,
    connect_timeout: Duration,
}

impl RusshShell {
    /// Create a transport with the given per-attempt timeout
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            config: Arc::new(Config::default()),
            connect_timeout,
        }
    }

    /// Create a transport from execution settings
    pub fn from_config(config: &ExecConfig) -> Self {
        Self::new(config.connect_timeout)
    }

    async fn connect(
        &self,
        target: &DialTarget,
        key: &Arc<KeyPair>,
        host_keys: &HostKeyPolicy,
    ) -> Result<RusshConnection, TransportError> {
        let handler = ClientHandler::new(host_keys.clone());

        let mut handle = client::connect(
            Arc::clone(&self.config),
            (target.host.as_str(), target.port),
            handler,
        )
        .await
        .map_err(|e| match e.downcast::<TransportError>() {
            Ok(rejected) => rejected,
            Err(e) => TransportError::Connect {
                address: target.to_string(),
                message: e.to_string(),
            },
        })?;

        tracing::debug!("Authenticating as user '{}'", target.user);
        let authenticated = handle
            .authenticate_publickey(&target.user, Arc::clone(key))
            .await
            .map_err(|e| TransportError::Connect {
                address: target.to_string(),
                message: format!("authentication error: {}", e),
            })?;

        if !authenticated {
            return Err(TransportError::AuthRejected(target.user.clone()));
        }

        Ok(RusshConnection {
            handle: Some(handle),
        })
    }
}

/// Parse private key text
fn decode_key(pem: &str) -> Result<KeyPair, CredentialError> {
    russh_keys::decode_secret_key(pem, None).map_err(|e| CredentialError::Invalid(e.to_string()))
}

#[async_trait]
impl RemoteShell for RusshShell {
    type Auth = Arc<KeyPair>;
    type Connection = RusshConnection;

    fn prepare(&self, credential: &Credential) -> Result<Self::Auth, CredentialError> {
        let key = match &credential.source {
            KeySource::Path(path) => {
                let pem = std::fs::read_to_string(path).map_err(|source| {
                    CredentialError::Unreadable {
                        path: path.clone(),
                        source,
                    }
                })?;
                decode_key(&pem)?
            }
            KeySource::Pem(pem) => decode_key(pem)?,
        };
        Ok(Arc::new(key))
    }

    async fn dial(
        &self,
        target: &DialTarget,
        auth: &Self::Auth,
        host_keys: &HostKeyPolicy,
    ) -> Result<Self::Connection, TransportError> {
        tracing::debug!("Connecting to {}", target);
        tokio::time::timeout(self.connect_timeout, self.connect(target, auth, host_keys))
            .await
            .map_err(|_| TransportError::Timeout(target.to_string()))?
    }
}

/// An authenticated russh client connection
///
/// Dropping the connection drops the russh handle, which ends the
/// session's background task.
pub struct RusshConnection {
    handle: Option<Handle<ClientHandler>>,
}

#[async_trait]
impl ShellConnection for RusshConnection {
    type Session = RusshSession;

    async fn open_session(&mut self) -> Result<Self::Session, TransportError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| TransportError::Channel("connection already closed".to_string()))?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::Channel(format!("failed to open session: {}", e)))?;

        Ok(RusshSession {
            channel: Some(channel),
        })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(handle) = self.handle.take() {
            handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(|e| TransportError::Channel(format!("disconnect failed: {}", e)))?;
        }
        Ok(())
    }

    fn abort(&mut self) {
        // Dropping the handle shuts down the client task and its socket.
        self.handle.take();
    }
}

/// A russh session channel running one command
pub struct RusshSession {
    channel: Option<Channel<Msg>>,
}

#[async_trait]
impl ShellSession for RusshSession {
    async fn run(
        &mut self,
        command: &str,
        stdout: &mut Vec<u8>,
        stderr: &mut Vec<u8>,
    ) -> Result<ExitStatus, TransportError> {
        let channel = self
            .channel
            .as_mut()
            .ok_or_else(|| TransportError::Channel("session already closed".to_string()))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| TransportError::Channel(format!("exec request failed: {}", e)))?;

        let mut status = None;
        // Exit status may arrive before the last data; drain until close.
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    status = Some(ExitStatus::Code(exit_status));
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    status = Some(ExitStatus::Signal(format!("{:?}", signal_name)));
                }
                ChannelMsg::Failure => {
                    return Err(TransportError::Channel("exec request rejected".to_string()));
                }
                _ => {}
            }
        }

        // The server closed the channel; nothing left to close on our side.
        self.channel = None;
        Ok(status.unwrap_or(ExitStatus::Missing))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(channel) = self.channel.take() {
            channel
                .close()
                .await
                .map_err(|e| TransportError::Channel(format!("close failed: {}", e)))?;
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.channel.take();
    }
}

/// SSH client handler; only verifies the host key
struct ClientHandler {
    host_keys: HostKeyPolicy,
}

impl ClientHandler {
    fn new(host_keys: HostKeyPolicy) -> Self {
        Self { host_keys }
    }
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        tracing::debug!("Server host key: {}", fingerprint);

        if self.host_keys.accepts(&fingerprint) {
            return Ok(true);
        }

        Err(TransportError::HostKeyRejected(format!(
            "unexpected fingerprint {}",
            fingerprint
        ))
        .into())
    }
}
