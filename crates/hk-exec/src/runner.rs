//! Single-command session runner

use bytes::Bytes;

use hk_core::config::ExecConfig;
use hk_core::traits::{DialTarget, KeyResolver, RemoteShell, ShellConnection, ShellSession};
use hk_core::{CommandOutcome, CommandResult, CredentialError, NodeTarget};

use crate::error::ExecError;
use crate::establish::connect_with_retry;

/// Resolve the node's key, connect with retry, and run `command` once
pub async fn run_remote_command<S, K>(
    shell: &S,
    keys: &K,
    config: &ExecConfig,
    node: &NodeTarget,
    command: &str,
) -> Result<CommandResult, ExecError>
where
    S: RemoteShell,
    K: KeyResolver + ?Sized,
{
    let credential = keys
        .resolve_key(&node.key_name)
        .ok_or_else(|| CredentialError::UnknownKey(node.key_name.clone()))?;
    let auth = shell.prepare(&credential)?;

    let target = DialTarget::new(&node.address, config.port, &config.user);
    let conn = connect_with_retry(
        shell,
        &target,
        &auth,
        &config.host_key_policy(),
        &config.retry,
    )
    .await?;

    run_command(conn, command).await
}

/// Run `command` in a fresh session on `conn`, then close both
///
/// The connection is consumed. It is closed before returning on every
/// path, and aborted if this future is dropped first.
pub async fn run_command<C: ShellConnection>(
    conn: C,
    command: &str,
) -> Result<CommandResult, ExecError> {
    let mut conn = AbortOnDrop::new(conn, <C as ShellConnection>::abort);
    let result = run_in_session(&mut conn.inner, command).await;

    let closed = conn.inner.close().await;
    conn.disarm();
    if let Err(e) = closed {
        tracing::debug!("Error closing connection: {}", e);
    }

    result
}

async fn run_in_session<C: ShellConnection>(
    conn: &mut C,
    command: &str,
) -> Result<CommandResult, ExecError> {
    let session = conn.open_session().await.map_err(ExecError::Session)?;
    let mut session = AbortOnDrop::new(session, <C::Session as ShellSession>::abort);

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let status = session.inner.run(command, &mut stdout, &mut stderr).await;

    let closed = session.inner.close().await;
    session.disarm();
    if let Err(e) = closed {
        tracing::debug!("Error closing session: {}", e);
    }

    let outcome = match status {
        Ok(status) => CommandOutcome::from(status),
        Err(e) => CommandOutcome::Aborted(e.to_string()),
    };
    let result = CommandResult {
        stdout: Bytes::from(stdout),
        stderr: Bytes::from(stderr),
        outcome,
    };

    if result.outcome.is_success() {
        return Ok(result);
    }

    tracing::warn!(
        "> {}\n{}\nstderr: {}\nstdout: {}",
        command,
        result.outcome,
        result.stderr_lossy(),
        result.stdout_lossy()
    );
    Err(ExecError::Command {
        command: command.to_string(),
        result,
    })
}

/// Aborts the wrapped session or connection when dropped before a clean close
struct AbortOnDrop<T> {
    inner: T,
    armed: bool,
    abort: fn(&mut T),
}

impl<T> AbortOnDrop<T> {
    fn new(inner: T, abort: fn(&mut T)) -> Self {
        Self {
            inner,
            armed: true,
            abort,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Releasing remote resource after abandoned run");
            (self.abort)(&mut self.inner);
        }
    }
}

/// Runs commands on nodes with a fixed transport, key registry and config
pub struct RemoteRunner<S, K> {
    shell: S,
    keys: K,
    config: ExecConfig,
}

impl<S: RemoteShell, K: KeyResolver> RemoteRunner<S, K> {
    /// Create a new runner
    pub fn new(shell: S, keys: K, config: ExecConfig) -> Self {
        Self {
            shell,
            keys,
            config,
        }
    }

    /// Get the execution configuration
    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Run `command` on `node`
    pub async fn run(&self, node: &NodeTarget, command: &str) -> Result<CommandResult, ExecError> {
        run_remote_command(&self.shell, &self.keys, &self.config, node, command).await
    }
}
