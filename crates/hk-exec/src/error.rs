//! Remote execution errors

use hk_core::{CommandResult, CredentialError, TransportError};
use thiserror::Error;

/// Errors returned by [`crate::run_remote_command`]
#[derive(Error, Debug)]
pub enum ExecError {
    /// Key reference could not be turned into usable key material
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// No usable connection after all attempts
    #[error("dial {target} failed after {attempts} attempt(s): {source}")]
    Dial {
        target: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// Session could not be opened on a live connection
    #[error("session failed: {0}")]
    Session(#[source] TransportError),

    /// Command ran but did not succeed
    #[error("Run failed: `{command}` {}", .result.outcome)]
    Command {
        command: String,
        result: CommandResult,
    },
}

impl ExecError {
    /// Captured output, when the command got far enough to produce some
    pub fn output(&self) -> Option<&CommandResult> {
        match self {
            ExecError::Command { result, .. } => Some(result),
            _ => None,
        }
    }
}
