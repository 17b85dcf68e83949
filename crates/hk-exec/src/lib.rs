//! hk-exec: Remote command execution for hkube
//!
//! Runs a single command on a freshly provisioned node. The node's SSH
//! daemon may still be starting, so connecting is retried on a fixed
//! interval before the command runs in its own session. Session and
//! connection are torn down before the call returns.

mod error;
pub mod establish;
pub mod runner;
pub mod ssh;

pub use error::ExecError;
pub use establish::connect_with_retry;
pub use runner::{run_command, run_remote_command, RemoteRunner};
pub use ssh::{RusshConnection, RusshSession, RusshShell};
