//! Core trait definitions

mod action;
mod credentials;
mod shell;

pub use action::ActionSource;
pub use credentials::KeyResolver;
pub use shell::{
    DialTarget, HostKeyPolicy, RemoteShell, ShellConnection, ShellSession, DEFAULT_SSH_PORT,
};
