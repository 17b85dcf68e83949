//! hk-core: Core abstractions and configuration for hkube
//!
//! This crate provides the shared types, error taxonomy, collaborator traits
//! and configuration structures used by the command runner, the action
//! poller and the CLI.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{CredentialError, FetchError, TransportError};
pub use types::{
    ActionError, ActionId, ActionStatus, CommandOutcome, CommandResult, Credential, ExitStatus,
    KeySource, NodeTarget, RemoteAction,
};
