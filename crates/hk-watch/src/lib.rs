//! hk-watch: Background polling of cloud actions
//!
//! A poll session runs as its own task. It samples the action's progress
//! into a lossy channel and finishes with exactly one terminal outcome.

pub mod hcloud;
mod poller;

pub use hcloud::HcloudActions;
pub use poller::{watch_action, ActionWatch, PollOutcome, WatchContext, WatchError};
