//! CLI command implementations

mod keys;
mod run;
mod watch;

pub use keys::{format_keys, keys_command};
pub use run::run_command;
pub use watch::watch_command;
