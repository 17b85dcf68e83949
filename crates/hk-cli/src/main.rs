//! hkube CLI
//!
//! Runs commands on freshly provisioned nodes over SSH and follows
//! long-running cloud actions until they finish.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hk_core::config;
use hkube::commands;

#[derive(Parser)]
#[command(name = "hkube")]
#[command(author, version, about = "Remote command runner and cloud action watcher")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command on a node, retrying until its SSH daemon is up
    Run {
        /// Node IP address or hostname
        #[arg(long)]
        ip: String,
        /// Name of the configured SSH key to authenticate with
        #[arg(short, long)]
        key: String,
        /// Login user (overrides config)
        #[arg(short, long)]
        user: Option<String>,
        /// SSH port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Command to run, passed to the remote shell as one string
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Follow a cloud action until it succeeds or fails
    Watch {
        /// Action ID
        action_id: u64,
        /// Give up after this many seconds (overrides config)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// List configured SSH keys
    Keys,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let mut config = config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    match cli.command {
        Commands::Run {
            ip,
            key,
            user,
            port,
            command,
        } => {
            if let Some(user) = user {
                config.exec.user = user;
            }
            if let Some(port) = port {
                config.exec.port = port;
            }
            commands::run_command(&config, &ip, &key, &command.join(" ")).await
        }
        Commands::Watch { action_id, timeout } => {
            commands::watch_command(&config, action_id, timeout).await
        }
        Commands::Keys => commands::keys_command(&config),
    }
}
