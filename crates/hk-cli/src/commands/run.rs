//! Run command implementation

use std::io::Write;

use anyhow::{Context, Result};

use hk_core::config::HkConfig;
use hk_core::NodeTarget;
use hk_exec::{ExecError, RemoteRunner, RusshShell};

/// Execute `command` on the node at `address` and print its stdout
pub async fn run_command(config: &HkConfig, address: &str, key: &str, command: &str) -> Result<()> {
    let shell = RusshShell::from_config(&config.exec);
    let runner = RemoteRunner::new(shell, config.ssh_keys.clone(), config.exec.clone());
    let node = NodeTarget::new(address, key);

    match runner.run(&node, command).await {
        Ok(result) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&result.stdout)?;
            stdout.flush()?;
            Ok(())
        }
        Err(ExecError::Command { command, result }) => {
            let mut stderr = std::io::stderr().lock();
            writeln!(stderr, "> {}", command)?;
            stderr.write_all(&result.stderr)?;
            stderr.write_all(&result.stdout)?;
            stderr.flush()?;
            anyhow::bail!("`{}` {}", command, result.outcome)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to run command on {}", address)),
    }
}
