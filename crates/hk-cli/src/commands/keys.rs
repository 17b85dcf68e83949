//! Keys command implementation

use anyhow::Result;

use hk_core::config::{expand_home, HkConfig, SshKeyEntry};

/// Render configured SSH keys, one per line
pub fn format_keys(keys: &[SshKeyEntry]) -> String {
    if keys.is_empty() {
        return "No SSH keys configured".to_string();
    }

    let width = keys.iter().map(|k| k.name.len()).max().unwrap_or(0);
    keys.iter()
        .map(|k| {
            format!(
                "{:width$}  {}",
                k.name,
                expand_home(&k.private_key_path).display(),
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// List the configured SSH keys
pub fn keys_command(config: &HkConfig) -> Result<()> {
    println!("{}", format_keys(&config.ssh_keys));
    Ok(())
}
