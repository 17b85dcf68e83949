//! Watch command implementation

use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use hk_core::config::HkConfig;
use hk_core::ActionId;
use hk_watch::{watch_action, HcloudActions, WatchContext};

/// Follow an action until it finishes, printing progress samples
pub async fn watch_command(config: &HkConfig, action_id: u64, timeout: Option<u64>) -> Result<()> {
    let source = HcloudActions::from_config(&config.cloud).context(
        "No API token configured. Set HCLOUD_TOKEN or add `token` under [cloud] in the config file",
    )?;

    let cancel = CancellationToken::new();
    let mut ctx = WatchContext::new(cancel.clone());
    if let Some(secs) = timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling watch");
                cancel.cancel();
            }
        }
    });

    let id = ActionId(action_id);
    let mut watch = watch_action(source, id, ctx, &config.watch);

    while let Some(progress) = watch.next_progress().await {
        println!("action {}: {}%", id, progress);
    }
    let outcome = watch.outcome().await;
    ctrl_c.abort();

    match outcome {
        Some(Ok(())) => {
            println!("action {} finished", id);
            Ok(())
        }
        Some(Err(e)) => Err(e.into()),
        None => anyhow::bail!("watch of action {} ended without an outcome", id),
    }
}
