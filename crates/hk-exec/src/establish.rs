//! Connection establishment with fixed-interval retry

use hk_core::config::RetryPolicy;
use hk_core::traits::{DialTarget, HostKeyPolicy, RemoteShell};

use crate::error::ExecError;

/// Dial `target` until a connection is authenticated or the policy runs out
///
/// Every failure is retried the same way, authentication rejections
/// included. Returns [`ExecError::Dial`] carrying the last failure once
/// `policy.max_attempts` attempts have failed.
pub async fn connect_with_retry<S: RemoteShell>(
    shell: &S,
    target: &DialTarget,
    auth: &S::Auth,
    host_keys: &HostKeyPolicy,
    policy: &RetryPolicy,
) -> Result<S::Connection, ExecError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        tracing::debug!("Dialing {} (attempt {}/{})", target, attempt, max_attempts);

        let err = match shell.dial(target, auth, host_keys).await {
            Ok(conn) => {
                tracing::info!("Connected to {} after {} attempt(s)", target, attempt);
                return Ok(conn);
            }
            Err(e) => e,
        };

        match policy.delay_after(attempt) {
            Some(delay) if attempt < max_attempts => {
                tracing::warn!("dial failed: {}. Retrying in {:?}", err, delay);
                tokio::time::sleep(delay).await;
            }
            _ => {
                tracing::warn!("dial failed: {}. Giving up after {} attempt(s)", err, attempt);
                return Err(ExecError::Dial {
                    target: target.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }
        }
    }
}
