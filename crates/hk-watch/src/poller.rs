//! Action poller
//!
//! Watches a single cloud action until it reaches a terminal state.
//!
//! # Delivery
//!
//! Progress samples go through a `watch` channel that only holds the latest
//! value: a sample the consumer has not read yet is overwritten by the next
//! one, so the poller never waits on the consumer. Duplicates and
//! non-increasing values are passed through as reported.
//!
//! The terminal outcome is sent exactly once on a oneshot channel, after
//! the progress sender has been dropped. A consumer that drains progress
//! until `None` and then awaits the outcome has seen the final sample.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use hk_core::config::WatchConfig;
use hk_core::traits::ActionSource;
use hk_core::{ActionError, ActionId, ActionStatus, FetchError};

/// Shortest interval between two fetches
const MIN_TICK: Duration = Duration::from_millis(1);

/// Terminal errors of a poll session
#[derive(Debug, Error)]
pub enum WatchError {
    /// The caller cancelled the watch
    #[error("watch of action {0} was cancelled")]
    Cancelled(ActionId),

    /// The watch context's deadline passed
    #[error("watch of action {0} exceeded its deadline")]
    DeadlineExceeded(ActionId),

    /// The action snapshot could not be fetched
    #[error("failed to fetch action {id}: {source}")]
    Fetch {
        id: ActionId,
        #[source]
        source: FetchError,
    },

    /// The action itself failed
    #[error("action {id} failed: {error}")]
    Action { id: ActionId, error: ActionError },

    /// The poll task ended without reporting an outcome
    #[error("poll task for action {0} stopped unexpectedly")]
    Interrupted(ActionId),
}

impl WatchError {
    /// Whether this outcome was caused by cancellation or deadline expiry
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            WatchError::Cancelled(_) | WatchError::DeadlineExceeded(_)
        )
    }
}

/// Terminal outcome of a poll session
pub type PollOutcome = Result<(), WatchError>;

/// Cancellation and deadline for a poll session
#[derive(Debug, Clone, Default)]
pub struct WatchContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl WatchContext {
    /// Context cancelled through `cancel`
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Stop the session at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop the session `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The cancellation token
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every session started with this context
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Handle to a running poll session
///
/// Dropping the handle stops the session.
pub struct ActionWatch {
    id: ActionId,
    progress: watch::Receiver<Option<u8>>,
    progress_closed: bool,
    outcome: Option<oneshot::Receiver<PollOutcome>>,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl ActionWatch {
    /// The watched action
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Next unread progress sample, or `None` once the session is done
    /// and the final sample has been read
    pub async fn next_progress(&mut self) -> Option<u8> {
        if self.progress_closed {
            return None;
        }
        match self.progress.changed().await {
            Ok(()) => *self.progress.borrow_and_update(),
            Err(_) => None,
        }
    }

    /// Most recent progress sample, read or not
    pub fn latest_progress(&self) -> Option<u8> {
        *self.progress.borrow()
    }

    /// The terminal outcome. Yields `Some` once; later calls, and calls
    /// after [`ActionWatch::close`] before an outcome was sent, yield `None`.
    pub async fn outcome(&mut self) -> Option<PollOutcome> {
        let rx = self.outcome.take()?;
        rx.await.ok()
    }

    /// Wait for the terminal outcome, discarding unread progress
    pub async fn wait(mut self) -> PollOutcome {
        let id = self.id;
        self.outcome()
            .await
            .unwrap_or(Err(WatchError::Interrupted(id)))
    }

    /// Whether the poll task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the session and close both sources. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.stop.cancel();
        self.progress_closed = true;
        if let Some(rx) = self.outcome.as_mut() {
            rx.close();
        }
    }
}

impl Drop for ActionWatch {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Start polling action `id` in a background task
///
/// Must be called from within a tokio runtime. The tick interval comes
/// from `config`; `config.timeout` applies when `ctx` has no deadline.
pub fn watch_action<A>(
    source: A,
    id: ActionId,
    ctx: WatchContext,
    config: &WatchConfig,
) -> ActionWatch
where
    A: ActionSource + 'static,
{
    let (progress_tx, progress_rx) = watch::channel(None);
    let (outcome_tx, outcome_rx) = oneshot::channel();

    let stop = ctx.cancel.child_token();
    let deadline = ctx
        .deadline
        .or_else(|| config.timeout.map(|timeout| Instant::now() + timeout));
    let tick = config.tick.max(MIN_TICK);

    let task = tokio::spawn({
        let stop = stop.clone();
        async move {
            tracing::debug!("Watching action {} (tick {:?})", id, tick);
            let outcome = poll(&source, id, tick, stop, deadline, progress_tx).await;

            match &outcome {
                Ok(()) => tracing::info!("Action {} succeeded", id),
                Err(e) => tracing::info!("Watch of action {} ended: {}", id, e),
            }

            if outcome_tx.send(outcome).is_err() {
                tracing::debug!("Outcome for action {} discarded, watcher closed", id);
            }
        }
    });

    ActionWatch {
        id,
        progress: progress_rx,
        progress_closed: false,
        outcome: Some(outcome_rx),
        stop,
        task,
    }
}

/// The polling state. Returning is the single transition to done; the
/// progress sender is dropped on return.
async fn poll<A: ActionSource>(
    source: &A,
    id: ActionId,
    tick: Duration,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    progress: watch::Sender<Option<u8>>,
) -> PollOutcome {
    let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let expired = until(deadline);
    tokio::pin!(expired);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WatchError::Cancelled(id)),
            _ = &mut expired => return Err(WatchError::DeadlineExceeded(id)),
            _ = ticker.tick() => {}
        }

        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WatchError::Cancelled(id)),
            _ = &mut expired => return Err(WatchError::DeadlineExceeded(id)),
            fetched = source.get_action(id) => {
                fetched.map_err(|source| WatchError::Fetch { id, source })?
            }
        };

        tracing::trace!(
            "Action {}: {:?} {}%",
            id,
            snapshot.status,
            snapshot.progress
        );

        match snapshot.status {
            ActionStatus::Running => offer(&progress, snapshot.progress),
            ActionStatus::Success => {
                offer(&progress, 100);
                return Ok(());
            }
            ActionStatus::Error => {
                let error = snapshot.error.unwrap_or_else(|| ActionError {
                    code: "unknown".to_string(),
                    message: "action failed without error detail".to_string(),
                });
                return Err(WatchError::Action { id, error });
            }
        }
    }
}

/// Best-effort delivery: replaces any sample the consumer has not read
fn offer(progress: &watch::Sender<Option<u8>>, value: u8) {
    if progress.is_closed() {
        tracing::trace!("Progress sample {} has no reader", value);
    }
    progress.send_replace(Some(value));
}

/// Resolves at `deadline`, never when there is none
fn until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
