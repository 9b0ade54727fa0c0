/*!

The polling primitive used wherever the harness waits on the cluster. Waits suspend the calling
task between polls; they never spawn workers.

!*/

use log::trace;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a wait ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WaitOutcome {
    /// The predicate returned `true`.
    Satisfied,
    /// `total` elapsed without the predicate returning `true`.
    TimedOut,
    /// The cancellation token was triggered.
    Cancelled,
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied)
    }
}

/// Poll `predicate` every `step` until it returns `true` or `total` has elapsed. Returns `false` on
/// timeout. The predicate is always evaluated at least once.
pub async fn wait_for<F, Fut>(predicate: F, step: Duration, total: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    wait_until(predicate, step, total, &CancellationToken::new())
        .await
        .is_satisfied()
}

/// Poll `predicate` every `step` until it returns `true`, `total` has elapsed, or `cancel` is
/// triggered. Cancellation is observed before every poll and while sleeping between polls.
pub async fn wait_until<F, Fut>(
    mut predicate: F,
    step: Duration,
    total: Duration,
    cancel: &CancellationToken,
) -> WaitOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + total;
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        attempt += 1;
        if predicate().await {
            trace!("wait satisfied after {} attempt(s)", attempt);
            return WaitOutcome::Satisfied;
        }
        let now = Instant::now();
        if now >= deadline {
            trace!("wait timed out after {} attempt(s)", attempt);
            return WaitOutcome::TimedOut;
        }
        let sleep = step.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => return WaitOutcome::Cancelled,
            _ = tokio::time::sleep(sleep) => {}
        }
    }
}
