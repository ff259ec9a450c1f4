use std::future::Future;
use std::time::Duration;

use tokio::task::AbortHandle;

/// A named action scheduled to run once after a delay.
///
/// Re-arming cancels whatever was pending before; dropping the handle
/// cancels too. Cancellation only stops an action that has not started:
/// once the delay elapses the action is detached and runs to completion.
/// Must be armed from within a tokio runtime.
#[derive(Debug, Default)]
pub struct Deferred {
    pending: Option<(String, AbortHandle)>,
}

impl Deferred {
    pub fn new() -> Self {
        Self { pending: None }
    }

    pub fn arm<F>(&mut self, key: impl Into<String>, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action);
        });
        self.pending = Some((key.into(), handle.abort_handle()));
    }

    /// Cancel the pending action. Returns true if it had not started yet.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some((key, handle)) => {
                let was_live = !handle.is_finished();
                handle.abort();
                if was_live {
                    tracing::trace!(key = %key, "deferred action cancelled");
                }
                was_live
            }
            None => false,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.pending.as_ref().map(|(key, _)| key.as_str())
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|(_, handle)| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        self.cancel();
    }
}
