use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

use crate::error::RpcError;

/// Outcome carried by a resolved completion signal.
pub type Completion = Result<(), RpcError>;

/// Write-once completion latch shared between a client and its waiters.
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    inner: Arc<SignalInner>,
}

#[derive(Debug, Default)]
struct SignalInner {
    cell: OnceLock<Completion>,
    notify: Notify,
}

impl CompletionSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `outcome` and wakes every waiter. Returns `false` and keeps the
    /// first value when the signal was already resolved.
    #[must_use]
    pub fn resolve(&self, outcome: Completion) -> bool {
        let stored = self.inner.cell.set(outcome).is_ok();
        if stored {
            self.inner.notify.notify_waiters();
        }
        stored
    }

    #[must_use]
    pub fn peek(&self) -> Option<Completion> {
        self.inner.cell.get().cloned()
    }

    pub async fn wait(&self) -> Completion {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(outcome) = self.inner.cell.get() {
                return outcome.clone();
            }
            notified.await;
        }
    }
}
