//! In-flight publish tracking.
//!
//! [`InFlight`] is a counting barrier: every dispatch takes an
//! [`InFlightGuard`] before it is spawned, and the count drops when that guard
//! is dropped. Because the guard lives inside the spawned task, the decrement
//! runs on every exit path, including a panic in the broker client.
//!
//! The count is held in a `tokio::sync::watch` channel, so
//! [`InFlight::wait_idle`] wakes on every change and cannot miss the
//! transition to zero.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared counter of dispatched but unfinished publishes.
#[derive(Debug, Clone)]
pub struct InFlight {
    count: Arc<watch::Sender<usize>>,
}

impl InFlight {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            count: Arc::new(sender),
        }
    }

    /// Register one dispatch. The count is decremented when the returned
    /// guard is dropped.
    pub fn enter(&self) -> InFlightGuard {
        self.count.send_modify(|n| *n += 1);
        InFlightGuard {
            count: self.count.clone(),
        }
    }

    /// Current number of outstanding dispatches
    pub fn current(&self) -> usize {
        *self.count.borrow()
    }

    /// Wait until no dispatch is outstanding.
    ///
    /// Returns immediately if the count is already zero. There is no timeout.
    pub async fn wait_idle(&self) {
        let mut receiver = self.count.subscribe();
        // The sender is owned by `self`, so the channel cannot close here
        let _ = receiver.wait_for(|n| *n == 0).await;
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of one registered dispatch. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "dropping the guard immediately releases the in-flight slot"]
pub struct InFlightGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.send_modify(|n| {
            debug_assert!(*n > 0, "in-flight count underflow");
            *n = n.saturating_sub(1);
        });
    }
}
