//! Single-slot deferred callback: cancel-then-schedule.
//!
//! Debounce and grace-window logic throughout the crate share one rule:
//! at most one pending callback per logical timer, and scheduling a new
//! one cancels whatever was pending. [`PendingTimer`] makes that rule
//! structural instead of convention-enforced by ad hoc flags.

use std::time::Duration;
use tokio::task::JoinHandle;

/// A one-shot timer slot. Holds at most one pending callback.
///
/// Must be used from within a tokio runtime.
pub struct PendingTimer {
    handle: Option<JoinHandle<()>>,
}

impl PendingTimer {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Schedule `f` to run after `delay`, cancelling any pending callback.
    pub fn schedule<F>(&mut self, delay: Duration, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        }));
    }

    /// Cancel the pending callback, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a callback is currently scheduled and has not yet run.
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Default for PendingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PendingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
