//! Local replica of the server-authoritative match timer.
//!
//! The replica free-runs at +1/sec while the server says the clock is
//! running, and is snapped to the server's value on every timer push.
//! Overwrite, never merge: the push already carries the true elapsed
//! value, so there is no interpolation and no catch-up animation.
//!
//! Reference: Kleppmann, Chapter 5 — Replication

use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Pure timer state. The authoritative value lives server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerReplica {
    elapsed_seconds: u64,
    running: bool,
    period: Option<String>,
}

impl TimerReplica {
    pub fn new() -> Self {
        Self {
            elapsed_seconds: 0,
            running: false,
            period: None,
        }
    }

    /// Advance one local second. No-op while paused.
    ///
    /// Returns true if the counter advanced.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed_seconds += 1;
        true
    }

    /// Snap to an authoritative server value. Last server value wins,
    /// regardless of what the local counter drifted to.
    pub fn resync(&mut self, elapsed_seconds: u64, running: bool, period: Option<String>) {
        self.elapsed_seconds = elapsed_seconds;
        self.running = running;
        if period.is_some() {
            self.period = period;
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }

    /// mm:ss rendering of the elapsed time.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.elapsed_seconds / 60, self.elapsed_seconds % 60)
    }
}

impl Default for TimerReplica {
    fn default() -> Self {
        Self::new()
    }
}

/// The 1 Hz drive behind a [`TimerReplica`].
///
/// `start` is idempotent: a new start aborts any prior interval before
/// spawning, so two calls can never stack into double-speed ticking.
pub struct ReplicaClock {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReplicaClock {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Start ticking `f` once per second. Cancels any prior interval.
    pub fn start<F>(&self, f: F)
    where
        F: Fn() + Send + 'static,
    {
        let mut slot = self.handle.lock().unwrap();
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        *slot = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                f();
            }
        }));
    }

    /// Stop ticking. Safe to call when already stopped.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Whether an interval task is currently live.
    pub fn is_ticking(&self) -> bool {
        self.handle
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Default for ReplicaClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReplicaClock {
    fn drop(&mut self) {
        self.stop();
    }
}
