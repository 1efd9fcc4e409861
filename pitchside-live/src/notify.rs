//! Ephemeral user-facing notifications driven by session transitions.
//!
//! The surface is append-only and auto-expiring: every transition that
//! warrants feedback produces exactly one notice, notices stack, and
//! nothing is deduplicated. Severity influences styling only.

use std::time::{Duration, Instant};
use uuid::Uuid;

/// Severity tag for a notice. Styling only, never behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

impl Severity {
    /// CSS class hint for the host page's toast markup.
    pub fn css_class(&self) -> &'static str {
        match self {
            Severity::Info => "toast-info",
            Severity::Success => "toast-success",
            Severity::Warning => "toast-warning",
            Severity::Danger => "toast-danger",
        }
    }
}

/// A single visible notice.
#[derive(Debug, Clone)]
pub struct Notice {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
    pub created_at: Instant,
    /// None = persistent (survives until cleared explicitly).
    pub ttl: Option<Duration>,
}

impl Notice {
    /// Whether this notice has outlived its ttl as of `now`.
    pub fn expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(self.created_at) >= ttl,
            None => false,
        }
    }
}

/// Default lifetime of an auto-expiring notice.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// The stack of currently visible notices.
pub struct NotificationSurface {
    notices: Vec<Notice>,
    default_ttl: Duration,
}

impl NotificationSurface {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create with a custom default ttl (for testing).
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            notices: Vec::new(),
            default_ttl,
        }
    }

    /// Append an auto-expiring notice. Returns its id.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> Uuid {
        self.push_inner(severity, message.into(), Some(self.default_ttl))
    }

    /// Append a persistent notice (e.g. the final-report confirmation).
    pub fn push_sticky(&mut self, severity: Severity, message: impl Into<String>) -> Uuid {
        self.push_inner(severity, message.into(), None)
    }

    fn push_inner(&mut self, severity: Severity, message: String, ttl: Option<Duration>) -> Uuid {
        let id = Uuid::new_v4();
        self.notices.push(Notice {
            id,
            severity,
            message,
            created_at: Instant::now(),
            ttl,
        });
        id
    }

    /// Drop every notice that has expired as of `now`.
    pub fn sweep(&mut self, now: Instant) {
        self.notices.retain(|n| !n.expired(now));
    }

    /// Notices still visible as of `now`, oldest first.
    pub fn active(&self, now: Instant) -> Vec<&Notice> {
        self.notices.iter().filter(|n| !n.expired(now)).collect()
    }

    /// Remove a specific notice (user dismissed it).
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }
}

impl Default for NotificationSurface {
    fn default() -> Self {
        Self::new()
    }
}
