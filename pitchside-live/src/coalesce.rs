//! Shared mutation coalescer for view-tree change bursts.
//!
//! One broad observation stream beats many narrow ones: independent
//! per-widget observers retrigger each other through their own writes
//! and cascade into runaway dispatch. The hub is the single chokepoint
//! the host view layer reports insertions/removals through; registered
//! interests get filtered, debounced batches instead.
//!
//! ```text
//! view layer ── observe(added, removed)
//!                     │  (buffered, single-slot debounce ≈ 1 frame)
//!                     ▼
//!               MutationHub ── handler A (priority 10, filter)
//!                          ├── handler B (priority 50)
//!                          └── handler C (priority 100)
//! ```
//!
//! While handlers run, newly reported mutations are ignored — not
//! queued — so a handler can never retrigger dispatch through its own
//! writes. `skip_during` suppresses observation entirely for callers
//! that must mutate the tree unobserved.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::pending::PendingTimer;

/// One frame at 60fps. Bursts quieter than this flush as one batch.
pub const DEBOUNCE: Duration = Duration::from_millis(16);

/// A view-tree node as reported by the host layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: u64,
    pub tag: String,
    pub classes: Vec<String>,
}

impl NodeRecord {
    pub fn new(id: u64, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into(),
            classes: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Node predicate deciding which records a handler sees.
pub type NodeFilter = Arc<dyn Fn(&NodeRecord) -> bool + Send + Sync>;

/// Batch callback. An `Err` is logged and never aborts dispatch to
/// the remaining handlers.
pub type BatchHandler = Arc<dyn Fn(&[NodeRecord]) -> Result<(), String> + Send + Sync>;

/// A registered interest in mutation batches.
pub struct Interest {
    pub on_added: Option<BatchHandler>,
    pub on_removed: Option<BatchHandler>,
    pub filter: Option<NodeFilter>,
    /// Lower runs first; ties dispatch in registration order.
    pub priority: i32,
}

impl Interest {
    pub fn new(priority: i32) -> Self {
        Self {
            on_added: None,
            on_removed: None,
            filter: None,
            priority,
        }
    }

    pub fn on_added<F>(mut self, f: F) -> Self
    where
        F: Fn(&[NodeRecord]) -> Result<(), String> + Send + Sync + 'static,
    {
        self.on_added = Some(Arc::new(f));
        self
    }

    pub fn on_removed<F>(mut self, f: F) -> Self
    where
        F: Fn(&[NodeRecord]) -> Result<(), String> + Send + Sync + 'static,
    {
        self.on_removed = Some(Arc::new(f));
        self
    }

    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&NodeRecord) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(f));
        self
    }
}

struct Registration {
    seq: u64,
    priority: i32,
    on_added: Option<BatchHandler>,
    on_removed: Option<BatchHandler>,
    filter: Option<NodeFilter>,
}

struct HubInner {
    registrations: HashMap<String, Registration>,
    next_seq: u64,
    added: Vec<NodeRecord>,
    removed: Vec<NodeRecord>,
    dispatching: bool,
    suppressed: bool,
}

struct HubShared {
    inner: Mutex<HubInner>,
    slot: Mutex<PendingTimer>,
    debounce: Duration,
}

/// The process-wide mutation coalescer. Cheap to clone; all clones
/// share one observation stream and one handler table.
#[derive(Clone)]
pub struct MutationHub {
    shared: Arc<HubShared>,
}

impl MutationHub {
    pub fn new() -> Self {
        Self::with_debounce(DEBOUNCE)
    }

    /// Create with a custom debounce window (for testing).
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            shared: Arc::new(HubShared {
                inner: Mutex::new(HubInner {
                    registrations: HashMap::new(),
                    next_seq: 0,
                    added: Vec::new(),
                    removed: Vec::new(),
                    dispatching: false,
                    suppressed: false,
                }),
                slot: Mutex::new(PendingTimer::new()),
                debounce,
            }),
        }
    }

    /// Register an interest. Re-registering an id replaces it.
    pub fn register(&self, handler_id: impl Into<String>, interest: Interest) {
        let mut inner = self.shared.inner.lock().unwrap();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.registrations.insert(
            handler_id.into(),
            Registration {
                seq,
                priority: interest.priority,
                on_added: interest.on_added,
                on_removed: interest.on_removed,
                filter: interest.filter,
            },
        );
    }

    /// Remove an interest. Returns true if it existed.
    pub fn unregister(&self, handler_id: &str) -> bool {
        self.shared
            .inner
            .lock()
            .unwrap()
            .registrations
            .remove(handler_id)
            .is_some()
    }

    /// Full teardown: all handlers and buffered records dropped.
    pub fn disconnect(&self) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            inner.registrations.clear();
            inner.added.clear();
            inner.removed.clear();
        }
        self.shared.slot.lock().unwrap().cancel();
    }

    /// Report a burst of insertions/removals from the view layer.
    ///
    /// Records are buffered and flushed once the burst goes quiet for
    /// the debounce window. Records reported while handlers are running
    /// are dropped, not queued.
    pub fn observe(&self, added: Vec<NodeRecord>, removed: Vec<NodeRecord>) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.suppressed {
                return;
            }
            if inner.dispatching {
                log::debug!(
                    "coalesce: ignoring {} mutations reported during dispatch",
                    added.len() + removed.len()
                );
                return;
            }
            inner.added.extend(added);
            inner.removed.extend(removed);
        }

        let shared = self.shared.clone();
        self.shared
            .slot
            .lock()
            .unwrap()
            .schedule(self.shared.debounce, move || flush(&shared));
    }

    /// Force a synchronous flush of anything buffered.
    pub fn flush_now(&self) {
        self.shared.slot.lock().unwrap().cancel();
        flush(&self.shared);
    }

    /// Run `f` with observation suppressed: mutations reported inside
    /// are not recorded at all.
    pub fn skip_during<R>(&self, f: impl FnOnce() -> R) -> R {
        self.shared.inner.lock().unwrap().suppressed = true;
        let result = f();
        self.shared.inner.lock().unwrap().suppressed = false;
        result
    }

    /// Number of registered interests.
    pub fn handler_count(&self) -> usize {
        self.shared.inner.lock().unwrap().registrations.len()
    }

    /// Buffered records not yet dispatched.
    pub fn pending_records(&self) -> usize {
        let inner = self.shared.inner.lock().unwrap();
        inner.added.len() + inner.removed.len()
    }
}

impl Default for MutationHub {
    fn default() -> Self {
        Self::new()
    }
}

struct DispatchEntry {
    id: String,
    on_added: Option<BatchHandler>,
    on_removed: Option<BatchHandler>,
    filter: Option<NodeFilter>,
}

fn flush(shared: &Arc<HubShared>) {
    // Snapshot handlers and take the buffers under the lock, then run
    // handlers with the lock released so they may re-enter the hub.
    let (added, removed, entries) = {
        let mut inner = shared.inner.lock().unwrap();
        if inner.dispatching {
            return;
        }
        let added = std::mem::take(&mut inner.added);
        let removed = std::mem::take(&mut inner.removed);
        if added.is_empty() && removed.is_empty() {
            return;
        }

        let mut ordered: Vec<(&String, &Registration)> = inner.registrations.iter().collect();
        ordered.sort_by_key(|(_, r)| (r.priority, r.seq));
        let entries: Vec<DispatchEntry> = ordered
            .into_iter()
            .map(|(id, r)| DispatchEntry {
                id: id.clone(),
                on_added: r.on_added.clone(),
                on_removed: r.on_removed.clone(),
                filter: r.filter.clone(),
            })
            .collect();

        inner.dispatching = true;
        (added, removed, entries)
    };

    for entry in &entries {
        let select = |records: &[NodeRecord]| -> Vec<NodeRecord> {
            match &entry.filter {
                Some(filter) => records.iter().filter(|n| filter(n)).cloned().collect(),
                None => records.to_vec(),
            }
        };

        if let Some(on_added) = &entry.on_added {
            let subset = select(&added);
            if !subset.is_empty() {
                if let Err(e) = on_added(&subset) {
                    log::error!("coalesce: handler '{}' failed on added nodes: {e}", entry.id);
                }
            }
        }
        if let Some(on_removed) = &entry.on_removed {
            let subset = select(&removed);
            if !subset.is_empty() {
                if let Err(e) = on_removed(&subset) {
                    log::error!("coalesce: handler '{}' failed on removed nodes: {e}", entry.id);
                }
            }
        }
    }

    shared.inner.lock().unwrap().dispatching = false;
}

// ===================================================================
// Tests
// ===================================================================
