//! # pitchside-live — Real-time match reporting client
//!
//! Collaborative live reporting over one shared WebSocket: several
//! reporters sit in the same match room, every edit round-trips
//! through the server, and the last server value always wins.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    WebSocket     ┌─────────────┐
//! │ LiveReporter │ ◄──────────────► │ match server│
//! │ (per match)  │   JSON events    │ (authority) │
//! └──────┬───────┘                  └─────────────┘
//!        │ effects
//!        ▼
//! ┌──────────────┬───────────────┬──────────────┐
//! │SessionMachine│ TimerReplica  │ Notification │
//! │ (match state)│ (1 Hz drive)  │   Surface    │
//! └──────────────┴───────────────┴──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`transport`] — One shared socket, namespaced handlers, backoff
//! - [`session`] — Match state machine, server pushes in, intents out
//! - [`timer`] — Server-synced timer replica and its 1 Hz clock
//! - [`roster`] — Reporters active in the room
//! - [`notify`] — Stacking, auto-expiring notices
//! - [`coalesce`] — Debounced batching of host view mutations
//! - [`pending`] — Single-slot cancel-then-schedule delayed call
//! - [`reporting`] — The embeddable component wiring it all together

pub mod coalesce;
pub mod notify;
pub mod pending;
pub mod reporting;
pub mod roster;
pub mod session;
pub mod timer;
pub mod transport;

pub use coalesce::{Interest, MutationHub, NodeRecord};
pub use notify::{Notice, NotificationSurface, Severity, DEFAULT_TTL};
pub use pending::PendingTimer;
pub use reporting::{LiveReporter, ReporterConfig};
pub use roster::Roster;
pub use session::{ActionOutcome, Effect, SessionMachine, SessionPhase, UserAction};
pub use timer::{ReplicaClock, TimerReplica};
pub use transport::{ConnectionState, TransportConfig, TransportManager};
