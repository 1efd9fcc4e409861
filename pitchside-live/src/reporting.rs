//! Wiring between the shared transport and a match reporting session.
//!
//! [`LiveReporter`] is the component a page embeds: it registers the
//! session's push handlers under one component id, routes the state
//! machine's effects into the notification surface and the replica
//! clock, and forwards validated user actions as intents.
//!
//! ```text
//!             pushes                    effects
//! transport ─────────► SessionMachine ─────────► notifications
//!     ▲                     │    ▲                replica clock
//!     └──── intents ────────┘    └── 1 Hz ticks ──────┘
//! ```

use std::sync::{Arc, Mutex};

use pitchside_proto::{MatchEvent, MatchStatus};

use crate::notify::NotificationSurface;
use crate::session::{ActionOutcome, Effect, SessionMachine, SessionPhase, UserAction};
use crate::timer::ReplicaClock;
use crate::transport::TransportManager;

/// Push events the reporter subscribes to.
const PUSH_EVENTS: [&str; 10] = [
    "match_state",
    "active_reporters",
    "reporter_joined",
    "reporter_left",
    "score_updated",
    "timer_updated",
    "event_added",
    "player_shift_updated",
    "report_submitted",
    "error",
];

/// Identity of the reporter attaching to a match.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub match_id: u64,
    pub user_id: u64,
    pub team_id: u64,
}

/// One live reporting widget bound to one match room.
#[derive(Clone)]
pub struct LiveReporter {
    component_id: String,
    transport: TransportManager,
    machine: Arc<Mutex<SessionMachine>>,
    notices: Arc<Mutex<NotificationSurface>>,
    clock: Arc<ReplicaClock>,
}

impl LiveReporter {
    /// Attach to the shared transport: register lifecycle callbacks
    /// and one handler per push event, then trigger a connect.
    pub fn attach(transport: TransportManager, config: ReporterConfig) -> Self {
        let reporter = Self {
            component_id: format!("live-reporting-{}", config.match_id),
            transport,
            machine: Arc::new(Mutex::new(SessionMachine::new(
                config.match_id,
                config.user_id,
                config.team_id,
            ))),
            notices: Arc::new(Mutex::new(NotificationSurface::new())),
            clock: Arc::new(ReplicaClock::new()),
        };

        for event in PUSH_EVENTS {
            let r = reporter.clone();
            reporter
                .transport
                .on(&reporter.component_id, event, move |push| {
                    let effects = r.machine.lock().unwrap().apply(push);
                    r.route_effects(effects);
                });
        }

        let r = reporter.clone();
        reporter
            .transport
            .on_connect(&reporter.component_id, move || {
                let intent = r.machine.lock().unwrap().on_connected();
                if let Some(intent) = intent {
                    if !r.transport.emit(&intent) {
                        log::warn!("{}: join intent dropped, not connected", r.component_id);
                    }
                }
            });

        let r = reporter.clone();
        reporter
            .transport
            .on_disconnect(&reporter.component_id, move || {
                r.clock.stop();
                let effects = r.machine.lock().unwrap().on_disconnected();
                r.route_effects(effects);
            });

        reporter.transport.connect();
        reporter
    }

    /// Validate and emit a user action. Destructive actions come back
    /// as `NeedsConfirmation`; call [`confirm`] to proceed.
    ///
    /// [`confirm`]: LiveReporter::confirm
    pub fn request(&self, action: UserAction) -> ActionOutcome {
        let outcome = self.machine.lock().unwrap().request(action);
        match &outcome {
            ActionOutcome::Emit(intent) => {
                if !self.transport.emit(intent) {
                    log::warn!(
                        "{}: {} dropped, not connected",
                        self.component_id,
                        intent.event_name()
                    );
                }
            }
            ActionOutcome::Rejected(reason) => {
                self.notices
                    .lock()
                    .unwrap()
                    .push(crate::notify::Severity::Warning, reason.clone());
            }
            ActionOutcome::NeedsConfirmation(_) => {}
        }
        outcome
    }

    /// Confirm the pending destructive action and emit its intent.
    pub fn confirm(&self) -> bool {
        let intent = self.machine.lock().unwrap().confirm();
        match intent {
            Some(intent) => self.transport.emit(&intent),
            None => false,
        }
    }

    /// Drop the pending destructive action without emitting.
    pub fn cancel_confirmation(&self) {
        self.machine.lock().unwrap().cancel_confirmation();
    }

    /// Tear down: deregister all handlers and stop the clock. The
    /// shared transport itself stays up for other components.
    pub fn detach(&self) {
        self.clock.stop();
        self.transport.remove_listeners(&self.component_id);
    }

    fn route_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::TimerResync { running: true, .. } => {
                    let machine = self.machine.clone();
                    self.clock.start(move || {
                        machine.lock().unwrap().tick();
                    });
                }
                Effect::TimerResync { running: false, .. } | Effect::ControlsLocked => {
                    self.clock.stop();
                }
                Effect::Notify {
                    severity,
                    message,
                    sticky,
                } => {
                    let mut notices = self.notices.lock().unwrap();
                    if sticky {
                        notices.push_sticky(severity, message);
                    } else {
                        notices.push(severity, message);
                    }
                }
                // View-refresh effects carry no side channel here.
                Effect::SnapshotReplaced
                | Effect::ScoreChanged { .. }
                | Effect::EventLogged(_)
                | Effect::RosterChanged
                | Effect::ShiftChanged { .. }
                | Effect::StatusChanged(_) => {}
            }
        }
    }

    // ── Read side ────────────────────────────────────────────────

    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.lock().unwrap().phase()
    }

    pub fn score(&self) -> (u32, u32) {
        self.machine.lock().unwrap().score()
    }

    pub fn status(&self) -> MatchStatus {
        self.machine.lock().unwrap().status()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.machine.lock().unwrap().elapsed_seconds()
    }

    pub fn timer_display(&self) -> String {
        let machine = self.machine.lock().unwrap();
        format!(
            "{:02}:{:02}",
            machine.elapsed_seconds() / 60,
            machine.elapsed_seconds() % 60
        )
    }

    pub fn controls_enabled(&self) -> bool {
        self.machine.lock().unwrap().controls_enabled()
    }

    pub fn events(&self) -> Vec<MatchEvent> {
        self.machine.lock().unwrap().events().to_vec()
    }

    pub fn reporter_count(&self) -> usize {
        self.machine.lock().unwrap().roster().len()
    }

    pub fn clock_ticking(&self) -> bool {
        self.clock.is_ticking()
    }

    /// Currently visible notices, expired ones swept out.
    pub fn notices(&self) -> Vec<String> {
        let now = std::time::Instant::now();
        let mut surface = self.notices.lock().unwrap();
        surface.sweep(now);
        surface
            .active(now)
            .into_iter()
            .map(|n| n.message.clone())
            .collect()
    }
}
