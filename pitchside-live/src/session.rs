//! Collaborative session state machine for live match reporting.
//!
//! Several reporters edit the same match concurrently. The client
//! never resolves conflicts: every user action is serialized into an
//! intent, sent to the server, and the visible state changes only when
//! the corresponding authoritative push round-trips back. Pushes
//! replace local fields verbatim — the server's payload is the
//! complete next value, never a diff to merge.
//!
//! ```text
//! disconnected ──connect──► joining ──match_state──► active
//!       ▲                                              │
//!       └────────── transport disconnect ──────────────┤
//!                                                      │
//!                   report_submitted push ──► reporting_submitted
//!                   status: canceled      ──► canceled
//! ```
//!
//! Both right-hand states are terminal: mutation controls lock and
//! stay locked no matter what arrives afterwards.
//!
//! Reference: Kleppmann, Chapter 5 — Replication

use std::collections::HashMap;

use pitchside_proto::{
    EventDraft, EventKind, Intent, MatchEvent, MatchSnapshot, MatchStatus, Push,
};

use crate::notify::Severity;
use crate::roster::Roster;
use crate::timer::TimerReplica;

/// Client-side lifecycle of the shared reporting session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Joining,
    Active,
    ReportingSubmitted,
    Canceled,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::ReportingSubmitted | SessionPhase::Canceled)
    }
}

/// What the surrounding UI should do after a push was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The whole snapshot was replaced (initial state or rejoin).
    SnapshotReplaced,
    ScoreChanged { home: u32, away: u32 },
    TimerResync { elapsed_seconds: u64, running: bool },
    EventLogged(MatchEvent),
    RosterChanged,
    ShiftChanged { player_id: u64, is_active: bool },
    StatusChanged(MatchStatus),
    /// Terminal: disable all score/timer/event inputs permanently.
    ControlsLocked,
    Notify {
        severity: Severity,
        message: String,
        sticky: bool,
    },
}

/// A user-initiated action. Never applied optimistically.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    IncrementHomeScore,
    DecrementHomeScore,
    IncrementAwayScore,
    DecrementAwayScore,
    StartTimer,
    StopTimer,
    ResetTimer,
    AddEvent(EventDraft),
    TogglePlayerShift {
        player_id: u64,
        team_id: u64,
        is_active: bool,
    },
    SubmitReport,
}

impl UserAction {
    /// Destructive actions require an explicit confirmation step
    /// before any intent is emitted.
    pub fn is_destructive(&self) -> bool {
        matches!(self, UserAction::ResetTimer | UserAction::SubmitReport)
    }
}

/// Result of validating a user action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Valid: emit this intent and wait for the server's push.
    Emit(Intent),
    /// Destructive: held until `confirm()` is called.
    NeedsConfirmation(UserAction),
    /// Refused client-side; nothing was sent.
    Rejected(String),
}

/// Per-match client state, mutated by server push only (plus the
/// explicit phase bookkeeping around connect/disconnect).
pub struct SessionMachine {
    match_id: u64,
    user_id: u64,
    team_id: u64,
    phase: SessionPhase,
    snapshot: MatchSnapshot,
    timer: TimerReplica,
    roster: Roster,
    shifts: HashMap<u64, bool>,
    pending_confirmation: Option<UserAction>,
}

impl SessionMachine {
    pub fn new(match_id: u64, user_id: u64, team_id: u64) -> Self {
        Self {
            match_id,
            user_id,
            team_id,
            phase: SessionPhase::Disconnected,
            snapshot: MatchSnapshot::empty(match_id),
            timer: TimerReplica::new(),
            roster: Roster::new(),
            shifts: HashMap::new(),
            pending_confirmation: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn score(&self) -> (u32, u32) {
        (self.snapshot.home_score, self.snapshot.away_score)
    }

    pub fn status(&self) -> MatchStatus {
        self.snapshot.status
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.snapshot.events
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn shift_active(&self, player_id: u64) -> bool {
        self.shifts.get(&player_id).copied().unwrap_or(false)
    }

    /// Score/timer/event inputs are usable only while active.
    pub fn controls_enabled(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn pending_confirmation(&self) -> Option<&UserAction> {
        self.pending_confirmation.as_ref()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Transport (re)connected. Yields the join intent to emit, or
    /// None from a terminal phase.
    pub fn on_connected(&mut self) -> Option<Intent> {
        if self.phase.is_terminal() {
            return None;
        }
        self.phase = SessionPhase::Joining;
        Some(Intent::JoinMatch {
            match_id: self.match_id,
            user_id: self.user_id,
            team_id: self.team_id,
        })
    }

    /// Transport disconnect confirmed (grace window elapsed).
    pub fn on_disconnected(&mut self) -> Vec<Effect> {
        if self.phase.is_terminal() {
            return Vec::new();
        }
        self.phase = SessionPhase::Disconnected;
        vec![Effect::Notify {
            severity: Severity::Warning,
            message: "Connection lost - live updates paused".to_string(),
            sticky: false,
        }]
    }

    // ── Server pushes ────────────────────────────────────────────

    /// Apply an authoritative push. Fields are replaced verbatim;
    /// the returned effects drive the view, toasts and replica clock.
    pub fn apply(&mut self, push: &Push) -> Vec<Effect> {
        match push {
            Push::MatchState(snapshot) => self.apply_snapshot(snapshot),

            Push::ScoreUpdated {
                home_score,
                away_score,
                updated_by_name,
                ..
            } => {
                self.snapshot.home_score = *home_score;
                self.snapshot.away_score = *away_score;
                let suffix = match updated_by_name {
                    Some(name) => format!(" (by {name})"),
                    None => String::new(),
                };
                vec![
                    Effect::ScoreChanged {
                        home: *home_score,
                        away: *away_score,
                    },
                    Effect::Notify {
                        severity: Severity::Info,
                        message: format!("Score {home_score}-{away_score}{suffix}"),
                        sticky: false,
                    },
                ]
            }

            Push::TimerUpdated {
                elapsed_seconds,
                is_running,
                period,
                ..
            } => {
                self.timer.resync(*elapsed_seconds, *is_running, period.clone());
                self.snapshot.elapsed_seconds = *elapsed_seconds;
                self.snapshot.timer_running = *is_running;
                if period.is_some() {
                    self.snapshot.period = period.clone();
                }
                vec![Effect::TimerResync {
                    elapsed_seconds: *elapsed_seconds,
                    running: *is_running,
                }]
            }

            Push::EventAdded { event, .. } => {
                self.snapshot.events.push(event.clone());
                vec![
                    Effect::EventLogged(event.clone()),
                    Effect::Notify {
                        severity: Severity::Info,
                        message: describe_event(event),
                        sticky: false,
                    },
                ]
            }

            Push::ReporterJoined(reporter) => {
                let message = format!("{} joined the reporting session", reporter.username);
                self.roster.join(reporter.clone());
                vec![
                    Effect::RosterChanged,
                    Effect::Notify {
                        severity: Severity::Info,
                        message,
                        sticky: false,
                    },
                ]
            }

            Push::ReporterLeft { user_id } => match self.roster.leave(*user_id) {
                Some(reporter) => vec![
                    Effect::RosterChanged,
                    Effect::Notify {
                        severity: Severity::Info,
                        message: format!("{} left the reporting session", reporter.username),
                        sticky: false,
                    },
                ],
                None => Vec::new(),
            },

            Push::ActiveReporters { reporters } => {
                self.roster.replace_all(reporters.clone());
                vec![Effect::RosterChanged]
            }

            Push::PlayerShiftUpdated {
                player_id,
                is_active,
                ..
            } => {
                self.shifts.insert(*player_id, *is_active);
                vec![Effect::ShiftChanged {
                    player_id: *player_id,
                    is_active: *is_active,
                }]
            }

            Push::ReportSubmitted { submitted_by_name, .. } => {
                self.phase = SessionPhase::ReportingSubmitted;
                self.pending_confirmation = None;
                let message = match submitted_by_name {
                    Some(name) => format!("Final report submitted by {name}"),
                    None => "Final report submitted".to_string(),
                };
                vec![
                    Effect::ControlsLocked,
                    Effect::Notify {
                        severity: Severity::Success,
                        message,
                        sticky: true,
                    },
                ]
            }

            Push::Error { message } => {
                // Server refused an intent. Nothing was applied
                // optimistically, so there is nothing to roll back.
                log::warn!("session {}: server rejected intent: {message}", self.match_id);
                vec![Effect::Notify {
                    severity: Severity::Danger,
                    message: message.clone(),
                    sticky: false,
                }]
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: &MatchSnapshot) -> Vec<Effect> {
        let status_changed = snapshot.status != self.snapshot.status;
        let was_joining = self.phase == SessionPhase::Joining;

        // Replace, never merge, whatever was cached before.
        self.snapshot = snapshot.clone();
        self.timer.resync(
            snapshot.elapsed_seconds,
            snapshot.timer_running,
            snapshot.period.clone(),
        );

        let mut effects = vec![
            Effect::SnapshotReplaced,
            Effect::TimerResync {
                elapsed_seconds: snapshot.elapsed_seconds,
                running: snapshot.timer_running,
            },
        ];
        if status_changed {
            effects.push(Effect::StatusChanged(snapshot.status));
        }

        if snapshot.report_submitted {
            self.phase = SessionPhase::ReportingSubmitted;
            effects.push(Effect::ControlsLocked);
        } else if snapshot.status == MatchStatus::Canceled {
            self.phase = SessionPhase::Canceled;
            effects.push(Effect::ControlsLocked);
            effects.push(Effect::Notify {
                severity: Severity::Warning,
                message: "Match canceled".to_string(),
                sticky: true,
            });
        } else if !self.phase.is_terminal() {
            self.phase = SessionPhase::Active;
            if was_joining {
                effects.push(Effect::Notify {
                    severity: Severity::Success,
                    message: "Joined live reporting".to_string(),
                    sticky: false,
                });
            }
        }
        effects
    }

    // ── User actions ─────────────────────────────────────────────

    /// Validate a user action and build the intent to emit.
    ///
    /// Nothing here mutates visible state: the intent round-trips
    /// through the server and comes back as a push.
    pub fn request(&mut self, action: UserAction) -> ActionOutcome {
        if !self.controls_enabled() {
            return ActionOutcome::Rejected(match self.phase {
                SessionPhase::ReportingSubmitted => "Report already submitted".to_string(),
                SessionPhase::Canceled => "Match was canceled".to_string(),
                _ => "Not connected to the reporting session".to_string(),
            });
        }

        let (home, away) = self.score();
        match action {
            UserAction::IncrementHomeScore => ActionOutcome::Emit(Intent::UpdateScore {
                match_id: self.match_id,
                home_score: home + 1,
                away_score: away,
            }),
            UserAction::DecrementHomeScore => {
                if home == 0 {
                    ActionOutcome::Rejected("Score cannot go below zero".to_string())
                } else {
                    ActionOutcome::Emit(Intent::UpdateScore {
                        match_id: self.match_id,
                        home_score: home - 1,
                        away_score: away,
                    })
                }
            }
            UserAction::IncrementAwayScore => ActionOutcome::Emit(Intent::UpdateScore {
                match_id: self.match_id,
                home_score: home,
                away_score: away + 1,
            }),
            UserAction::DecrementAwayScore => {
                if away == 0 {
                    ActionOutcome::Rejected("Score cannot go below zero".to_string())
                } else {
                    ActionOutcome::Emit(Intent::UpdateScore {
                        match_id: self.match_id,
                        home_score: home,
                        away_score: away - 1,
                    })
                }
            }
            UserAction::StartTimer => ActionOutcome::Emit(Intent::UpdateTimer {
                match_id: self.match_id,
                elapsed_seconds: self.timer.elapsed_seconds(),
                is_running: true,
                period: self.snapshot.period.clone(),
            }),
            UserAction::StopTimer => ActionOutcome::Emit(Intent::UpdateTimer {
                match_id: self.match_id,
                elapsed_seconds: self.timer.elapsed_seconds(),
                is_running: false,
                period: self.snapshot.period.clone(),
            }),
            UserAction::AddEvent(draft) => {
                if !self.team_plays_here(draft.team_id) {
                    return ActionOutcome::Rejected(
                        "Selected team is not playing in this match".to_string(),
                    );
                }
                ActionOutcome::Emit(Intent::AddEvent {
                    match_id: self.match_id,
                    event: draft,
                })
            }
            UserAction::TogglePlayerShift {
                player_id,
                team_id,
                is_active,
            } => {
                if team_id != self.team_id {
                    return ActionOutcome::Rejected(
                        "You can only update shifts for your own team".to_string(),
                    );
                }
                ActionOutcome::Emit(Intent::UpdatePlayerShift {
                    match_id: self.match_id,
                    player_id,
                    is_active,
                    team_id,
                })
            }
            action @ (UserAction::ResetTimer | UserAction::SubmitReport) => {
                self.pending_confirmation = Some(action.clone());
                ActionOutcome::NeedsConfirmation(action)
            }
        }
    }

    /// Confirm the held destructive action, yielding its intent.
    pub fn confirm(&mut self) -> Option<Intent> {
        let action = self.pending_confirmation.take()?;
        if !self.controls_enabled() {
            return None;
        }
        match action {
            UserAction::ResetTimer => Some(Intent::UpdateTimer {
                match_id: self.match_id,
                elapsed_seconds: 0,
                is_running: false,
                period: self.snapshot.period.clone(),
            }),
            UserAction::SubmitReport => Some(Intent::SubmitReport {
                match_id: self.match_id,
                notes: None,
            }),
            _ => None,
        }
    }

    /// Drop the held destructive action without emitting.
    pub fn cancel_confirmation(&mut self) {
        self.pending_confirmation = None;
    }

    /// Advance the local timer replica one second (clock drive).
    pub fn tick(&mut self) -> bool {
        self.timer.tick()
    }

    fn team_plays_here(&self, team_id: u64) -> bool {
        // Unknown sides (snapshot not yet seen) pass through; the
        // server revalidates anyway.
        match (self.snapshot.home_team_id, self.snapshot.away_team_id) {
            (Some(home), Some(away)) => team_id == home || team_id == away,
            _ => true,
        }
    }
}

fn describe_event(event: &MatchEvent) -> String {
    let kind = match event.event_type {
        EventKind::Goal => "Goal",
        EventKind::OwnGoal => "Own goal",
        EventKind::YellowCard => "Yellow card",
        EventKind::RedCard => "Red card",
        EventKind::Substitution => "Substitution",
    };
    let mut message = String::from(kind);
    if let Some(player) = &event.player_name {
        message.push_str(&format!(": {player}"));
    }
    if let Some(team) = &event.team_name {
        message.push_str(&format!(" ({team})"));
    }
    if let Some(minute) = event.minute {
        message.push_str(&format!(" {minute}'"));
    }
    message
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pitchside_proto::Reporter;

    fn machine() -> SessionMachine {
        SessionMachine::new(42, 7, 3)
    }

    fn in_progress_snapshot() -> MatchSnapshot {
        MatchSnapshot {
            status: MatchStatus::InProgress,
            home_team_id: Some(3),
            away_team_id: Some(4),
            ..MatchSnapshot::empty(42)
        }
    }

    fn active_machine() -> SessionMachine {
        let mut m = machine();
        m.on_connected();
        m.apply(&Push::MatchState(in_progress_snapshot()));
        m
    }

    fn notifications(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Notify { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    // ── Join flow ────────────────────────────────────────────────

    #[test]
    fn test_join_flow_reaches_active_with_initial_state() {
        let mut m = machine();
        assert_eq!(m.phase(), SessionPhase::Disconnected);

        let intent = m.on_connected().unwrap();
        assert_eq!(
            intent,
            Intent::JoinMatch { match_id: 42, user_id: 7, team_id: 3 }
        );
        assert_eq!(m.phase(), SessionPhase::Joining);

        let effects = m.apply(&Push::MatchState(in_progress_snapshot()));
        assert_eq!(m.phase(), SessionPhase::Active);
        assert_eq!(m.score(), (0, 0));
        assert_eq!(m.status(), MatchStatus::InProgress);
        assert!(effects.contains(&Effect::SnapshotReplaced));
        assert!(m.controls_enabled());
    }

    #[test]
    fn test_snapshot_replaces_stale_cache() {
        let mut m = active_machine();
        m.apply(&Push::ScoreUpdated {
            home_score: 3,
            away_score: 2,
            updated_by: None,
            updated_by_name: None,
        });

        // Rejoin delivers a fresh snapshot; the stale 3-2 must not
        // survive a merge because there is no merge.
        m.on_connected();
        let mut fresh = in_progress_snapshot();
        fresh.home_score = 1;
        fresh.away_score = 0;
        m.apply(&Push::MatchState(fresh));
        assert_eq!(m.score(), (1, 0));
    }

    #[test]
    fn test_reconnect_is_reentrant_from_active() {
        let mut m = active_machine();
        let effects = m.on_disconnected();
        assert_eq!(m.phase(), SessionPhase::Disconnected);
        assert!(!notifications(&effects).is_empty());

        assert!(m.on_connected().is_some());
        m.apply(&Push::MatchState(in_progress_snapshot()));
        assert_eq!(m.phase(), SessionPhase::Active);
    }

    // ── No optimistic mutation ───────────────────────────────────

    #[test]
    fn test_score_action_is_not_applied_locally() {
        let mut m = active_machine();

        let outcome = m.request(UserAction::IncrementHomeScore);
        assert_eq!(
            outcome,
            ActionOutcome::Emit(Intent::UpdateScore {
                match_id: 42,
                home_score: 1,
                away_score: 0
            })
        );
        // Displayed score unchanged until the push arrives.
        assert_eq!(m.score(), (0, 0));

        m.apply(&Push::ScoreUpdated {
            home_score: 1,
            away_score: 0,
            updated_by: Some(7),
            updated_by_name: Some("Alice".into()),
        });
        assert_eq!(m.score(), (1, 0));
    }

    #[test]
    fn test_decrement_refused_at_zero() {
        let mut m = active_machine();
        let outcome = m.request(UserAction::DecrementHomeScore);
        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
        assert_eq!(m.score(), (0, 0));

        let outcome = m.request(UserAction::DecrementAwayScore);
        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
    }

    #[test]
    fn test_decrement_allowed_above_zero() {
        let mut m = active_machine();
        m.apply(&Push::ScoreUpdated {
            home_score: 2,
            away_score: 0,
            updated_by: None,
            updated_by_name: None,
        });
        let outcome = m.request(UserAction::DecrementHomeScore);
        assert_eq!(
            outcome,
            ActionOutcome::Emit(Intent::UpdateScore {
                match_id: 42,
                home_score: 1,
                away_score: 0
            })
        );
    }

    // ── Destructive actions ──────────────────────────────────────

    #[test]
    fn test_submit_report_requires_confirmation() {
        let mut m = active_machine();
        let outcome = m.request(UserAction::SubmitReport);
        assert_eq!(outcome, ActionOutcome::NeedsConfirmation(UserAction::SubmitReport));
        assert!(m.pending_confirmation().is_some());

        let intent = m.confirm().unwrap();
        assert_eq!(intent, Intent::SubmitReport { match_id: 42, notes: None });
        assert!(m.pending_confirmation().is_none());
        // Confirm without a pending action yields nothing.
        assert!(m.confirm().is_none());
    }

    #[test]
    fn test_reset_timer_confirmation_builds_zero_intent() {
        let mut m = active_machine();
        m.apply(&Push::TimerUpdated {
            elapsed_seconds: 1800,
            is_running: true,
            period: Some("second_half".into()),
            updated_by: None,
            updated_by_name: None,
        });

        m.request(UserAction::ResetTimer);
        let intent = m.confirm().unwrap();
        assert_eq!(
            intent,
            Intent::UpdateTimer {
                match_id: 42,
                elapsed_seconds: 0,
                is_running: false,
                period: Some("second_half".into()),
            }
        );
        // Local replica untouched until the server echoes the reset.
        assert_eq!(m.elapsed_seconds(), 1800);
    }

    #[test]
    fn test_cancel_confirmation_drops_pending() {
        let mut m = active_machine();
        m.request(UserAction::SubmitReport);
        m.cancel_confirmation();
        assert!(m.confirm().is_none());
    }

    // ── Terminal states ──────────────────────────────────────────

    #[test]
    fn test_report_submitted_is_terminal() {
        let mut m = active_machine();
        let effects = m.apply(&Push::ReportSubmitted {
            match_id: 42,
            submitted_by: Some(9),
            submitted_by_name: Some("Bob".into()),
        });

        assert_eq!(m.phase(), SessionPhase::ReportingSubmitted);
        assert!(!m.controls_enabled());
        assert!(effects.contains(&Effect::ControlsLocked));
        // The confirmation is persistent.
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Notify { sticky: true, severity: Severity::Success, .. }
        )));

        // A later push still updates the replica value, but controls
        // stay locked and actions stay refused.
        m.apply(&Push::ScoreUpdated {
            home_score: 5,
            away_score: 0,
            updated_by: None,
            updated_by_name: None,
        });
        assert_eq!(m.score(), (5, 0));
        assert!(!m.controls_enabled());
        assert!(matches!(
            m.request(UserAction::IncrementHomeScore),
            ActionOutcome::Rejected(_)
        ));
        // Reconnects no longer rejoin.
        assert!(m.on_connected().is_none());
    }

    #[test]
    fn test_canceled_status_is_terminal() {
        let mut m = active_machine();
        let mut snapshot = in_progress_snapshot();
        snapshot.status = MatchStatus::Canceled;
        let effects = m.apply(&Push::MatchState(snapshot));

        assert_eq!(m.phase(), SessionPhase::Canceled);
        assert!(effects.contains(&Effect::ControlsLocked));
        assert!(matches!(
            m.request(UserAction::StartTimer),
            ActionOutcome::Rejected(_)
        ));
    }

    #[test]
    fn test_actions_rejected_before_active() {
        let mut m = machine();
        assert!(matches!(
            m.request(UserAction::IncrementHomeScore),
            ActionOutcome::Rejected(_)
        ));
        m.on_connected();
        assert!(matches!(
            m.request(UserAction::IncrementHomeScore),
            ActionOutcome::Rejected(_)
        ));
    }

    // ── Pushes ───────────────────────────────────────────────────

    #[test]
    fn test_timer_push_resyncs_replica() {
        let mut m = active_machine();
        m.tick();
        let effects = m.apply(&Push::TimerUpdated {
            elapsed_seconds: 600,
            is_running: true,
            period: Some("first_half".into()),
            updated_by: None,
            updated_by_name: None,
        });

        assert_eq!(m.elapsed_seconds(), 600);
        assert!(m.timer_running());
        assert!(effects.contains(&Effect::TimerResync { elapsed_seconds: 600, running: true }));

        // Local ticks then another authoritative value: overwrite.
        m.tick();
        m.tick();
        m.apply(&Push::TimerUpdated {
            elapsed_seconds: 550,
            is_running: false,
            period: None,
            updated_by: None,
            updated_by_name: None,
        });
        assert_eq!(m.elapsed_seconds(), 550);
        assert!(!m.timer_running());
    }

    #[test]
    fn test_roster_pushes() {
        let mut m = active_machine();
        let effects = m.apply(&Push::ReporterJoined(Reporter {
            user_id: 9,
            username: "Bob".into(),
            team_id: Some(4),
            team_name: None,
        }));
        assert_eq!(m.roster().len(), 1);
        assert!(notifications(&effects)[0].contains("Bob"));

        m.apply(&Push::ActiveReporters {
            reporters: vec![
                Reporter { user_id: 7, username: "Alice".into(), team_id: Some(3), team_name: None },
                Reporter { user_id: 9, username: "Bob".into(), team_id: Some(4), team_name: None },
            ],
        });
        assert_eq!(m.roster().len(), 2);

        let effects = m.apply(&Push::ReporterLeft { user_id: 9 });
        assert_eq!(m.roster().len(), 1);
        assert!(notifications(&effects)[0].contains("Bob"));

        // Unknown reporter leaving is a no-op.
        assert!(m.apply(&Push::ReporterLeft { user_id: 999 }).is_empty());
    }

    #[test]
    fn test_event_push_appends_to_log() {
        let mut m = active_machine();
        let event = MatchEvent {
            id: Some(1),
            event_type: EventKind::Goal,
            team_id: 3,
            player_id: Some(11),
            minute: Some(27),
            period: None,
            timestamp: None,
            reported_by: Some(7),
            team_name: Some("Rovers".into()),
            player_name: Some("Sam".into()),
        };
        let effects = m.apply(&Push::EventAdded {
            event: event.clone(),
            reported_by: Some(7),
            reported_by_name: None,
        });

        assert_eq!(m.events().len(), 1);
        assert!(effects.contains(&Effect::EventLogged(event)));
        let messages = notifications(&effects);
        assert!(messages[0].contains("Goal"));
        assert!(messages[0].contains("Sam"));
        assert!(messages[0].contains("27'"));
    }

    #[test]
    fn test_server_error_leaves_state_unchanged() {
        let mut m = active_machine();
        let effects = m.apply(&Push::Error {
            message: "No live match found with ID 42".into(),
        });

        assert_eq!(m.score(), (0, 0));
        assert_eq!(m.phase(), SessionPhase::Active);
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Notify { severity: Severity::Danger, .. }
        )));
    }

    #[test]
    fn test_shift_toggle_restricted_to_own_team() {
        let mut m = active_machine();
        let outcome = m.request(UserAction::TogglePlayerShift {
            player_id: 11,
            team_id: 4, // opponents
            is_active: true,
        });
        assert!(matches!(outcome, ActionOutcome::Rejected(_)));

        let outcome = m.request(UserAction::TogglePlayerShift {
            player_id: 11,
            team_id: 3,
            is_active: true,
        });
        assert!(matches!(outcome, ActionOutcome::Emit(_)));

        // Applied only when the push comes back.
        assert!(!m.shift_active(11));
        m.apply(&Push::PlayerShiftUpdated {
            player_id: 11,
            is_active: true,
            team_id: 3,
            updated_by: None,
        });
        assert!(m.shift_active(11));
    }

    #[test]
    fn test_add_event_validates_team() {
        let mut m = active_machine();
        let outcome = m.request(UserAction::AddEvent(EventDraft {
            event_type: EventKind::Goal,
            team_id: 99,
            player_id: None,
            minute: None,
            period: None,
        }));
        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
    }
}
