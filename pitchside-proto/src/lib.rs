//! # pitchside-proto — wire protocol for collaborative match reporting.
//!
//! Every message on the wire is a JSON text frame with a named-event
//! envelope, matching the room-based pub/sub backend:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ { "event": "score_updated",                 │
//! │   "data":  { "home_score": 2, ... } }       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Server→client messages are [`Push`], client→server messages are
//! [`Intent`]. Both are tagged unions: decoding validates the shape at
//! the transport boundary, so session code downstream never handles
//! malformed or untyped payloads.
//!
//! The server is the single source of truth — a `Push` carries the
//! complete next value for the fields it names, never a diff to merge.
//!
//! Reference: Kleppmann, Chapter 5 — Replication

use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────────
// Domain value types
// ───────────────────────────────────────────────────────────────────

/// Authoritative match lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    NotStarted,
    InProgress,
    Completed,
    Canceled,
}

impl Default for MatchStatus {
    fn default() -> Self {
        MatchStatus::NotStarted
    }
}

/// Kind tag for a reported match event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Goal,
    OwnGoal,
    YellowCard,
    RedCard,
    Substitution,
}

/// A single entry in the append-only match event log.
///
/// `id` and `timestamp` are assigned server-side; a client never
/// invents them. Display names are carried when the server resolved
/// them, purely for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub event_type: EventKind,
    pub team_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
}

/// The client-composed part of a match event, sent inside an
/// `add_event` intent. Everything server-assigned is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub event_type: EventKind,
    pub team_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

/// One participant in the shared reporting room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reporter {
    pub user_id: u64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
}

/// Full authoritative match state, delivered on room join.
///
/// Replaces (never merges with) whatever the client cached before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_team_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_team_id: Option<u64>,
    #[serde(default)]
    pub home_score: u32,
    #[serde(default)]
    pub away_score: u32,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub elapsed_seconds: u64,
    #[serde(default)]
    pub timer_running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default)]
    pub events: Vec<MatchEvent>,
    #[serde(default)]
    pub report_submitted: bool,
}

impl MatchSnapshot {
    /// Empty snapshot for a match nothing is known about yet.
    pub fn empty(match_id: u64) -> Self {
        Self {
            match_id,
            home_team_id: None,
            away_team_id: None,
            home_score: 0,
            away_score: 0,
            status: MatchStatus::NotStarted,
            elapsed_seconds: 0,
            timer_running: false,
            period: None,
            events: Vec::new(),
            report_submitted: false,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Server → client pushes
// ───────────────────────────────────────────────────────────────────

/// A server-originated message carrying a new authoritative value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Push {
    /// Full state snapshot, sent once on room join.
    MatchState(MatchSnapshot),
    /// Complete replacement roster of active reporters.
    ActiveReporters { reporters: Vec<Reporter> },
    /// A reporter joined the room.
    ReporterJoined(Reporter),
    /// A reporter left the room.
    ReporterLeft { user_id: u64 },
    /// New authoritative score (both sides, always complete).
    ScoreUpdated {
        home_score: u32,
        away_score: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_by: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_by_name: Option<String>,
    },
    /// New authoritative timer value. The local replica snaps to this.
    TimerUpdated {
        elapsed_seconds: u64,
        is_running: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_by: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_by_name: Option<String>,
    },
    /// An event was appended to the match log.
    EventAdded {
        event: MatchEvent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reported_by: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reported_by_name: Option<String>,
    },
    /// A player's on-pitch shift flag changed.
    PlayerShiftUpdated {
        player_id: u64,
        is_active: bool,
        team_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_by: Option<u64>,
    },
    /// The final report was submitted — terminal for the session.
    ReportSubmitted {
        match_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        submitted_by: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        submitted_by_name: Option<String>,
    },
    /// The server refused an intent; local state is unchanged.
    Error { message: String },
}

impl Push {
    /// The envelope event tag, used for namespaced handler routing.
    pub fn event_name(&self) -> &'static str {
        match self {
            Push::MatchState(_) => "match_state",
            Push::ActiveReporters { .. } => "active_reporters",
            Push::ReporterJoined(_) => "reporter_joined",
            Push::ReporterLeft { .. } => "reporter_left",
            Push::ScoreUpdated { .. } => "score_updated",
            Push::TimerUpdated { .. } => "timer_updated",
            Push::EventAdded { .. } => "event_added",
            Push::PlayerShiftUpdated { .. } => "player_shift_updated",
            Push::ReportSubmitted { .. } => "report_submitted",
            Push::Error { .. } => "error",
        }
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse and validate a JSON text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

// ───────────────────────────────────────────────────────────────────
// Client → server intents
// ───────────────────────────────────────────────────────────────────

/// A client-originated request for a state change.
///
/// Intents are adjudicated server-side; the client applies nothing
/// locally until the corresponding push round-trips back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Intent {
    JoinMatch {
        match_id: u64,
        user_id: u64,
        team_id: u64,
    },
    LeaveMatch {
        match_id: u64,
    },
    /// Absolute scores, not increments — last write wins server-side.
    UpdateScore {
        match_id: u64,
        home_score: u32,
        away_score: u32,
    },
    UpdateTimer {
        match_id: u64,
        elapsed_seconds: u64,
        is_running: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<String>,
    },
    AddEvent {
        match_id: u64,
        event: EventDraft,
    },
    UpdatePlayerShift {
        match_id: u64,
        player_id: u64,
        is_active: bool,
        team_id: u64,
    },
    SubmitReport {
        match_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
}

impl Intent {
    /// The envelope event tag.
    pub fn event_name(&self) -> &'static str {
        match self {
            Intent::JoinMatch { .. } => "join_match",
            Intent::LeaveMatch { .. } => "leave_match",
            Intent::UpdateScore { .. } => "update_score",
            Intent::UpdateTimer { .. } => "update_timer",
            Intent::AddEvent { .. } => "add_event",
            Intent::UpdatePlayerShift { .. } => "update_player_shift",
            Intent::SubmitReport { .. } => "submit_report",
        }
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse and validate a JSON text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

// ───────────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────────

/// Protocol errors.
#[derive(Debug, Clone)]
pub enum ProtocolError {
    Encode(String),
    Decode(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "Encode error: {e}"),
            Self::Decode(e) => write!(f, "Decode error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

// ===================================================================
// Tests
// ===================================================================
