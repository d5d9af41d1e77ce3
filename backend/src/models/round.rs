use chrono::{DateTime, Utc};

use super::catalog::{CheckpointId, GuardId, RouteId, Shift, ShiftId};
use super::event::ScanEventId;
use super::window::Window;

crate::define_id_type!(i64, RoundId);
crate::define_id_type!(i64, WaypointId);

/// Whether a round can still receive waypoints.
///
/// Openness is explicit state, not inferred from a missing `end_time`:
/// NOT_PERFORMED rounds have no `end_time` yet were never open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    Open,
    Closed,
}

/// Fidelity classification of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    /// Every checkpoint visited on time, anchor to anchor.
    Complete,
    /// Missing checkpoints, late visits, or a cycle that never returned to
    /// the anchor.
    Incomplete,
    /// Cycle whose earliest visit was not the anchor.
    Invalid,
    /// Scheduled window with no activity at all (gap-filler rows).
    NotPerformed,
}

impl std::fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RoundStatus::Complete => "COMPLETE",
            RoundStatus::Incomplete => "INCOMPLETE",
            RoundStatus::Invalid => "INVALID",
            RoundStatus::NotPerformed => "NOT_PERFORMED",
        };
        write!(f, "{s}")
    }
}

/// Punctuality of a single checkpoint visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaypointStatus {
    OnTime,
    Late,
}

impl WaypointStatus {
    /// LATE iff the absolute deviation exceeds the checkpoint tolerance.
    pub fn from_delta(delta_seconds: i64, tolerance_secs: i64) -> Self {
        if delta_seconds.abs() > tolerance_secs {
            WaypointStatus::Late
        } else {
            WaypointStatus::OnTime
        }
    }
}

impl std::fmt::Display for WaypointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WaypointStatus::OnTime => "ON_TIME",
            WaypointStatus::Late => "LATE",
        };
        write!(f, "{s}")
    }
}

/// One patrol cycle bound to one scheduled window of one shift.
///
/// `start_time` is `None` only for NOT_PERFORMED rounds. INVALID rounds
/// opened by an out-of-sequence first event carry the degenerate window
/// `window_start == window_end == start_time`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Round {
    pub id: Option<RoundId>,
    pub route_id: RouteId,
    pub shift_id: ShiftId,
    pub guard_id: GuardId,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub phase: RoundPhase,
    pub status: RoundStatus,
    pub notes: Option<String>,
}

impl Round {
    /// A round opened by an anchor scan inside its scheduled window.
    pub fn windowed_open(shift: &Shift, window: Window, start_time: DateTime<Utc>) -> Self {
        Self {
            id: None,
            route_id: shift.route_id,
            shift_id: shift.id,
            guard_id: shift.guard_id,
            start_time: Some(start_time),
            end_time: None,
            window_start: window.start,
            window_end: window.end,
            phase: RoundPhase::Open,
            status: RoundStatus::Incomplete,
            notes: None,
        }
    }

    /// A round opened by a non-anchor scan with nothing open to attach to.
    pub fn invalid_open(shift: &Shift, at: DateTime<Utc>, notes: impl Into<String>) -> Self {
        Self {
            id: None,
            route_id: shift.route_id,
            shift_id: shift.id,
            guard_id: shift.guard_id,
            start_time: Some(at),
            end_time: None,
            window_start: at,
            window_end: at,
            phase: RoundPhase::Open,
            status: RoundStatus::Invalid,
            notes: Some(notes.into()),
        }
    }

    /// A gap-filler row for a window that saw no activity.
    pub fn not_performed(shift: &Shift, window: Window, notes: impl Into<String>) -> Self {
        Self {
            id: None,
            route_id: shift.route_id,
            shift_id: shift.id,
            guard_id: shift.guard_id,
            start_time: None,
            end_time: None,
            window_start: window.start,
            window_end: window.end,
            phase: RoundPhase::Closed,
            status: RoundStatus::NotPerformed,
            notes: Some(notes.into()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == RoundPhase::Open
    }

    pub fn window(&self) -> Window {
        Window::new(self.window_start, self.window_end)
    }
}

/// One checkpoint visit inside a round, unique on
/// `(round_id, checkpoint_id, timestamp)`.
///
/// Intermediate checkpoints appear at most once per round; the anchor
/// appears twice in a full cycle, as the opening row and the closing row.
/// `sequence_order` is denormalized from the checkpoint at record time so a
/// stored round can be classified without re-reading the catalog.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Waypoint {
    pub id: Option<WaypointId>,
    pub round_id: RoundId,
    pub checkpoint_id: CheckpointId,
    pub scan_event_id: Option<ScanEventId>,
    pub sequence_order: u32,
    pub timestamp: DateTime<Utc>,
    /// Signed deviation from schedule, in seconds. Negative means early.
    pub delta_seconds: i64,
    pub status: WaypointStatus,
}
