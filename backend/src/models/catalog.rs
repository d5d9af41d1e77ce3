//! Reference data the engine reads but never writes: routes, their
//! checkpoints, and the shifts that assign guards to routes. Roster
//! management owns these rows; the engine sees them through the repository.

use chrono::{DateTime, Utc};

crate::define_id_type!(i64, CheckpointId);
crate::define_id_type!(i64, RouteId);
crate::define_id_type!(i64, ShiftId);
crate::define_id_type!(i64, GuardId);

/// A physical tag mounted along a route.
///
/// `sequence_order == 1` is the anchor checkpoint: scanning it both opens a
/// new patrol cycle and closes the previous one.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub route_id: RouteId,
    /// Normalized tag identifier (uppercase hex, no whitespace).
    pub tag: String,
    pub name: String,
    /// 1-based position along the route.
    pub sequence_order: u32,
    /// Planned transit time from the previous checkpoint, in seconds.
    pub expected_transit_secs: i64,
    /// Allowed deviation before a visit counts as late, in seconds.
    pub tolerance_secs: i64,
    pub active: bool,
}

impl Checkpoint {
    pub fn is_anchor(&self) -> bool {
        self.sequence_order == 1
    }
}

/// An ordered checkpoint circuit patrolled on a fixed cadence.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    /// Scheduled cadence of rounds; one window per `frequency_minutes`.
    pub frequency_minutes: i64,
    pub active: bool,
}

/// A guard's scheduled assignment to a route.
///
/// Shifts of the same guard never overlap (enforced where shifts are
/// created); shifts of different guards on the same route may.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub guard_id: GuardId,
    pub route_id: RouteId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Shift {
    /// Inclusive containment: shifts cover `[start_time, end_time]`.
    pub fn covers(&self, t: DateTime<Utc>) -> bool {
        self.start_time <= t && t <= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_shift_covers_is_inclusive() {
        let shift = Shift {
            id: ShiftId::new(1),
            guard_id: GuardId::new(1),
            route_id: RouteId::new(1),
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(),
        };
        assert!(shift.covers(shift.start_time));
        assert!(shift.covers(shift.end_time));
        assert!(!shift.covers(shift.end_time + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_anchor_is_sequence_one() {
        let mut cp = Checkpoint {
            id: CheckpointId::new(1),
            route_id: RouteId::new(1),
            tag: "A1B2C3D4".to_string(),
            name: "Main gate".to_string(),
            sequence_order: 1,
            expected_transit_secs: 0,
            tolerance_secs: 600,
            active: true,
        };
        assert!(cp.is_anchor());
        cp.sequence_order = 2;
        assert!(!cp.is_anchor());
    }
}
