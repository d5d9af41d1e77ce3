//! Active-window resolution.
//!
//! Maps a scan timestamp to the shift covering it and to the fixed-frequency
//! window the event falls into. Events with no covering shift are unmatched
//! and never reach the round state machine.

use chrono::{DateTime, Utc};
use log::debug;

use crate::db::repository::{RepositoryResult, ShiftRepository};
use crate::models::{window_covering, RouteId, Shift, Window};

/// Pick the shift that owns a timestamp when several cover it.
///
/// Roster data should not contain overlapping shifts for the same route, but
/// the resolver must still be deterministic when it does: the earliest
/// `start_time` wins, with the smaller ID breaking ties.
pub fn pick_covering_shift(mut shifts: Vec<Shift>) -> Option<Shift> {
    shifts.sort_by_key(|s| (s.start_time, s.id));
    shifts.into_iter().next()
}

/// Resolve the shift covering `at` on a route.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `route_id` - Route the scanned checkpoint belongs to
/// * `at` - Scan timestamp
///
/// # Returns
/// * `Ok(Some(Shift))` - The covering shift
/// * `Ok(None)` - No roster entry covers the timestamp (unmatched event)
/// * `Err` if the lookup fails
pub async fn resolve_shift<R: ShiftRepository + ?Sized>(
    repo: &R,
    route_id: RouteId,
    at: DateTime<Utc>,
) -> RepositoryResult<Option<Shift>> {
    let candidates = repo.find_shifts_covering(route_id, at).await?;
    if candidates.is_empty() {
        debug!("no shift covers route {} at {}", route_id, at);
        return Ok(None);
    }
    Ok(pick_covering_shift(candidates))
}

/// Compute the nominal window an event falls into on a shift.
///
/// Window 0 opens exactly at `shift.start_time`; every window is
/// `frequency_minutes` long. Timestamps before the shift start land in
/// negative window indices, which the driver never produces because shift
/// coverage is checked first.
pub fn resolve_window(shift: &Shift, frequency_minutes: i64, at: DateTime<Utc>) -> Window {
    window_covering(shift.start_time, frequency_minutes, at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GuardId, ShiftId};
    use chrono::TimeZone;

    fn shift(id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Shift {
        Shift {
            id: ShiftId::new(id),
            guard_id: GuardId::new(7),
            route_id: RouteId::new(1),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_pick_earliest_start_wins() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap();
        let later = shift(1, base + chrono::Duration::hours(1), base + chrono::Duration::hours(9));
        let earlier = shift(2, base, base + chrono::Duration::hours(8));

        let picked = pick_covering_shift(vec![later, earlier.clone()]).unwrap();
        assert_eq!(picked, earlier);
    }

    #[test]
    fn test_pick_breaks_ties_by_id() {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap();
        let end = base + chrono::Duration::hours(8);
        let a = shift(9, base, end);
        let b = shift(3, base, end);

        let picked = pick_covering_shift(vec![a, b.clone()]).unwrap();
        assert_eq!(picked.id, b.id);
    }

    #[test]
    fn test_pick_empty_is_none() {
        assert!(pick_covering_shift(Vec::new()).is_none());
    }

    #[test]
    fn test_resolve_window_uses_shift_start_as_origin() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap();
        let s = shift(1, start, start + chrono::Duration::hours(8));

        let w = resolve_window(&s, 120, start + chrono::Duration::minutes(150));
        assert_eq!(w.start, start + chrono::Duration::hours(2));
        assert_eq!(w.end, start + chrono::Duration::hours(4));
    }
}
