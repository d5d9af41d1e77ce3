//! Waypoint recording.
//!
//! Appends or updates one checkpoint visit inside a round. A second scan of
//! the same checkpoint within the same round updates the existing row, so
//! reprocessing a batch never duplicates visits.
//!
//! Deltas are signed seconds, positive when late:
//! - the anchor opening a round is measured against the window's nominal
//!   opening, `event time - window start`;
//! - every subsequent visit is measured point to point, `(event time -
//!   previous visit time) - expected transit`, where the previous visit is
//!   the most recently timestamped waypoint or, for the second visit ever,
//!   the round's start time.

use chrono::{DateTime, Utc};
use log::debug;

use crate::db::repository::{RepositoryError, RepositoryResult, WaypointRepository};
use crate::models::{
    format_signed_seconds, seconds_between, Checkpoint, Round, ScanEvent, Waypoint, WaypointStatus,
};

/// Delta for the anchor visit that opens a round.
pub fn opening_delta(window_start: DateTime<Utc>, event_time: DateTime<Utc>) -> i64 {
    seconds_between(window_start, event_time)
}

/// Delta for any visit after the first, including the anchor closing a round.
pub fn continuation_delta(
    prev_time: DateTime<Utc>,
    event_time: DateTime<Utc>,
    expected_transit_secs: i64,
) -> i64 {
    seconds_between(prev_time, event_time) - expected_transit_secs
}

/// Whether recording this event would move the round backwards in time.
///
/// Stale or out-of-order events older than the round's start are rejected
/// before they can corrupt an active round.
pub fn violates_monotonicity(round: &Round, event_time: DateTime<Utc>) -> bool {
    let round_start = round.start_time.unwrap_or(round.window_start);
    event_time < round_start
}

/// Reference timestamp for the next continuation delta of a round.
///
/// The reference is the latest waypoint strictly before the event being
/// recorded, falling back to the round start for the second visit ever.
/// Bounding the lookup by the event keeps deltas stable when a batch is
/// reprocessed over rows a previous run already wrote.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `round` - The open round being recorded against
/// * `event_time` - Timestamp of the visit about to be recorded
///
/// # Returns
/// * `Ok(DateTime<Utc>)` - The reference timestamp
/// * `Err` if the lookup fails
pub async fn previous_time<R: WaypointRepository + ?Sized>(
    repo: &R,
    round: &Round,
    event_time: DateTime<Utc>,
) -> RepositoryResult<DateTime<Utc>> {
    let round_start = round.start_time.unwrap_or(round.window_start);
    let round_id = match round.id {
        Some(id) => id,
        None => return Ok(round_start),
    };
    let latest = repo.latest_waypoint_before(round_id, event_time).await?;
    Ok(latest.map(|w| w.timestamp).unwrap_or(round_start))
}

/// Record one checkpoint visit, inserting or updating in place.
///
/// When the checkpoint was already visited in this round, the earliest
/// existing waypoint for the pair has its event link, timestamp, delta and
/// status replaced and its ID kept, so a re-scan or a re-delivered batch
/// never duplicates in-round visits.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `round` - The stored round the visit belongs to
/// * `checkpoint` - The scanned checkpoint
/// * `event` - The scan event being folded in
/// * `delta_seconds` - Signed timing delta computed by the caller
///
/// # Returns
/// * `Ok(Waypoint)` - The stored waypoint with its ID
/// * `Err(RepositoryError::ValidationError)` - If the round has no ID yet
/// * `Err` if the upsert fails
pub async fn record_waypoint<R: WaypointRepository + ?Sized>(
    repo: &R,
    round: &Round,
    checkpoint: &Checkpoint,
    event: &ScanEvent,
    delta_seconds: i64,
) -> RepositoryResult<Waypoint> {
    let round_id = round.id.ok_or_else(|| {
        RepositoryError::validation("cannot record a waypoint against an unstored round")
    })?;

    let status = WaypointStatus::from_delta(delta_seconds, checkpoint.tolerance_secs);
    let waypoint = Waypoint {
        id: None,
        round_id,
        checkpoint_id: checkpoint.id,
        scan_event_id: event.id,
        sequence_order: checkpoint.sequence_order,
        timestamp: event.timestamp,
        delta_seconds,
        status,
    };

    let stored = repo.upsert_waypoint(&waypoint).await?;
    debug!(
        "recorded waypoint {:?} round {} checkpoint {} ({}, {})",
        stored.id,
        round_id,
        checkpoint.name,
        format_signed_seconds(delta_seconds),
        status
    );
    Ok(stored)
}

/// Record the visit that closes a round.
///
/// Unlike [`record_waypoint`], the closing record never overwrites the
/// anchor's opening row: the trail keeps both ends of the cycle, which is
/// what the finalizer's ordering checks look at. Re-delivering the same
/// closing event updates the existing closing row.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `round` - The round being closed
/// * `checkpoint` - The anchor checkpoint
/// * `event` - The closing scan event
/// * `delta_seconds` - Point-to-point delta computed by the caller
///
/// # Returns
/// * `Ok(Waypoint)` - The stored closing waypoint
/// * `Err(RepositoryError::ValidationError)` - If the round has no ID yet
/// * `Err` if the insert fails
pub async fn record_closing_waypoint<R: WaypointRepository + ?Sized>(
    repo: &R,
    round: &Round,
    checkpoint: &Checkpoint,
    event: &ScanEvent,
    delta_seconds: i64,
) -> RepositoryResult<Waypoint> {
    let round_id = round.id.ok_or_else(|| {
        RepositoryError::validation("cannot record a waypoint against an unstored round")
    })?;

    let status = WaypointStatus::from_delta(delta_seconds, checkpoint.tolerance_secs);
    let waypoint = Waypoint {
        id: None,
        round_id,
        checkpoint_id: checkpoint.id,
        scan_event_id: event.id,
        sequence_order: checkpoint.sequence_order,
        timestamp: event.timestamp,
        delta_seconds,
        status,
    };

    let stored = repo.append_waypoint(&waypoint).await?;
    debug!(
        "recorded closing waypoint {:?} round {} ({}, {})",
        stored.id,
        round_id,
        format_signed_seconds(delta_seconds),
        status
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GuardId, RouteId, Shift, ShiftId, Window};
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap()
    }

    fn open_round_at(start: DateTime<Utc>) -> Round {
        let shift = Shift {
            id: ShiftId::new(1),
            guard_id: GuardId::new(7),
            route_id: RouteId::new(1),
            start_time: start,
            end_time: start + chrono::Duration::hours(8),
        };
        let window = Window::new(start, start + chrono::Duration::hours(2));
        Round::windowed_open(&shift, window, start + chrono::Duration::minutes(2))
    }

    #[test]
    fn test_opening_delta_is_lateness_past_window_start() {
        let w = base();
        assert_eq!(opening_delta(w, w + chrono::Duration::seconds(95)), 95);
        assert_eq!(opening_delta(w, w - chrono::Duration::seconds(30)), -30);
    }

    #[test]
    fn test_continuation_delta_subtracts_expected_transit() {
        let prev = base();
        let now = prev + chrono::Duration::seconds(400);
        assert_eq!(continuation_delta(prev, now, 300), 100);
        assert_eq!(continuation_delta(prev, now, 500), -100);
    }

    #[test]
    fn test_monotonicity_rejects_events_before_round_start() {
        let round = open_round_at(base());
        let start = round.start_time.unwrap();

        assert!(violates_monotonicity(&round, start - chrono::Duration::seconds(1)));
        assert!(!violates_monotonicity(&round, start));
        assert!(!violates_monotonicity(&round, start + chrono::Duration::seconds(1)));
    }
}
