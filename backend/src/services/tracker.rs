//! Round state tracking.
//!
//! Finds the round an event belongs to, creating or re-opening windowed
//! rounds as needed. The tracker is what upholds the at-most-one-open-round
//! rule per `(shift, route)` pair: every path that opens a round first went
//! through an open-round lookup in the driver.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::db::repository::{RepositoryResult, RoundRepository};
use crate::models::{Round, RoundPhase, RoundStatus, RouteId, Shift, ShiftId, Window};

/// Find the currently open round for a `(shift, route)` pair.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `shift_id` - The shift
/// * `route_id` - The route
///
/// # Returns
/// * `Ok(Some(Round))` - The open round, most recently started first
/// * `Ok(None)` - Nothing is open for the pair
/// * `Err` if the lookup fails
pub async fn open_round<R: RoundRepository + ?Sized>(
    repo: &R,
    shift_id: ShiftId,
    route_id: RouteId,
) -> RepositoryResult<Option<Round>> {
    repo.find_open_round(shift_id, route_id).await
}

/// Find the round occupying a window, or create it.
///
/// The window's `start` is the idempotency key: reprocessing a batch finds
/// the round a prior run created instead of inserting a twin. A found round
/// that is already closed (a finished earlier run, or a NOT_PERFORMED row the
/// gap filler materialized eagerly) is re-opened so the caller can record
/// waypoints against it; its start time is kept when it has one.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `shift` - The covering shift
/// * `window` - The scheduled window the anchor event falls into
/// * `first_event_time` - Timestamp of the anchor event opening the round
///
/// # Returns
/// * `Ok(Round)` - The open round for the window, stored with an ID
/// * `Err` if a repository operation fails
pub async fn find_or_create_window_round<R: RoundRepository + ?Sized>(
    repo: &R,
    shift: &Shift,
    window: Window,
    first_event_time: DateTime<Utc>,
) -> RepositoryResult<Round> {
    if let Some(mut existing) = repo
        .find_window_round(shift.id, shift.route_id, window.start)
        .await?
    {
        if existing.is_open() {
            debug!(
                "reusing open round {:?} for window starting {}",
                existing.id, window.start
            );
            return Ok(existing);
        }

        existing.phase = RoundPhase::Open;
        existing.status = RoundStatus::Incomplete;
        existing.end_time = None;
        if existing.start_time.is_none() {
            existing.start_time = Some(first_event_time);
        }
        repo.update_round(&existing).await?;
        debug!(
            "re-opened round {:?} for window starting {}",
            existing.id, window.start
        );
        return Ok(existing);
    }

    let round = repo
        .store_round(&Round::windowed_open(shift, window, first_event_time))
        .await?;
    info!(
        "opened round {:?} on route {} for window {} .. {}",
        round.id, shift.route_id, window.start, window.end
    );
    Ok(round)
}

/// Create an INVALID round for a cycle that started off-anchor.
///
/// The round gets a degenerate window collapsed onto the event timestamp and
/// stays open: a later anchor event may still attach to it and close it, at
/// which point the finalizer re-derives its status.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `shift` - The covering shift
/// * `at` - Timestamp of the off-anchor event
///
/// # Returns
/// * `Ok(Round)` - The stored INVALID round, still open
/// * `Err` if the insert fails
pub async fn open_invalid_round<R: RoundRepository + ?Sized>(
    repo: &R,
    shift: &Shift,
    at: DateTime<Utc>,
) -> RepositoryResult<Round> {
    let round = repo
        .store_round(&Round::invalid_open(
            shift,
            at,
            "cycle did not start at the anchor checkpoint",
        ))
        .await?;
    info!(
        "opened INVALID round {:?} on route {} at {}",
        round.id, shift.route_id, at
    );
    Ok(round)
}
