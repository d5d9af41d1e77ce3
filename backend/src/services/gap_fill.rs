//! Gap filler: materializes NOT_PERFORMED rounds for silent windows.
//!
//! The reconciliation driver only touches windows that received events; a
//! window nobody scanned in would otherwise leave no trace. This sweep walks
//! the window grid of every running or recently ended shift and inserts a
//! NOT_PERFORMED row for each window that elapsed long enough ago with no
//! round attached. Rows it creates stay eligible for re-opening: if delayed
//! events for that window surface later, the tracker converts the row back
//! into a live round.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::api::GapFillOutcome;
use crate::db::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::models::{windows_from, Round};

/// How far behind `now` a window's start must be before it is swept.
///
/// The lag leaves room for readers that upload on a delay; sweeping too
/// eagerly would mark windows whose events are still in a guard's device.
/// It also bounds how long an ended shift stays in the sweep, so the
/// scheduler must run at least once per lag period to cover every window.
pub const GAP_FILL_LAG_SECS: i64 = 7_200;

/// Sweep running and recently ended shifts for silent windows, as of `now`.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `now` - The instant the sweep reasons from; injected for testability
///
/// # Returns
/// * `Ok(GapFillOutcome)` - Number of NOT_PERFORMED rows inserted
/// * `Err` if a repository operation fails
pub async fn run_gap_fill_at<R: FullRepository + ?Sized>(
    repo: &R,
    now: DateTime<Utc>,
) -> RepositoryResult<GapFillOutcome> {
    let mut outcome = GapFillOutcome::default();
    let cutoff = now - Duration::seconds(GAP_FILL_LAG_SECS);

    let shifts = repo.list_shifts_overlapping(cutoff, now).await?;
    debug!("gap fill at {}: {} shifts in scope", now, shifts.len());

    for shift in shifts {
        let route = match repo.get_route(shift.route_id).await {
            Ok(route) => route,
            Err(RepositoryError::NotFound { .. }) => {
                warn!(
                    "gap fill: shift {} references missing route {}, skipped",
                    shift.id, shift.route_id
                );
                continue;
            }
            Err(e) => return Err(e),
        };
        if !route.active {
            debug!("gap fill: route {} inactive, skipped", route.id);
            continue;
        }
        if route.frequency_minutes <= 0 {
            warn!(
                "gap fill: route {} has non-positive frequency, skipped",
                route.id
            );
            continue;
        }

        // Windows belong to the shift's grid: the walk stops at whichever
        // comes first, the lag cutoff or the shift end.
        let eligible = windows_from(shift.start_time, route.frequency_minutes)
            .take_while(|w| w.start < cutoff && w.start < shift.end_time);
        for window in eligible {
            if repo
                .find_window_round(shift.id, shift.route_id, window.start)
                .await?
                .is_some()
            {
                continue;
            }
            let row = Round::not_performed(
                &shift,
                window,
                "no scan activity inside the scheduled window",
            );
            let stored = repo.store_round(&row).await?;
            debug!(
                "gap fill: NOT_PERFORMED round {:?} for window {} .. {} on route {}",
                stored.id, window.start, window.end, route.id
            );
            outcome.rounds_created += 1;
        }
    }

    if outcome.rounds_created > 0 {
        info!(
            "gap fill created {} NOT_PERFORMED rounds",
            outcome.rounds_created
        );
    }
    Ok(outcome)
}

/// Sweep as of the current wall clock.
pub async fn run_gap_fill<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<GapFillOutcome> {
    run_gap_fill_at(repo, Utc::now()).await
}
