//! Recalibration: replay stored trails against the current catalog.
//!
//! Expected transit times and tolerances get tuned after rounds have already
//! been recorded. This pass recomputes every waypoint delta of a route from
//! the stored visit chain and the catalog as it stands now, then re-derives
//! the status of closed rounds whose trail changed meaning. The opening row
//! of each trail keeps its stored delta: it measures lateness against the
//! window, not transit, and the window maths did not change.

use log::{debug, info};
use std::collections::HashMap;

use crate::api::RecalibrationOutcome;
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::models::{seconds_between, Checkpoint, CheckpointId, RoundPhase, RoundStatus, RouteId, WaypointStatus};
use crate::services::finalizer;

/// Recompute waypoint deltas and round statuses for one route.
///
/// Transit deltas are rebuilt along the trail in visit order (timestamp
/// ascending), the same chain the live path walked. NOT_PERFORMED rounds
/// have no waypoints and pass through untouched.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `route_id` - The route whose history to recalibrate
///
/// # Returns
/// * `Ok(RecalibrationOutcome)` - Counts of examined rounds, adjusted
///   waypoints, and flipped statuses
/// * `Err` if a repository operation fails
pub async fn recalibrate_route<R: FullRepository + ?Sized>(
    repo: &R,
    route_id: RouteId,
) -> RepositoryResult<RecalibrationOutcome> {
    let checkpoints = repo.list_route_checkpoints(route_id).await?;
    let active_count = checkpoints.len();
    let by_id: HashMap<CheckpointId, Checkpoint> =
        checkpoints.into_iter().map(|cp| (cp.id, cp)).collect();

    let mut outcome = RecalibrationOutcome::default();

    let rounds = repo.list_rounds().await?;
    for mut round in rounds.into_iter().filter(|r| r.route_id == route_id) {
        let round_id = match round.id {
            Some(id) => id,
            None => continue,
        };
        let mut waypoints = repo.list_round_waypoints(round_id).await?;
        if waypoints.is_empty() {
            continue;
        }
        outcome.rounds_examined += 1;

        let mut prev_time = None;
        for wp in waypoints.iter_mut() {
            let checkpoint = match by_id.get(&wp.checkpoint_id) {
                Some(cp) => cp,
                None => {
                    // Checkpoint retired since this visit; keep the stored
                    // values but keep the chain intact.
                    prev_time = Some(wp.timestamp);
                    continue;
                }
            };
            if let Some(prev) = prev_time {
                let delta =
                    seconds_between(prev, wp.timestamp) - checkpoint.expected_transit_secs;
                let status = WaypointStatus::from_delta(delta, checkpoint.tolerance_secs);
                if delta != wp.delta_seconds || status != wp.status {
                    wp.delta_seconds = delta;
                    wp.status = status;
                    repo.update_waypoint(wp).await?;
                    outcome.waypoints_adjusted += 1;
                }
            }
            prev_time = Some(wp.timestamp);
        }

        if round.phase == RoundPhase::Closed && round.status != RoundStatus::NotPerformed {
            let derived = finalizer::derive_status(&waypoints, active_count);
            if derived != round.status {
                debug!(
                    "recalibration: round {:?} status {} -> {}",
                    round.id, round.status, derived
                );
                round.status = derived;
                repo.update_round(&round).await?;
                outcome.statuses_changed += 1;
            }
        }
    }

    info!(
        "recalibrated route {}: {} rounds examined, {} waypoints adjusted, {} statuses changed",
        route_id, outcome.rounds_examined, outcome.waypoints_adjusted, outcome.statuses_changed
    );
    Ok(outcome)
}
