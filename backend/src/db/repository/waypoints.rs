//! Waypoint repository trait: per-checkpoint visit records inside rounds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{RoundId, Waypoint};

/// Repository trait for waypoint storage.
///
/// A round's waypoint trail can legitimately hold the anchor checkpoint
/// twice: once for the visit that opened the round and once for the visit
/// that closed it. Every other checkpoint has at most one row per round.
/// The two write operations encode that split: [`upsert_waypoint`] for
/// in-round visits, [`append_waypoint`] for the closing record.
///
/// [`upsert_waypoint`]: WaypointRepository::upsert_waypoint
/// [`append_waypoint`]: WaypointRepository::append_waypoint
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait WaypointRepository: Send + Sync {
    /// Insert or overwrite an in-round visit in one atomic operation.
    ///
    /// Matching order:
    /// 1. a row with the same `(round_id, checkpoint_id, timestamp)` is
    ///    updated in place (same event re-delivered);
    /// 2. otherwise the earliest-timestamped row with the same
    ///    `(round_id, checkpoint_id)` is updated (a re-scan replaces the
    ///    original visit; the anchor's opening row is the one adjusted);
    /// 3. otherwise a new row is inserted.
    ///
    /// On update, `scan_event_id`, `timestamp`, `delta_seconds` and `status`
    /// are replaced and the row's ID kept. SQL backends implement this with
    /// an on-conflict upsert; the in-memory backend under a single lock
    /// acquisition.
    ///
    /// # Arguments
    /// * `waypoint` - The visit to record; `id` is ignored on input
    ///
    /// # Returns
    /// * `Ok(Waypoint)` - The stored row with `id` set
    /// * `Err(RepositoryError)` - If the operation fails
    async fn upsert_waypoint(&self, waypoint: &Waypoint) -> RepositoryResult<Waypoint>;

    /// Record the closing visit of a round without touching earlier rows.
    ///
    /// A row with the same `(round_id, checkpoint_id, timestamp)` is updated
    /// in place (a reprocessed batch re-delivers the closing event); anything
    /// else inserts a new row even when the checkpoint was already visited.
    /// This is what lets the anchor appear at both ends of the trail.
    ///
    /// # Arguments
    /// * `waypoint` - The closing visit; `id` is ignored on input
    ///
    /// # Returns
    /// * `Ok(Waypoint)` - The stored row with `id` set
    /// * `Err(RepositoryError)` - If the operation fails
    async fn append_waypoint(&self, waypoint: &Waypoint) -> RepositoryResult<Waypoint>;

    /// Persist changes to an existing waypoint.
    ///
    /// Maintenance surface: recalibration rewrites stored deltas in place.
    ///
    /// # Arguments
    /// * `waypoint` - The waypoint to update; its `id` must be `Some`
    ///
    /// # Returns
    /// * `Ok(())` - On success
    /// * `Err(RepositoryError::ValidationError)` - If the waypoint has no ID
    /// * `Err(RepositoryError::NotFound)` - If no stored waypoint has that ID
    /// * `Err(RepositoryError)` - If the operation fails
    async fn update_waypoint(&self, waypoint: &Waypoint) -> RepositoryResult<()>;

    /// List a round's waypoints ordered by `timestamp` ascending.
    ///
    /// # Arguments
    /// * `round_id` - The round
    ///
    /// # Returns
    /// * `Ok(Vec<Waypoint>)` - The visits, earliest first
    /// * `Err(RepositoryError)` - If the operation fails
    async fn list_round_waypoints(&self, round_id: RoundId) -> RepositoryResult<Vec<Waypoint>>;

    /// The latest waypoint of a round strictly before a cutoff, if any.
    ///
    /// Transit deltas are measured from this row. The cutoff is the event
    /// being recorded, so rows a previous run wrote at or after it never
    /// shift the reference point when a batch is reprocessed.
    ///
    /// # Arguments
    /// * `round_id` - The round
    /// * `before` - Exclusive upper bound on `timestamp`
    ///
    /// # Returns
    /// * `Ok(Some(Waypoint))` - The latest visit before the cutoff
    /// * `Ok(None)` - If the round has no waypoints before the cutoff
    /// * `Err(RepositoryError)` - If the operation fails
    async fn latest_waypoint_before(
        &self,
        round_id: RoundId,
        before: DateTime<Utc>,
    ) -> RepositoryResult<Option<Waypoint>>;
}
