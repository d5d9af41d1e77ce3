//! Shift repository trait: schedule lookups for the resolver and gap filler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{RouteId, Shift};

/// Repository trait for shift schedule queries.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ShiftRepository: Send + Sync {
    /// Find the shifts of a route covering an instant
    /// (`start_time <= at <= end_time`).
    ///
    /// More than one shift can cover the instant when different guards patrol
    /// the same route on overlapping schedules; the resolver picks among them
    /// deterministically.
    ///
    /// # Arguments
    /// * `route_id` - The route the scanned checkpoint belongs to
    /// * `at` - The scan timestamp
    ///
    /// # Returns
    /// * `Ok(Vec<Shift>)` - Covering shifts, in no particular order
    /// * `Err(RepositoryError)` - If the operation fails
    async fn find_shifts_covering(
        &self,
        route_id: RouteId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Shift>>;

    /// List every shift whose span intersects `[from, to]`, across all
    /// routes.
    ///
    /// Used by the gap filler to enumerate the schedules whose windows need
    /// coverage rows: shifts still running and shifts that ended inside the
    /// interval both qualify, so windows near the end of a shift still get
    /// swept after the shift is over.
    ///
    /// # Arguments
    /// * `from` - Inclusive lower bound on `end_time`
    /// * `to` - Inclusive upper bound on `start_time`
    ///
    /// # Returns
    /// * `Ok(Vec<Shift>)` - Intersecting shifts, in no particular order
    /// * `Err(RepositoryError)` - If the operation fails
    async fn list_shifts_overlapping(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Shift>>;
}
