//! Round repository trait: lifecycle storage for patrol rounds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{Round, RoundId, RouteId, ShiftId};

/// Repository trait for round storage and lifecycle queries.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait RoundRepository: Send + Sync {
    /// Store a new round and return it with its assigned ID.
    ///
    /// # Arguments
    /// * `round` - The round to store; its `id` must be `None`
    ///
    /// # Returns
    /// * `Ok(Round)` - The stored round with `id` set
    /// * `Err(RepositoryError::ValidationError)` - If the round already has an ID
    /// * `Err(RepositoryError)` - If the operation fails
    async fn store_round(&self, round: &Round) -> RepositoryResult<Round>;

    /// Persist changes to an existing round.
    ///
    /// # Arguments
    /// * `round` - The round to update; its `id` must be `Some`
    ///
    /// # Returns
    /// * `Ok(())` - On success
    /// * `Err(RepositoryError::ValidationError)` - If the round has no ID
    /// * `Err(RepositoryError::NotFound)` - If no stored round has that ID
    /// * `Err(RepositoryError)` - If the operation fails
    async fn update_round(&self, round: &Round) -> RepositoryResult<()>;

    /// Get a single round by ID.
    ///
    /// # Arguments
    /// * `round_id` - The round to retrieve
    ///
    /// # Returns
    /// * `Ok(Round)` - The round
    /// * `Err(RepositoryError::NotFound)` - If the round doesn't exist
    /// * `Err(RepositoryError)` - If the operation fails
    async fn get_round(&self, round_id: RoundId) -> RepositoryResult<Round>;

    /// Find the OPEN round of a `(shift, route)` pair, if any.
    ///
    /// Only rounds with `phase == Open` qualify; NOT_PERFORMED coverage rows
    /// are CLOSED and must never be returned. When more than one open round
    /// exists (a state the engine itself never produces), the most recently
    /// started wins.
    ///
    /// # Arguments
    /// * `shift_id` - The shift
    /// * `route_id` - The route
    ///
    /// # Returns
    /// * `Ok(Some(Round))` - The open round
    /// * `Ok(None)` - If nothing is open for the pair
    /// * `Err(RepositoryError)` - If the operation fails
    async fn find_open_round(
        &self,
        shift_id: ShiftId,
        route_id: RouteId,
    ) -> RepositoryResult<Option<Round>>;

    /// Find the round keyed to a scheduled window by exact `window_start`.
    ///
    /// This is the idempotency key for windowed rounds: the driver and the
    /// gap filler both check it before inserting.
    ///
    /// # Arguments
    /// * `shift_id` - The shift
    /// * `route_id` - The route
    /// * `window_start` - Exact grid-aligned window start
    ///
    /// # Returns
    /// * `Ok(Some(Round))` - The round occupying the window
    /// * `Ok(None)` - If the window has no round row
    /// * `Err(RepositoryError)` - If the operation fails
    async fn find_window_round(
        &self,
        shift_id: ShiftId,
        route_id: RouteId,
        window_start: DateTime<Utc>,
    ) -> RepositoryResult<Option<Round>>;

    /// List all stored rounds ordered by ID.
    ///
    /// Maintenance surface (recalibration walks every round); not used on the
    /// per-event path.
    ///
    /// # Returns
    /// * `Ok(Vec<Round>)` - All rounds, ascending by ID
    /// * `Err(RepositoryError)` - If the operation fails
    async fn list_rounds(&self) -> RepositoryResult<Vec<Round>>;
}
