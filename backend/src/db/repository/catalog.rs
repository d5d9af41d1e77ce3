//! Catalog repository trait: read access to routes and checkpoints.
//!
//! The engine never writes catalog rows; roster management owns them. These
//! operations exist so the reconciliation driver can snapshot exactly the
//! slice of the catalog a batch needs.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Checkpoint, Route, RouteId};

/// Repository trait for catalog lookups.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the backing store is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if the store is reachable and healthy
    /// - `Ok(false)` if unhealthy but no error occurred
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Checkpoint Operations ====================

    /// Find the active checkpoints matching any of the given normalized tags.
    ///
    /// Inactive checkpoints are never returned; an unknown tag simply has no
    /// match in the result.
    ///
    /// # Arguments
    /// * `tags` - Normalized tag identifiers (uppercase hex)
    ///
    /// # Returns
    /// * `Ok(Vec<Checkpoint>)` - All active checkpoints whose tag is in `tags`
    /// * `Err(RepositoryError)` - If the operation fails
    async fn find_active_checkpoints_by_tags(
        &self,
        tags: &[String],
    ) -> RepositoryResult<Vec<Checkpoint>>;

    /// List the active checkpoints of a route, ordered by `sequence_order`.
    ///
    /// The length of the result is the checkpoint count a finalized round is
    /// measured against.
    ///
    /// # Arguments
    /// * `route_id` - The route whose checkpoints to list
    ///
    /// # Returns
    /// * `Ok(Vec<Checkpoint>)` - Active checkpoints in route order
    /// * `Err(RepositoryError)` - If the operation fails
    async fn list_route_checkpoints(&self, route_id: RouteId)
        -> RepositoryResult<Vec<Checkpoint>>;

    // ==================== Route Operations ====================

    /// Get a single route by ID.
    ///
    /// # Arguments
    /// * `route_id` - The route to retrieve
    ///
    /// # Returns
    /// * `Ok(Route)` - The route
    /// * `Err(RepositoryError::NotFound)` - If the route doesn't exist
    /// * `Err(RepositoryError)` - If the operation fails
    async fn get_route(&self, route_id: RouteId) -> RepositoryResult<Route>;

    /// List routes by ID set.
    ///
    /// Unknown IDs are skipped, not errors; callers snapshotting a batch ask
    /// for exactly the routes their matched checkpoints reference.
    ///
    /// # Arguments
    /// * `route_ids` - The routes to retrieve
    ///
    /// # Returns
    /// * `Ok(Vec<Route>)` - The routes found, in no particular order
    /// * `Err(RepositoryError)` - If the operation fails
    async fn list_routes_by_ids(&self, route_ids: &[RouteId]) -> RepositoryResult<Vec<Route>>;
}
