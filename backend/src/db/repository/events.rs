//! Scan-event repository trait: the inbox the engine drains.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{ScanEvent, ScanEventId};

/// Repository trait for scan-event storage.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Store a batch of new events and return them with assigned IDs, in
    /// input order.
    ///
    /// # Arguments
    /// * `events` - Events to store; each `id` must be `None`
    ///
    /// # Returns
    /// * `Ok(Vec<ScanEvent>)` - The stored events with `id` set
    /// * `Err(RepositoryError::ValidationError)` - If any event already has an ID
    /// * `Err(RepositoryError)` - If the operation fails
    async fn store_events(&self, events: &[ScanEvent]) -> RepositoryResult<Vec<ScanEvent>>;

    /// Look up a stored event by its identifying pair.
    ///
    /// Intake dedup key: readers re-send their whole memory on every
    /// download, so `(tag, timestamp)` collisions are the common case.
    ///
    /// # Arguments
    /// * `tag` - Normalized tag identifier
    /// * `timestamp` - Scan instant
    ///
    /// # Returns
    /// * `Ok(Some(ScanEvent))` - The already-stored duplicate
    /// * `Ok(None)` - If the pair is new
    /// * `Err(RepositoryError)` - If the operation fails
    async fn find_event_by_tag_time(
        &self,
        tag: &str,
        timestamp: DateTime<Utc>,
    ) -> RepositoryResult<Option<ScanEvent>>;

    /// List events not yet folded into rounds, ordered by `timestamp`
    /// ascending, up to `limit`.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of events to return
    ///
    /// # Returns
    /// * `Ok(Vec<ScanEvent>)` - Unprocessed events, earliest first
    /// * `Err(RepositoryError)` - If the operation fails
    async fn list_unprocessed_events(&self, limit: usize) -> RepositoryResult<Vec<ScanEvent>>;

    /// Mark events as processed in bulk.
    ///
    /// Unknown IDs are skipped, not errors; a retried batch may include
    /// events a previous partial run already marked.
    ///
    /// # Arguments
    /// * `event_ids` - IDs of the events to mark
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows actually updated
    /// * `Err(RepositoryError)` - If the operation fails
    async fn mark_events_processed(&self, event_ids: &[ScanEventId]) -> RepositoryResult<usize>;
}
