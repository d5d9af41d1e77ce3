//! Repository trait definitions for persistence operations.
//!
//! This module provides a collection of focused repository traits that abstract
//! storage operations. By splitting responsibilities across multiple traits,
//! implementations can be more focused and testable.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`catalog`]: Read access to routes and checkpoints
//! - [`shifts`]: Shift schedule queries
//! - [`rounds`]: Round lifecycle storage
//! - [`waypoints`]: Per-checkpoint visit records
//! - [`events`]: The scan-event inbox
//!
//! # Trait Composition
//!
//! A complete repository implementation typically implements all traits:
//!
//! ```ignore
//! impl CatalogRepository for MyRepo { ... }
//! impl ShiftRepository for MyRepo { ... }
//! impl RoundRepository for MyRepo { ... }
//! impl WaypointRepository for MyRepo { ... }
//! impl EventRepository for MyRepo { ... }
//! ```
//!
//! # Convenience Trait Bound
//!
//! For functions that need all repository capabilities, use the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn my_service<R: FullRepository>(repo: &R) -> RepositoryResult<()> {
//!     // Can use any repository method
//!     let open = repo.find_open_round(shift_id, route_id).await?;
//!     repo.mark_events_processed(&event_ids).await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod events;
pub mod rounds;
pub mod shifts;
pub mod waypoints;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use catalog::CatalogRepository;
pub use events::EventRepository;
pub use rounds::RoundRepository;
pub use shifts::ShiftRepository;
pub use waypoints::WaypointRepository;

/// Composite trait bound for a complete repository implementation.
///
/// This trait is automatically implemented for any type that implements
/// all five repository traits. Use this as a convenient bound when you
/// need access to all repository operations.
///
/// # Example
///
/// ```ignore
/// async fn reconcile<R: FullRepository>(
///     repo: &R,
///     events: Vec<ScanEvent>,
/// ) -> RepositoryResult<ProcessOutcome> {
///     // Can use all repository methods
///     let checkpoints = repo.find_active_checkpoints_by_tags(&tags).await?;
///     // ...
/// }
/// ```
pub trait FullRepository:
    CatalogRepository + ShiftRepository + RoundRepository + WaypointRepository + EventRepository
{
}

// Blanket implementation: any type implementing all five traits automatically implements FullRepository
impl<T> FullRepository for T where
    T: CatalogRepository + ShiftRepository + RoundRepository + WaypointRepository + EventRepository
{
}
