//! Service layer for business logic and orchestration.
//!
//! This module contains the engine proper: intake cleans raw reader
//! downloads, the reconciliation driver folds stored events into rounds,
//! and the maintenance passes (gap fill, recalibration) keep the round
//! history honest. Services orchestrate repository calls and hold all of
//! the classification logic; they never talk to a backing store directly.

pub mod finalizer;
pub mod gap_fill;
pub mod intake;
pub mod recalibrate;
pub mod reconcile;
pub mod tracker;
pub mod waypoints;
pub mod windows;

pub use finalizer::derive_status;
pub use gap_fill::{run_gap_fill, run_gap_fill_at, GAP_FILL_LAG_SECS};
pub use intake::{ingest_events, is_valid_tag, normalize_tag};
pub use recalibrate::recalibrate_route;
pub use reconcile::{
    process_events, process_pending, EventDecision, BOUNCE_WINDOW_SECS,
    DEFAULT_PENDING_BATCH_LIMIT, ZOMBIE_AGE_SECS,
};
