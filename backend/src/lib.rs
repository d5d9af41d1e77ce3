//! # Patrol Round Reconciliation Engine
//!
//! Turns raw checkpoint scans into classified patrol rounds.
//!
//! This crate is the backend engine of a guard-patrol monitoring system.
//! Guards carry readers along fixed checkpoint routes; readers upload their
//! scan memory in unordered, duplicated batches. The engine normalizes those
//! uploads, reconciles them into one round per scheduled window, and
//! classifies every round as COMPLETE, INCOMPLETE, INVALID, or
//! NOT_PERFORMED.
//!
//! ## Features
//!
//! - **Intake**: Tag normalization, validation, and duplicate suppression
//! - **Reconciliation**: Order-insensitive folding of scan events into rounds
//! - **Windowing**: Scheduled-slot grids derived from shift and route cadence
//! - **Gap Fill**: NOT_PERFORMED coverage rows for windows nobody patrolled
//! - **Recalibration**: Replay of stored trails after catalog tuning
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Data Transfer Objects (DTOs) exchanged with embedding services
//! - [`db`]: Repository pattern, backends, and persistence layer
//! - [`models`]: Domain types shared by every layer
//! - [`services`]: The engine proper and its maintenance passes
//!

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]
//! ## Processing model
//!
//! Rounds are keyed by scheduled window and waypoints by visit, so every
//! entry point tolerates re-delivery: reprocessing a batch converges on the
//! same stored state instead of duplicating rows. Batches are sorted and
//! grouped per route before any state is touched; input order never matters.

pub mod api;

pub mod db;
pub mod models;

pub mod services;
