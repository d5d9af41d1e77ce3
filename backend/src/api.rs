//! Public API surface for the reconciliation backend.
//!
//! This file consolidates the DTO types exchanged with embedding services
//! (ingestion agents, schedulers, HTTP layers). All types derive
//! Serialize/Deserialize for JSON serialization.

pub use crate::models::RoundStatus;
pub use crate::models::WaypointStatus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scan line as delivered by a reader agent, before normalization.
///
/// The ingestion boundary parses raw serial lines into this shape; the
/// intake service normalizes the tag, validates it, and deduplicates
/// before anything reaches the reconciliation driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawScanEvent {
    /// Tag identifier as read from the device (any casing, may contain spaces)
    pub tag: String,
    /// Moment the tag was read
    pub timestamp: DateTime<Utc>,
    /// Identifier of the reader device that produced the scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_id: Option<String>,
    /// Original serial line, kept for troubleshooting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_line: Option<String>,
}

impl RawScanEvent {
    pub fn new(tag: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tag: tag.into(),
            timestamp,
            reader_id: None,
            raw_line: None,
        }
    }
}

/// Result of one reconciliation batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Number of engine actions that touched a round (creation, waypoint
    /// append or update, finalization). Unmatched and bounced events
    /// contribute zero.
    pub rounds_affected: usize,
    /// Human-readable anomaly notes (bounces, ordering violations, zombie
    /// recoveries) collected while the batch ran.
    pub diagnostics: Vec<String>,
}

/// Result of one gap-fill pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GapFillOutcome {
    /// Number of NOT_PERFORMED rounds inserted for silent windows
    pub rounds_created: usize,
}

/// Result of one intake batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntakeOutcome {
    /// Events stored for later reconciliation
    pub stored: usize,
    /// Events dropped because the same (tag, timestamp) pair already exists
    pub duplicates: usize,
    /// Events dropped because the tag failed validation
    pub rejected: usize,
}

/// Result of one recalibration pass over a route's history.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecalibrationOutcome {
    /// Rounds whose waypoints were examined
    pub rounds_examined: usize,
    /// Waypoints whose delta or status changed
    pub waypoints_adjusted: usize,
    /// Closed rounds whose terminal status changed after recomputation
    pub statuses_changed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_scan_event_optional_fields_default() {
        let json = r#"{"tag":"04A1B2C3","timestamp":"2025-03-01T22:00:00Z"}"#;
        let event: RawScanEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.tag, "04A1B2C3");
        assert!(event.reader_id.is_none());
        assert!(event.raw_line.is_none());
    }

    #[test]
    fn test_raw_scan_event_skips_none_on_serialize() {
        let event = RawScanEvent::new("04A1B2C3", Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap());
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("reader_id"));
        assert!(!json.contains("raw_line"));
    }

    #[test]
    fn test_process_outcome_round_trip() {
        let outcome = ProcessOutcome {
            rounds_affected: 3,
            diagnostics: vec!["bounce: tag 04A1B2C3 ignored".to_string()],
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let back: ProcessOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_outcome_defaults_are_zero() {
        let outcome = ProcessOutcome::default();
        assert_eq!(outcome.rounds_affected, 0);
        assert!(outcome.diagnostics.is_empty());

        let gap = GapFillOutcome::default();
        assert_eq!(gap.rounds_created, 0);

        let intake = IntakeOutcome::default();
        assert_eq!(intake.stored + intake.duplicates + intake.rejected, 0);
    }
}
