//! Intake: normalization and deduplication of raw reader downloads.
//!
//! Readers re-send their whole memory on every download, so the same
//! `(tag, timestamp)` pair arrives over and over; tags come in with stray
//! whitespace and mixed case depending on reader firmware. Intake is the
//! only layer that sees raw lines: everything past it works on normalized,
//! deduplicated events.

use log::{debug, info, warn};
use std::collections::HashSet;

use crate::api::{IntakeOutcome, RawScanEvent};
use crate::db::repository::{EventRepository, RepositoryResult};
use crate::models::ScanEvent;

/// Bounds on a plausible tag identifier after normalization.
const TAG_MIN_LEN: usize = 8;
const TAG_MAX_LEN: usize = 16;

/// Normalize a raw tag: strip all whitespace, uppercase the rest.
pub fn normalize_tag(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Whether a normalized tag looks like a real reader tag: 8 to 16 hex digits.
pub fn is_valid_tag(tag: &str) -> bool {
    (TAG_MIN_LEN..=TAG_MAX_LEN).contains(&tag.len())
        && tag.chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize, validate, deduplicate and store one download batch.
///
/// Duplicates are counted per occurrence, whether the twin sits earlier in
/// the same batch or was stored by a previous download.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `raw_events` - The batch as it came off the reader
///
/// # Returns
/// * `Ok(IntakeOutcome)` - How many events were stored, skipped as
///   duplicates, or rejected as malformed
/// * `Err` if a repository operation fails
pub async fn ingest_events<R: EventRepository + ?Sized>(
    repo: &R,
    raw_events: Vec<RawScanEvent>,
) -> RepositoryResult<IntakeOutcome> {
    let mut outcome = IntakeOutcome::default();
    let mut fresh: Vec<ScanEvent> = Vec::new();
    let mut seen: HashSet<(String, chrono::DateTime<chrono::Utc>)> = HashSet::new();

    for raw in raw_events {
        let tag = normalize_tag(&raw.tag);
        if !is_valid_tag(&tag) {
            warn!(
                "intake: rejected malformed tag {:?} at {}",
                raw.tag, raw.timestamp
            );
            outcome.rejected += 1;
            continue;
        }

        if !seen.insert((tag.clone(), raw.timestamp)) {
            debug!("intake: duplicate within batch, tag {} at {}", tag, raw.timestamp);
            outcome.duplicates += 1;
            continue;
        }
        if repo.find_event_by_tag_time(&tag, raw.timestamp).await?.is_some() {
            debug!("intake: already stored, tag {} at {}", tag, raw.timestamp);
            outcome.duplicates += 1;
            continue;
        }

        fresh.push(ScanEvent {
            id: None,
            tag,
            timestamp: raw.timestamp,
            reader_id: raw.reader_id,
            raw_line: raw.raw_line,
            processed: false,
        });
    }

    if !fresh.is_empty() {
        let stored = repo.store_events(&fresh).await?;
        outcome.stored = stored.len();
    }

    info!(
        "intake: {} stored, {} duplicates, {} rejected",
        outcome.stored, outcome.duplicates, outcome.rejected
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_normalize_strips_whitespace_and_uppercases() {
        assert_eq!(normalize_tag(" a1b2 c3d4\t"), "A1B2C3D4");
        assert_eq!(normalize_tag("DEADBEEF"), "DEADBEEF");
        assert_eq!(normalize_tag("de ad be ef"), "DEADBEEF");
    }

    #[test]
    fn test_tag_validity_bounds() {
        assert!(is_valid_tag("A1B2C3D4"));
        assert!(is_valid_tag("0123456789ABCDEF"));
        // 7 and 17 characters fall outside the plausible range
        assert!(!is_valid_tag("A1B2C3D"));
        assert!(!is_valid_tag("0123456789ABCDEF0"));
        assert!(!is_valid_tag("A1B2C3G4"));
        assert!(!is_valid_tag(""));
    }

    #[tokio::test]
    async fn test_ingest_dedups_within_and_across_batches() {
        let repo = LocalRepository::new();
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 22, 5, 0).unwrap();

        let first = vec![
            RawScanEvent::new("a1b2c3d4", t),
            // Same pair, different formatting: still a duplicate
            RawScanEvent::new(" A1B2 C3D4 ", t),
            RawScanEvent::new("zz-not-hex", t),
        ];
        let outcome = ingest_events(&repo, first).await.unwrap();
        assert_eq!(outcome.stored, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.rejected, 1);

        // The next download re-sends the reader's whole memory
        let second = vec![
            RawScanEvent::new("A1B2C3D4", t),
            RawScanEvent::new("A1B2C3D4", t + chrono::Duration::minutes(1)),
        ];
        let outcome = ingest_events(&repo, second).await.unwrap();
        assert_eq!(outcome.stored, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.rejected, 0);
    }
}
