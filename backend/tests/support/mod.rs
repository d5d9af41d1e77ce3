// Not every test file uses every helper.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use patrol_rust::db::repositories::LocalRepository;
use patrol_rust::models::{
    Checkpoint, CheckpointId, GuardId, Route, RouteId, ScanEvent, Shift, ShiftId,
};

/// Tags of the standard three-checkpoint fixture route.
pub const ANCHOR_TAG: &str = "04A1B2C3";
pub const MIDDLE_TAG: &str = "04D5E6F7";
pub const FAR_TAG: &str = "04AABBCC";

/// 22:00 UTC; the fixture shift patrols overnight.
pub fn shift_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap()
}

/// Seed a route with three checkpoints and one 8h shift starting at
/// [`shift_start`].
///
/// Checkpoints: anchor (seq 1), middle (seq 2), far (seq 3). Expected
/// transit is 600s per leg, including the closing leg back to the anchor;
/// tolerance is 300s everywhere. Round frequency is 2h.
pub fn seed_standard_route(repo: &LocalRepository) -> (Route, Shift) {
    let route = Route {
        id: RouteId::new(1),
        name: "Perimeter".to_string(),
        frequency_minutes: 120,
        active: true,
    };
    repo.seed_route(route.clone());

    let defs: [(i64, &str, u32); 3] = [(11, ANCHOR_TAG, 1), (12, MIDDLE_TAG, 2), (13, FAR_TAG, 3)];
    for (id, tag, seq) in defs {
        repo.seed_checkpoint(Checkpoint {
            id: CheckpointId::new(id),
            route_id: route.id,
            tag: tag.to_string(),
            name: format!("Checkpoint {seq}"),
            sequence_order: seq,
            // For the anchor this is the closing leg back from the last
            // checkpoint; its opening delta never uses it.
            expected_transit_secs: 600,
            tolerance_secs: 300,
            active: true,
        });
    }

    let shift = Shift {
        id: ShiftId::new(1),
        guard_id: GuardId::new(7),
        route_id: route.id,
        start_time: shift_start(),
        end_time: shift_start() + Duration::hours(8),
    };
    repo.seed_shift(shift.clone());
    (route, shift)
}

/// An unstored scan event for a fixture tag.
pub fn scan(tag: &str, at: DateTime<Utc>) -> ScanEvent {
    ScanEvent::new(tag, at)
}

/// Store events so they carry IDs, the way reconciliation receives them
/// from intake.
pub async fn stored_scans(repo: &LocalRepository, raw: &[ScanEvent]) -> Vec<ScanEvent> {
    use patrol_rust::db::repository::EventRepository;
    repo.store_events(raw).await.expect("store_events failed")
}

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK poisoned");
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}
