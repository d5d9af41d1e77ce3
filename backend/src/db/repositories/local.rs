//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory using HashMap structures, providing fast, deterministic, and
//! isolated execution.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::db::repository::*;
use crate::models::{
    Checkpoint, CheckpointId, Round, RoundId, RoundPhase, Route, RouteId, ScanEvent, ScanEventId,
    Shift, ShiftId, Waypoint, WaypointId,
};

/// In-memory local repository.
///
/// This implementation stores all data in memory using HashMaps, making it
/// ideal for unit tests and local development that need isolation and speed.
/// Catalog rows (routes, checkpoints, shifts) are seeded through the
/// `seed_*` helpers; engine-owned rows go through the trait operations.
///
/// # Example
/// ```
/// use patrol_rust::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// // Pre-populate with test data
/// // repo.seed_route(/* ... */);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    // Catalog reference data, keyed by caller-assigned IDs
    routes: HashMap<RouteId, Route>,
    checkpoints: HashMap<CheckpointId, Checkpoint>,
    shifts: HashMap<ShiftId, Shift>,

    // Engine-owned rows
    events: HashMap<ScanEventId, ScanEvent>,
    rounds: HashMap<RoundId, Round>,
    waypoints: HashMap<WaypointId, Waypoint>,

    // ID counters
    next_event_id: i64,
    next_round_id: i64,
    next_waypoint_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            checkpoints: HashMap::new(),
            shifts: HashMap::new(),
            events: HashMap::new(),
            rounds: HashMap::new(),
            waypoints: HashMap::new(),
            next_event_id: 1,
            next_round_id: 1,
            next_waypoint_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Add a route to the catalog, keeping its caller-assigned ID.
    pub fn seed_route(&self, route: Route) {
        let mut data = self.data.write().unwrap();
        data.routes.insert(route.id, route);
    }

    /// Add a checkpoint to the catalog, keeping its caller-assigned ID.
    pub fn seed_checkpoint(&self, checkpoint: Checkpoint) {
        let mut data = self.data.write().unwrap();
        data.checkpoints.insert(checkpoint.id, checkpoint);
    }

    /// Add a shift to the catalog, keeping its caller-assigned ID.
    pub fn seed_shift(&self, shift: Shift) {
        let mut data = self.data.write().unwrap();
        data.shifts.insert(shift.id, shift);
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        let mut data = self.data.write().unwrap();
        data.is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write().unwrap();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Number of rounds stored.
    pub fn round_count(&self) -> usize {
        self.data.read().unwrap().rounds.len()
    }

    /// Number of waypoints stored.
    pub fn waypoint_count(&self) -> usize {
        self.data.read().unwrap().waypoints.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        let data = self.data.read().unwrap();
        if !data.is_healthy {
            return Err(RepositoryError::connection("repository is not healthy"));
        }
        Ok(())
    }

    /// Helper to get a round or return NotFound error.
    fn get_round_impl(&self, round_id: RoundId) -> RepositoryResult<Round> {
        let data = self.data.read().unwrap();
        data.rounds.get(&round_id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("round {} not found", round_id),
                ErrorContext::new("get_round")
                    .with_entity("round")
                    .with_entity_id(round_id),
            )
        })
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Catalog Repository ====================

#[async_trait]
impl CatalogRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let data = self.data.read().unwrap();
        Ok(data.is_healthy)
    }

    async fn find_active_checkpoints_by_tags(
        &self,
        tags: &[String],
    ) -> RepositoryResult<Vec<Checkpoint>> {
        let data = self.data.read().unwrap();
        let mut checkpoints: Vec<Checkpoint> = data
            .checkpoints
            .values()
            .filter(|cp| cp.active && tags.iter().any(|t| t == &cp.tag))
            .cloned()
            .collect();
        checkpoints.sort_by_key(|cp| cp.id);
        Ok(checkpoints)
    }

    async fn list_route_checkpoints(
        &self,
        route_id: RouteId,
    ) -> RepositoryResult<Vec<Checkpoint>> {
        let data = self.data.read().unwrap();
        let mut checkpoints: Vec<Checkpoint> = data
            .checkpoints
            .values()
            .filter(|cp| cp.active && cp.route_id == route_id)
            .cloned()
            .collect();
        checkpoints.sort_by_key(|cp| (cp.sequence_order, cp.id));
        Ok(checkpoints)
    }

    async fn get_route(&self, route_id: RouteId) -> RepositoryResult<Route> {
        let data = self.data.read().unwrap();
        data.routes.get(&route_id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("route {} not found", route_id),
                ErrorContext::new("get_route")
                    .with_entity("route")
                    .with_entity_id(route_id),
            )
        })
    }

    async fn list_routes_by_ids(&self, route_ids: &[RouteId]) -> RepositoryResult<Vec<Route>> {
        let data = self.data.read().unwrap();
        let mut routes: Vec<Route> = route_ids
            .iter()
            .filter_map(|id| data.routes.get(id).cloned())
            .collect();
        routes.sort_by_key(|r| r.id);
        routes.dedup_by_key(|r| r.id);
        Ok(routes)
    }
}

// ==================== Shift Repository ====================

#[async_trait]
impl ShiftRepository for LocalRepository {
    async fn find_shifts_covering(
        &self,
        route_id: RouteId,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Shift>> {
        let data = self.data.read().unwrap();
        let mut shifts: Vec<Shift> = data
            .shifts
            .values()
            .filter(|s| s.route_id == route_id && s.covers(at))
            .cloned()
            .collect();
        shifts.sort_by_key(|s| s.id);
        Ok(shifts)
    }

    async fn list_shifts_overlapping(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Shift>> {
        let data = self.data.read().unwrap();
        let mut shifts: Vec<Shift> = data
            .shifts
            .values()
            .filter(|s| s.start_time <= to && s.end_time >= from)
            .cloned()
            .collect();
        shifts.sort_by_key(|s| s.id);
        Ok(shifts)
    }
}

// ==================== Round Repository ====================

#[async_trait]
impl RoundRepository for LocalRepository {
    async fn store_round(&self, round: &Round) -> RepositoryResult<Round> {
        self.check_health()?;
        if round.id.is_some() {
            return Err(RepositoryError::validation_with_context(
                "cannot store a round that already has an ID",
                ErrorContext::new("store_round").with_entity("round"),
            ));
        }

        let mut data = self.data.write().unwrap();
        let round_id = RoundId::new(data.next_round_id);
        data.next_round_id += 1;

        let mut stored = round.clone();
        stored.id = Some(round_id);
        data.rounds.insert(round_id, stored.clone());
        Ok(stored)
    }

    async fn update_round(&self, round: &Round) -> RepositoryResult<()> {
        let round_id = round.id.ok_or_else(|| {
            RepositoryError::validation_with_context(
                "cannot update a round without an ID",
                ErrorContext::new("update_round").with_entity("round"),
            )
        })?;

        let mut data = self.data.write().unwrap();
        if !data.rounds.contains_key(&round_id) {
            return Err(RepositoryError::not_found_with_context(
                format!("round {} not found", round_id),
                ErrorContext::new("update_round")
                    .with_entity("round")
                    .with_entity_id(round_id),
            ));
        }
        data.rounds.insert(round_id, round.clone());
        Ok(())
    }

    async fn get_round(&self, round_id: RoundId) -> RepositoryResult<Round> {
        self.get_round_impl(round_id)
    }

    async fn find_open_round(
        &self,
        shift_id: ShiftId,
        route_id: RouteId,
    ) -> RepositoryResult<Option<Round>> {
        let data = self.data.read().unwrap();
        let open = data
            .rounds
            .values()
            .filter(|r| {
                r.shift_id == shift_id && r.route_id == route_id && r.phase == RoundPhase::Open
            })
            .max_by_key(|r| (r.start_time, r.id))
            .cloned();
        Ok(open)
    }

    async fn find_window_round(
        &self,
        shift_id: ShiftId,
        route_id: RouteId,
        window_start: DateTime<Utc>,
    ) -> RepositoryResult<Option<Round>> {
        let data = self.data.read().unwrap();
        let round = data
            .rounds
            .values()
            .filter(|r| {
                r.shift_id == shift_id
                    && r.route_id == route_id
                    && r.window_start == window_start
            })
            .min_by_key(|r| r.id)
            .cloned();
        Ok(round)
    }

    async fn list_rounds(&self) -> RepositoryResult<Vec<Round>> {
        let data = self.data.read().unwrap();
        let mut rounds: Vec<Round> = data.rounds.values().cloned().collect();
        rounds.sort_by_key(|r| r.id);
        Ok(rounds)
    }
}

// ==================== Waypoint Repository ====================

#[async_trait]
impl WaypointRepository for LocalRepository {
    async fn upsert_waypoint(&self, waypoint: &Waypoint) -> RepositoryResult<Waypoint> {
        // One write-lock acquisition covers lookup and write, which is what
        // makes the upsert atomic here.
        let mut data = self.data.write().unwrap();

        // Exact visit first (same event re-delivered), then the earliest row
        // for the pair (a re-scan replaces the original visit).
        let exact_id = data
            .waypoints
            .values()
            .find(|w| {
                w.round_id == waypoint.round_id
                    && w.checkpoint_id == waypoint.checkpoint_id
                    && w.timestamp == waypoint.timestamp
            })
            .and_then(|w| w.id);
        let existing_id = exact_id.or_else(|| {
            data.waypoints
                .values()
                .filter(|w| {
                    w.round_id == waypoint.round_id && w.checkpoint_id == waypoint.checkpoint_id
                })
                .min_by_key(|w| (w.timestamp, w.id))
                .and_then(|w| w.id)
        });

        let waypoint_id = match existing_id {
            Some(id) => id,
            None => {
                let id = WaypointId::new(data.next_waypoint_id);
                data.next_waypoint_id += 1;
                id
            }
        };

        let mut stored = waypoint.clone();
        stored.id = Some(waypoint_id);
        data.waypoints.insert(waypoint_id, stored.clone());
        Ok(stored)
    }

    async fn append_waypoint(&self, waypoint: &Waypoint) -> RepositoryResult<Waypoint> {
        let mut data = self.data.write().unwrap();

        // Only the identical visit updates; a closing record otherwise gets
        // its own row even when the checkpoint was already visited.
        let exact_id = data
            .waypoints
            .values()
            .find(|w| {
                w.round_id == waypoint.round_id
                    && w.checkpoint_id == waypoint.checkpoint_id
                    && w.timestamp == waypoint.timestamp
            })
            .and_then(|w| w.id);

        let waypoint_id = match exact_id {
            Some(id) => id,
            None => {
                let id = WaypointId::new(data.next_waypoint_id);
                data.next_waypoint_id += 1;
                id
            }
        };

        let mut stored = waypoint.clone();
        stored.id = Some(waypoint_id);
        data.waypoints.insert(waypoint_id, stored.clone());
        Ok(stored)
    }

    async fn update_waypoint(&self, waypoint: &Waypoint) -> RepositoryResult<()> {
        let waypoint_id = waypoint.id.ok_or_else(|| {
            RepositoryError::validation_with_context(
                "cannot update a waypoint without an ID",
                ErrorContext::new("update_waypoint").with_entity("waypoint"),
            )
        })?;

        let mut data = self.data.write().unwrap();
        if !data.waypoints.contains_key(&waypoint_id) {
            return Err(RepositoryError::not_found_with_context(
                format!("waypoint {} not found", waypoint_id),
                ErrorContext::new("update_waypoint")
                    .with_entity("waypoint")
                    .with_entity_id(waypoint_id),
            ));
        }
        data.waypoints.insert(waypoint_id, waypoint.clone());
        Ok(())
    }

    async fn list_round_waypoints(&self, round_id: RoundId) -> RepositoryResult<Vec<Waypoint>> {
        let data = self.data.read().unwrap();
        let mut waypoints: Vec<Waypoint> = data
            .waypoints
            .values()
            .filter(|w| w.round_id == round_id)
            .cloned()
            .collect();
        waypoints.sort_by_key(|w| (w.timestamp, w.id));
        Ok(waypoints)
    }

    async fn latest_waypoint_before(
        &self,
        round_id: RoundId,
        before: DateTime<Utc>,
    ) -> RepositoryResult<Option<Waypoint>> {
        let data = self.data.read().unwrap();
        let latest = data
            .waypoints
            .values()
            .filter(|w| w.round_id == round_id && w.timestamp < before)
            .max_by_key(|w| (w.timestamp, w.id))
            .cloned();
        Ok(latest)
    }
}

// ==================== Event Repository ====================

#[async_trait]
impl EventRepository for LocalRepository {
    async fn store_events(&self, events: &[ScanEvent]) -> RepositoryResult<Vec<ScanEvent>> {
        self.check_health()?;
        if events.iter().any(|e| e.id.is_some()) {
            return Err(RepositoryError::validation_with_context(
                "cannot store an event that already has an ID",
                ErrorContext::new("store_events").with_entity("scan_event"),
            ));
        }

        let mut data = self.data.write().unwrap();
        let mut stored = Vec::with_capacity(events.len());
        for event in events {
            let event_id = ScanEventId::new(data.next_event_id);
            data.next_event_id += 1;

            let mut row = event.clone();
            row.id = Some(event_id);
            data.events.insert(event_id, row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    async fn find_event_by_tag_time(
        &self,
        tag: &str,
        timestamp: DateTime<Utc>,
    ) -> RepositoryResult<Option<ScanEvent>> {
        let data = self.data.read().unwrap();
        let found = data
            .events
            .values()
            .filter(|e| e.tag == tag && e.timestamp == timestamp)
            .min_by_key(|e| e.id)
            .cloned();
        Ok(found)
    }

    async fn list_unprocessed_events(&self, limit: usize) -> RepositoryResult<Vec<ScanEvent>> {
        let data = self.data.read().unwrap();
        let mut events: Vec<ScanEvent> = data
            .events
            .values()
            .filter(|e| !e.processed)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.timestamp, e.id));
        events.truncate(limit);
        Ok(events)
    }

    async fn mark_events_processed(&self, event_ids: &[ScanEventId]) -> RepositoryResult<usize> {
        let mut data = self.data.write().unwrap();
        let mut updated = 0;
        for id in event_ids {
            if let Some(event) = data.events.get_mut(id) {
                if !event.processed {
                    event.processed = true;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }
}
