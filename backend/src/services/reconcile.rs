//! Reconciliation driver: the engine's single entry point.
//!
//! Consumes a batch of scan events and folds them into round and waypoint
//! records. Input order is not trusted: the batch is sorted by timestamp
//! before processing, and events are grouped per route so that all events
//! touching one `(shift, route)` pair run strictly in order. Each event is
//! resolved against an immutable per-batch catalog snapshot, classified into
//! an [`EventDecision`], and dispatched in a single step, which keeps the
//! state machine's transition table auditable in isolation from persistence.
//!
//! Per-event effects are committed individually; a repository failure aborts
//! the batch without rolling back earlier events. Re-running a batch is safe
//! because rounds are keyed by window and waypoints by visit.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

use crate::api::ProcessOutcome;
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::models::{
    format_signed_seconds, seconds_between, Checkpoint, Round, Route, RouteId, ScanEvent,
    ScanEventId, Shift,
};
use crate::services::{finalizer, tracker, waypoints as recorder, windows};

/// A second anchor read within this many seconds of a round's start is noise.
pub const BOUNCE_WINDOW_SECS: i64 = 60;

/// An open round that has gone this long without closing is abandoned.
pub const ZOMBIE_AGE_SECS: i64 = 14_400;

/// Default batch size when draining the pending-event backlog.
pub const DEFAULT_PENDING_BATCH_LIMIT: usize = 500;

/// Immutable lookup tables for one batch invocation.
///
/// Built once from the catalog before any event is processed; no shared
/// mutable state survives across batches. Checkpoints whose route is missing
/// or inactive resolve to nothing and their events fall out as unmatched.
pub(crate) struct BatchCatalog {
    checkpoints_by_tag: HashMap<String, Checkpoint>,
    routes_by_id: HashMap<RouteId, Route>,
}

impl BatchCatalog {
    /// Snapshot the checkpoints and routes referenced by a batch.
    pub(crate) async fn load<R: FullRepository + ?Sized>(
        repo: &R,
        events: &[ScanEvent],
    ) -> RepositoryResult<Self> {
        let mut tags: Vec<String> = events.iter().map(|e| e.tag.clone()).collect();
        tags.sort();
        tags.dedup();

        let checkpoints = repo.find_active_checkpoints_by_tags(&tags).await?;
        let mut route_ids: Vec<RouteId> = checkpoints.iter().map(|cp| cp.route_id).collect();
        route_ids.sort();
        route_ids.dedup();

        let routes = repo.list_routes_by_ids(&route_ids).await?;
        let routes_by_id: HashMap<RouteId, Route> = routes
            .into_iter()
            .filter(|r| r.active)
            .map(|r| (r.id, r))
            .collect();
        let checkpoints_by_tag: HashMap<String, Checkpoint> = checkpoints
            .into_iter()
            .map(|cp| (cp.tag.clone(), cp))
            .collect();

        debug!(
            "batch catalog: {} checkpoints, {} routes",
            checkpoints_by_tag.len(),
            routes_by_id.len()
        );
        Ok(Self {
            checkpoints_by_tag,
            routes_by_id,
        })
    }

    /// Resolve a normalized tag to its checkpoint and active route.
    pub(crate) fn lookup(&self, tag: &str) -> Option<(&Checkpoint, &Route)> {
        let checkpoint = self.checkpoints_by_tag.get(tag)?;
        let route = self.routes_by_id.get(&checkpoint.route_id)?;
        Some((checkpoint, route))
    }
}

/// The state machine's verdict for one event, decided before any mutation.
///
/// `Unmatched` is produced during resolution (unknown tag, inactive route,
/// or no covering shift); the remaining variants come out of [`classify`]
/// once the event is bound to a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    /// Tag or shift not found; the event is skipped without side effects
    Unmatched,
    /// Anchor re-read moments after the round opened; discard as noise
    Bounce {
        /// Seconds since the open round started (can be negative for
        /// out-of-order deliveries)
        elapsed_secs: i64,
    },
    /// Anchor closing the open round
    NormalClose,
    /// Anchor hitting an abandoned round: force-close it, then start fresh
    ZombieRecoverAndStart,
    /// Anchor with nothing open: start a round in the event's window
    OpenAnchor,
    /// Intermediate checkpoint recorded against the open round
    Continuation,
    /// Intermediate checkpoint with nothing open: open an INVALID round
    InvalidStart,
}

/// Classify one resolved event against the current open-round state.
///
/// Pure function over the inputs; every persistence effect happens in the
/// dispatch step that consumes the result.
pub(crate) fn classify(
    is_anchor: bool,
    open_round: Option<&Round>,
    event_time: DateTime<Utc>,
) -> EventDecision {
    match (is_anchor, open_round) {
        (true, Some(round)) => {
            let started = round.start_time.unwrap_or(round.window_start);
            let elapsed = seconds_between(started, event_time);
            if elapsed <= BOUNCE_WINDOW_SECS {
                EventDecision::Bounce {
                    elapsed_secs: elapsed,
                }
            } else if elapsed < ZOMBIE_AGE_SECS {
                EventDecision::NormalClose
            } else {
                EventDecision::ZombieRecoverAndStart
            }
        }
        (true, None) => EventDecision::OpenAnchor,
        (false, Some(_)) => EventDecision::Continuation,
        (false, None) => EventDecision::InvalidStart,
    }
}

/// Reconcile a batch of scan events into rounds and waypoints.
///
/// The single entry point of the engine. Every input event that carries an
/// ID is marked processed when the batch completes, whether or not it
/// produced a round change.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `events` - The batch; order and duplication are irrelevant
///
/// # Returns
/// * `Ok(ProcessOutcome)` - Count of round-touching actions plus anomaly
///   diagnostics
/// * `Err` if a repository operation fails; earlier events in the batch stay
///   committed
pub async fn process_events<R: FullRepository + ?Sized>(
    repo: &R,
    events: Vec<ScanEvent>,
) -> RepositoryResult<ProcessOutcome> {
    let mut outcome = ProcessOutcome::default();
    if events.is_empty() {
        return Ok(outcome);
    }

    let catalog = BatchCatalog::load(repo, &events).await?;

    let mut batch = events;
    batch.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.tag.cmp(&b.tag))
            .then_with(|| a.id.cmp(&b.id))
    });

    // Route groups keep each (shift, route) sequence strictly ordered while
    // leaving unrelated routes independent.
    let mut groups: BTreeMap<RouteId, Vec<ScanEvent>> = BTreeMap::new();
    for event in &batch {
        match catalog.lookup(&event.tag) {
            Some((checkpoint, _)) => groups
                .entry(checkpoint.route_id)
                .or_default()
                .push(event.clone()),
            None => debug!(
                "unmatched: no active checkpoint for tag {} at {}",
                event.tag, event.timestamp
            ),
        }
    }

    for (route_id, group) in &groups {
        debug!("reconciling {} events on route {}", group.len(), route_id);
        for event in group {
            handle_event(repo, &catalog, event, &mut outcome).await?;
        }
    }

    let processed: Vec<ScanEventId> = batch.iter().filter_map(|e| e.id).collect();
    if !processed.is_empty() {
        repo.mark_events_processed(&processed).await?;
    }

    info!(
        "reconciled {} events: {} round actions, {} diagnostics",
        batch.len(),
        outcome.rounds_affected,
        outcome.diagnostics.len()
    );
    Ok(outcome)
}

/// Drain up to `limit` unprocessed events from the backlog and reconcile them.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `limit` - Maximum backlog slice to take, usually
///   [`DEFAULT_PENDING_BATCH_LIMIT`]
///
/// # Returns
/// * `Ok(ProcessOutcome)` - The batch outcome; empty when nothing is pending
/// * `Err` if a repository operation fails
pub async fn process_pending<R: FullRepository + ?Sized>(
    repo: &R,
    limit: usize,
) -> RepositoryResult<ProcessOutcome> {
    let pending = repo.list_unprocessed_events(limit).await?;
    if pending.is_empty() {
        debug!("no pending events to reconcile");
        return Ok(ProcessOutcome::default());
    }
    info!("draining {} pending events", pending.len());
    process_events(repo, pending).await
}

/// Resolve, classify and dispatch one event.
async fn handle_event<R: FullRepository + ?Sized>(
    repo: &R,
    catalog: &BatchCatalog,
    event: &ScanEvent,
    outcome: &mut ProcessOutcome,
) -> RepositoryResult<()> {
    let (checkpoint, route) = match catalog.lookup(&event.tag) {
        Some(pair) => pair,
        None => return Ok(()),
    };
    let shift = match windows::resolve_shift(repo, route.id, event.timestamp).await? {
        Some(shift) => shift,
        None => return Ok(()),
    };

    let open = tracker::open_round(repo, shift.id, route.id).await?;
    let decision = classify(checkpoint.is_anchor(), open.as_ref(), event.timestamp);
    debug!(
        "event tag {} at {} on route {}: {:?}",
        event.tag, event.timestamp, route.id, decision
    );

    match decision {
        EventDecision::Unmatched => {}

        EventDecision::Bounce { elapsed_secs } => {
            let note = format!(
                "bounce: anchor tag {} re-read {} after round start, event at {} discarded",
                event.tag,
                format_signed_seconds(elapsed_secs),
                event.timestamp
            );
            warn!("{}", note);
            outcome.diagnostics.push(note);
        }

        EventDecision::NormalClose => {
            if let Some(round) = open {
                close_round(repo, round, checkpoint, route, event, outcome).await?;
            }
        }

        EventDecision::ZombieRecoverAndStart => {
            if let Some(mut stale) = open {
                let started = stale.start_time.unwrap_or(stale.window_start);
                let cutoff = started + Duration::seconds(ZOMBIE_AGE_SECS);
                let checkpoint_count = repo.list_route_checkpoints(route.id).await?.len();
                let status =
                    finalizer::finalize_round(repo, &mut stale, cutoff, checkpoint_count).await?;
                let note = format!(
                    "zombie: round started {} never closed, force-closed at {} as {}",
                    started, cutoff, status
                );
                warn!("{}", note);
                outcome.diagnostics.push(note);
                outcome.rounds_affected += 1;
            }
            start_round(repo, &shift, route, checkpoint, event, outcome).await?;
        }

        EventDecision::OpenAnchor => {
            start_round(repo, &shift, route, checkpoint, event, outcome).await?;
        }

        EventDecision::Continuation => {
            if let Some(round) = open {
                continue_round(repo, round, checkpoint, event, outcome).await?;
            }
        }

        EventDecision::InvalidStart => {
            let round = tracker::open_invalid_round(repo, &shift, event.timestamp).await?;
            // The off-anchor opener has no reference point; its delta is zero.
            recorder::record_waypoint(repo, &round, checkpoint, event, 0).await?;
            outcome.rounds_affected += 1;
        }
    }
    Ok(())
}

/// Open (or re-open) the windowed round for an anchor event and record the
/// opening visit.
async fn start_round<R: FullRepository + ?Sized>(
    repo: &R,
    shift: &Shift,
    route: &Route,
    checkpoint: &Checkpoint,
    event: &ScanEvent,
    outcome: &mut ProcessOutcome,
) -> RepositoryResult<()> {
    let window = windows::resolve_window(shift, route.frequency_minutes, event.timestamp);
    let round = tracker::find_or_create_window_round(repo, shift, window, event.timestamp).await?;

    let delta = recorder::opening_delta(round.window_start, event.timestamp);
    recorder::record_waypoint(repo, &round, checkpoint, event, delta).await?;
    outcome.rounds_affected += 1;
    Ok(())
}

/// Record the closing anchor visit and finalize the round.
async fn close_round<R: FullRepository + ?Sized>(
    repo: &R,
    mut round: Round,
    checkpoint: &Checkpoint,
    route: &Route,
    event: &ScanEvent,
    outcome: &mut ProcessOutcome,
) -> RepositoryResult<()> {
    let prev = recorder::previous_time(repo, &round, event.timestamp).await?;
    let delta =
        recorder::continuation_delta(prev, event.timestamp, checkpoint.expected_transit_secs);
    recorder::record_closing_waypoint(repo, &round, checkpoint, event, delta).await?;

    let checkpoint_count = repo.list_route_checkpoints(route.id).await?.len();
    finalizer::finalize_round(repo, &mut round, event.timestamp, checkpoint_count).await?;
    outcome.rounds_affected += 1;
    Ok(())
}

/// Record an intermediate visit against the open round.
async fn continue_round<R: FullRepository + ?Sized>(
    repo: &R,
    round: Round,
    checkpoint: &Checkpoint,
    event: &ScanEvent,
    outcome: &mut ProcessOutcome,
) -> RepositoryResult<()> {
    if recorder::violates_monotonicity(&round, event.timestamp) {
        let round_start = round.start_time.unwrap_or(round.window_start);
        let note = format!(
            "ordering violation: event at {} precedes open round start {}, event skipped",
            event.timestamp, round_start
        );
        warn!("{}", note);
        outcome.diagnostics.push(note);
        return Ok(());
    }

    let prev = recorder::previous_time(repo, &round, event.timestamp).await?;
    let delta =
        recorder::continuation_delta(prev, event.timestamp, checkpoint.expected_transit_secs);
    recorder::record_waypoint(repo, &round, checkpoint, event, delta).await?;
    outcome.rounds_affected += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GuardId, ShiftId, Window};
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap()
    }

    fn open_round_started(start: DateTime<Utc>) -> Round {
        let shift = Shift {
            id: ShiftId::new(1),
            guard_id: GuardId::new(7),
            route_id: RouteId::new(1),
            start_time: start,
            end_time: start + Duration::hours(8),
        };
        let window = Window::new(start, start + Duration::hours(2));
        Round::windowed_open(&shift, window, start)
    }

    #[test]
    fn test_anchor_within_bounce_window_is_noise() {
        let round = open_round_started(base());

        let at_30s = classify(true, Some(&round), base() + Duration::seconds(30));
        assert_eq!(at_30s, EventDecision::Bounce { elapsed_secs: 30 });

        // Boundary: exactly 60s still bounces
        let at_60s = classify(true, Some(&round), base() + Duration::seconds(60));
        assert_eq!(at_60s, EventDecision::Bounce { elapsed_secs: 60 });
    }

    #[test]
    fn test_out_of_order_anchor_bounces_with_negative_elapsed() {
        let round = open_round_started(base());
        let decision = classify(true, Some(&round), base() - Duration::seconds(10));
        assert_eq!(decision, EventDecision::Bounce { elapsed_secs: -10 });
    }

    #[test]
    fn test_anchor_past_bounce_window_closes() {
        let round = open_round_started(base());
        let decision = classify(true, Some(&round), base() + Duration::seconds(61));
        assert_eq!(decision, EventDecision::NormalClose);

        let just_under_zombie = classify(
            true,
            Some(&round),
            base() + Duration::seconds(ZOMBIE_AGE_SECS - 1),
        );
        assert_eq!(just_under_zombie, EventDecision::NormalClose);
    }

    #[test]
    fn test_anchor_at_zombie_age_recovers() {
        let round = open_round_started(base());
        let decision = classify(
            true,
            Some(&round),
            base() + Duration::seconds(ZOMBIE_AGE_SECS),
        );
        assert_eq!(decision, EventDecision::ZombieRecoverAndStart);
    }

    #[test]
    fn test_anchor_with_nothing_open_starts_round() {
        assert_eq!(classify(true, None, base()), EventDecision::OpenAnchor);
    }

    #[test]
    fn test_intermediate_checkpoint_decisions() {
        let round = open_round_started(base());
        assert_eq!(
            classify(false, Some(&round), base() + Duration::minutes(10)),
            EventDecision::Continuation
        );
        assert_eq!(classify(false, None, base()), EventDecision::InvalidStart);
    }
}
