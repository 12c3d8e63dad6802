//! One evaluation cycle: sweep, snapshot, group, evaluate, emit.
//!
//! Synchronous. The store calls are the only I/O, so the scheduler runs
//! this on a blocking worker.

use tracing::{debug, info};

use super::sink::EventSink;
use crate::classifier::{
    evaluate_group, group_sightings, retention_cutoff_ms, sweep_expired, Verdict,
};
use crate::storage::{SightingStore, StoreError};
use crate::types::{ConfigurationIncomplete, TrackingPreferences};

/// Counters for one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Rows removed by the retention sweep
    pub swept: usize,
    /// Sightings in the snapshot
    pub sightings: usize,
    /// Distinct devices
    pub groups: usize,
    /// Records skipped as malformed
    pub malformed: usize,
    /// Events emitted
    pub detections: usize,
}

/// How a cycle ended without error
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Preferences incomplete: the sweep ran but nothing was evaluated
    Skipped {
        swept: usize,
        reason: ConfigurationIncomplete,
    },
}

impl CycleOutcome {
    pub fn detections(&self) -> usize {
        match self {
            CycleOutcome::Completed(report) => report.detections,
            CycleOutcome::Skipped { .. } => 0,
        }
    }
}

/// Errors that abort a cycle before any event is emitted
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("sighting store: {0}")]
    Store(#[from] StoreError),
    #[error("cycle worker failed: {0}")]
    Worker(String),
}

/// Run one cycle at `now_ms` against a fixed preference snapshot.
///
/// Events are emitted only after the whole snapshot has been evaluated, so a
/// store failure never leaves a partial set of detections behind.
pub fn run_cycle<S, K>(
    store: &S,
    prefs: &TrackingPreferences,
    sink: &K,
    now_ms: i64,
) -> Result<CycleOutcome, CycleError>
where
    S: SightingStore + ?Sized,
    K: EventSink + ?Sized,
{
    let swept = sweep_expired(store, now_ms)?;

    let thresholds = match prefs.complete() {
        Ok(t) => t,
        Err(reason) => {
            debug!(%reason, "Skipping classification");
            return Ok(CycleOutcome::Skipped { swept, reason });
        }
    };

    // Ingest runs concurrently, so rows older than the horizon can land
    // between the sweep and the listing
    let cutoff_ms = retention_cutoff_ms(now_ms);
    let mut snapshot = store.list_sightings_ordered_desc_by_time()?;
    snapshot.retain(|s| s.timestamp_ms >= cutoff_ms);
    let sightings = snapshot.len();
    let index = group_sightings(snapshot);

    let mut detections = Vec::new();
    for group in index.iter() {
        match evaluate_group(group, &thresholds, prefs.duration_gate, now_ms) {
            Verdict::Tracker(event) => detections.push(event),
            Verdict::NotTracker(rejection) => {
                debug!(device_key = %group.device_key(), %rejection, "Not a tracker");
            }
        }
    }

    for event in &detections {
        sink.emit(event);
    }

    let report = CycleReport {
        swept,
        sightings,
        groups: index.len(),
        malformed: index.skipped(),
        detections: detections.len(),
    };
    info!(
        swept = report.swept,
        sightings = report.sightings,
        groups = report.groups,
        detections = report.detections,
        "Classification cycle complete"
    );
    Ok(CycleOutcome::Completed(report))
}
