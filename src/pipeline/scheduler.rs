//! Classification Scheduler
//!
//! Two states, Inactive and Active. `start_tracking` spawns a timer task
//! that runs one cycle immediately and then one per interval;
//! `stop_tracking` cancels that task through its token and waits for it to
//! exit. A cycle already in flight finishes, but nothing runs after
//! `stop_tracking` returns.
//!
//! Cycles never overlap: the next sleep starts only after the previous cycle
//! has returned. Preferences are read once at the start of each cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::cycle::{run_cycle, CycleError, CycleOutcome};
use super::sink::EventSink;
use crate::config::PreferenceSource;
use crate::storage::SightingStore;

/// Wall clock in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Inactive,
    Active,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Inactive => write!(f, "inactive"),
            TrackingState::Active => write!(f, "active"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("tracking task failed: {0}")]
    TaskFailed(String),
}

/// Lifetime counters, updated by the tracking task
#[derive(Debug, Default)]
pub struct SchedulerStats {
    cycles_completed: AtomicU64,
    cycles_skipped: AtomicU64,
    cycles_failed: AtomicU64,
    detections: AtomicU64,
}

/// Point-in-time copy of `SchedulerStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub cycles_failed: u64,
    pub detections: u64,
}

impl SchedulerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
        }
    }

    fn record(&self, result: &Result<CycleOutcome, CycleError>) {
        match result {
            Ok(CycleOutcome::Completed(report)) => {
                self.cycles_completed.fetch_add(1, Ordering::Relaxed);
                self.detections
                    .fetch_add(report.detections as u64, Ordering::Relaxed);
            }
            Ok(CycleOutcome::Skipped { .. }) => {
                self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.cycles_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Everything a cycle needs, cheap to clone into the tracking task.
#[derive(Clone)]
struct CycleContext {
    store: Arc<dyn SightingStore>,
    prefs: Arc<dyn PreferenceSource>,
    sink: Arc<dyn EventSink>,
    clock: Clock,
    stats: Arc<SchedulerStats>,
}

impl CycleContext {
    /// Run one cycle on a blocking worker with the current preferences.
    async fn run(&self) -> Result<CycleOutcome, CycleError> {
        let store = Arc::clone(&self.store);
        let sink = Arc::clone(&self.sink);
        let prefs = self.prefs.current();
        let now_ms = (self.clock)();

        let result = tokio::task::spawn_blocking(move || {
            run_cycle(store.as_ref(), &prefs, sink.as_ref(), now_ms)
        })
        .await
        .unwrap_or_else(|e| Err(CycleError::Worker(e.to_string())));

        self.stats.record(&result);
        result
    }
}

struct TrackingSession {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Drives periodic classification while tracking is active.
pub struct ClassificationScheduler {
    ctx: CycleContext,
    interval: Duration,
    session: Mutex<Option<TrackingSession>>,
}

impl ClassificationScheduler {
    pub fn new(
        store: Arc<dyn SightingStore>,
        prefs: Arc<dyn PreferenceSource>,
        sink: Arc<dyn EventSink>,
        interval: Duration,
    ) -> Self {
        Self {
            ctx: CycleContext {
                store,
                prefs,
                sink,
                clock: system_clock(),
                stats: Arc::new(SchedulerStats::default()),
            },
            interval,
            session: Mutex::new(None),
        }
    }

    /// Replace the wall clock (tests, replays of recorded data).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.ctx.clock = clock;
        self
    }

    pub async fn state(&self) -> TrackingState {
        if self.session.lock().await.is_some() {
            TrackingState::Active
        } else {
            TrackingState::Inactive
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats.snapshot()
    }

    /// Inactive -> Active. Runs the first cycle right away.
    ///
    /// Returns `false` without side effects if tracking is already active.
    pub async fn start_tracking(&self) -> bool {
        let mut session = self.session.lock().await;
        if session.is_some() {
            debug!("start_tracking ignored, already active");
            return false;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(tracking_loop(
            self.ctx.clone(),
            self.interval,
            cancel_token.clone(),
        ));
        *session = Some(TrackingSession {
            handle,
            cancel_token,
        });

        info!(interval_secs = self.interval.as_secs_f64(), "Tracking started");
        true
    }

    /// Active -> Inactive. Cancels the pending tick and waits for the task.
    ///
    /// Returns `Ok(false)` if tracking was not active.
    pub async fn stop_tracking(&self) -> Result<bool, SchedulerError> {
        let Some(TrackingSession {
            handle,
            cancel_token,
        }) = self.session.lock().await.take()
        else {
            return Ok(false);
        };

        cancel_token.cancel();
        handle
            .await
            .map_err(|e| SchedulerError::TaskFailed(e.to_string()))?;

        info!("Tracking stopped");
        Ok(true)
    }

    /// Run a single cycle now, independent of the tracking state.
    pub async fn run_once(&self) -> Result<CycleOutcome, SchedulerError> {
        Ok(self.ctx.run().await?)
    }
}

async fn tracking_loop(ctx: CycleContext, interval: Duration, cancel_token: CancellationToken) {
    let mut prefs_rx = ctx.prefs.subscribe();
    let mut prefs_open = true;

    loop {
        if let Err(e) = ctx.run().await {
            // Transient: next tick still runs
            error!(error = %e, "Classification cycle failed");
        }

        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                () = cancel_token.cancelled() => {
                    debug!("Tracking loop cancelled");
                    return;
                }
                () = &mut sleep => break,
                changed = prefs_rx.changed(), if prefs_open => {
                    if changed.is_ok() {
                        debug!("Tracking preferences updated, applied next cycle");
                    } else {
                        prefs_open = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SharedPreferences;
    use crate::pipeline::sink::RecordingSink;
    use crate::storage::{InMemorySightingStore, StoreError};
    use crate::types::{Sighting, TrackingPreferences};

    const NOW: i64 = 1_700_000_000_000;

    fn scheduler(
        prefs: TrackingPreferences,
    ) -> (ClassificationScheduler, Arc<InMemorySightingStore>, Arc<RecordingSink>) {
        let store = Arc::new(InMemorySightingStore::new());
        let sink = Arc::new(RecordingSink::new());
        let sched = ClassificationScheduler::new(
            store.clone(),
            Arc::new(SharedPreferences::new(prefs)),
            sink.clone(),
            Duration::from_secs(10),
        )
        .with_clock(Arc::new(|| NOW));
        (sched, store, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_immediately_then_per_interval() {
        let (sched, _store, _sink) = scheduler(TrackingPreferences::new(2, 0.0, 0.0));

        assert!(sched.start_tracking().await);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sched.stats().cycles_completed, 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sched.stats().cycles_completed, 2);

        assert!(sched.stop_tracking().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_active_is_noop() {
        let (sched, _store, _sink) = scheduler(TrackingPreferences::new(2, 0.0, 0.0));
        assert!(sched.start_tracking().await);
        assert!(!sched.start_tracking().await);
        assert_eq!(sched.state().await, TrackingState::Active);

        assert!(sched.stop_tracking().await.unwrap());
        assert_eq!(sched.state().await, TrackingState::Inactive);
        assert!(!sched.stop_tracking().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_preferences_are_skipped() {
        let (sched, store, sink) = scheduler(TrackingPreferences::default());
        store
            .insert_sighting(&Sighting::new("A", NOW - 1, 0.0, 0.0, "x"))
            .unwrap();

        sched.start_tracking().await;
        tokio::time::sleep(Duration::from_secs(25)).await;
        sched.stop_tracking().await.unwrap();

        let stats = sched.stats();
        assert_eq!(stats.cycles_skipped, 3);
        assert_eq!(stats.cycles_completed, 0);
        assert!(sink.is_empty());
    }

    /// Store whose listing blocks long enough to stop tracking mid-cycle.
    struct SlowStore {
        inner: InMemorySightingStore,
        list_delay: Duration,
    }

    impl SightingStore for SlowStore {
        fn list_sightings_ordered_desc_by_time(&self) -> Result<Vec<Sighting>, StoreError> {
            std::thread::sleep(self.list_delay);
            self.inner.list_sightings_ordered_desc_by_time()
        }
        fn delete_sightings_older_than(&self, cutoff_ms: i64) -> Result<usize, StoreError> {
            self.inner.delete_sightings_older_than(cutoff_ms)
        }
        fn insert_sighting(&self, sighting: &Sighting) -> Result<(), StoreError> {
            self.inner.insert_sighting(sighting)
        }
        fn clear_all(&self) -> Result<(), StoreError> {
            self.inner.clear_all()
        }
        fn count(&self) -> usize {
            self.inner.count()
        }
        fn backend_name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_stop_waits_for_in_flight_cycle() {
        let store = Arc::new(SlowStore {
            inner: InMemorySightingStore::with_sightings(vec![
                Sighting::new("AA:BB:CC:DD:EE:FF", NOW - 60_000, 47.001, 8.0, "AirTag"),
                Sighting::new("AA:BB:CC:DD:EE:FF", NOW - 600_000, 47.0, 8.0, "AirTag"),
            ]),
            list_delay: Duration::from_millis(300),
        });
        let sink = Arc::new(RecordingSink::new());
        let sched = ClassificationScheduler::new(
            store,
            Arc::new(SharedPreferences::new(TrackingPreferences::new(2, 0.0, 50.0))),
            sink.clone(),
            Duration::from_secs(60),
        )
        .with_clock(Arc::new(|| NOW));

        sched.start_tracking().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sink.is_empty(), "cycle should still be listing");

        let stop_started = std::time::Instant::now();
        assert!(sched.stop_tracking().await.unwrap());
        assert!(stop_started.elapsed() >= Duration::from_millis(100));

        // The in-flight cycle finished and emitted; nothing runs afterwards
        assert_eq!(sink.len(), 1);
        assert_eq!(sched.stats().cycles_completed, 1);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sink.len(), 1);
        assert_eq!(sched.stats().cycles_completed, 1);
    }

    #[tokio::test]
    async fn test_run_once_without_tracking() {
        let (sched, _store, _sink) = scheduler(TrackingPreferences::new(2, 0.0, 0.0));
        let outcome = sched.run_once().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Completed(_)));
        assert_eq!(sched.state().await, TrackingState::Inactive);
    }
}
