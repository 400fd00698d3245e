//! Periodic expiry scan over the record store.
//!
//! [`ExpiryScheduler`] owns a [`BackgroundWorker`] running an [`ExpiryScanner`]:
//! one scan when the worker starts, one per tick, and one per on-demand request.
//! Lifecycle: `Stopped -> Idle <-> Scanning`, and `stop()` returns to `Stopped`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use policykeeper_core::ExpiryNotification;
use serde::Serialize;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use super::sink::NotificationSink;
use super::worker::{BackgroundRunnable, BackgroundWorker};
use crate::storage::RecordStore;

/// Default time between periodic scans.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Stopped,
    Idle,
    Scanning,
}

/// What one scan found and delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Horizons evaluated, in order.
    pub horizons: Vec<u32>,
    /// One event per horizon with at least one match.
    pub events: Vec<ExpiryNotification>,
    /// Events the sink rejected.
    pub delivery_failures: usize,
}

/// Evaluates every configured horizon and hands each non-empty result to `sink`.
///
/// Horizons are evaluated independently: a record inside several horizons
/// appears in each of their events.
pub fn run_scan(store: &RecordStore, sink: &dyn NotificationSink) -> ScanReport {
    let started = Instant::now();
    let horizons = store.settings().horizons();
    let mut events = Vec::new();
    let mut delivery_failures = 0;

    for &days in &horizons {
        let matches = store.filter_by_end_date(i64::from(days));
        let Some(event) = ExpiryNotification::from_matches(days, &matches) else {
            continue;
        };
        if let Err(e) = sink.notify(&event) {
            warn!(horizon_days = days, error = %e, "expiry notification not delivered");
            delivery_failures += 1;
        }
        events.push(event);
    }

    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = started.elapsed().as_millis() as u64;
    info!(
        horizons = ?horizons,
        events = events.len(),
        delivery_failures,
        duration_ms,
        "expiry scan complete"
    );

    ScanReport {
        horizons,
        events,
        delivery_failures,
    }
}

// ---------------------------------------------------------------------------
// ExpiryScanner
// ---------------------------------------------------------------------------

/// Work items accepted by the scan worker.
#[derive(Debug)]
pub enum ScanTask {
    /// Scan now; the report goes to `reply` when present.
    ScanNow {
        reply: Option<oneshot::Sender<ScanReport>>,
    },
}

/// [`BackgroundRunnable`] that performs scans and tracks the scheduler state.
pub struct ExpiryScanner {
    store: Arc<RecordStore>,
    sink: Arc<dyn NotificationSink>,
    state: Arc<ArcSwap<SchedulerState>>,
}

impl ExpiryScanner {
    fn scan(&self) -> ScanReport {
        self.state.store(Arc::new(SchedulerState::Scanning));
        let report = run_scan(&self.store, self.sink.as_ref());
        self.state.store(Arc::new(SchedulerState::Idle));
        report
    }
}

#[async_trait]
impl BackgroundRunnable for ExpiryScanner {
    type Task = ScanTask;

    async fn run(&mut self, task: ScanTask) {
        match task {
            ScanTask::ScanNow { reply } => {
                let report = self.scan();
                if let Some(reply) = reply {
                    // The requester may have gone away.
                    let _ = reply.send(report);
                }
            }
        }
    }

    async fn on_start(&mut self) {
        self.scan();
    }

    async fn on_tick(&mut self) {
        self.scan();
    }

    async fn shutdown(&mut self) {
        debug!("expiry scanner shut down");
    }
}

// ---------------------------------------------------------------------------
// ExpiryScheduler
// ---------------------------------------------------------------------------

/// Starts, stops and triggers the periodic expiry scan.
pub struct ExpiryScheduler {
    store: Arc<RecordStore>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
    state: Arc<ArcSwap<SchedulerState>>,
    worker: Mutex<Option<BackgroundWorker<ExpiryScanner>>>,
}

impl ExpiryScheduler {
    /// Creates a stopped scheduler. `interval` must be non-zero.
    #[must_use]
    pub fn new(store: Arc<RecordStore>, sink: Arc<dyn NotificationSink>, interval: Duration) -> Self {
        Self {
            store,
            sink,
            interval,
            state: Arc::new(ArcSwap::from_pointee(SchedulerState::Stopped)),
            worker: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        **self.state.load()
    }

    /// Starts the worker: one scan right away, then one per interval.
    ///
    /// Returns `false` if it was already running; no second timer is created.
    pub async fn start(&self) -> bool {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return false;
        }
        self.state.store(Arc::new(SchedulerState::Idle));
        let scanner = ExpiryScanner {
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
        };
        *worker = Some(BackgroundWorker::start(scanner, self.interval));
        info!(interval_secs = self.interval.as_secs(), "expiry scheduler started");
        true
    }

    /// Stops the worker and waits for it to exit. A scan in progress
    /// completes; none starts afterwards.
    ///
    /// Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        let mut worker = self.worker.lock().await;
        let Some(mut running) = worker.take() else {
            return false;
        };
        running.stop().await;
        self.state.store(Arc::new(SchedulerState::Stopped));
        info!("expiry scheduler stopped");
        true
    }

    /// Runs one extra scan and returns its report.
    ///
    /// Queued on the worker when running, otherwise run on the caller's task.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker shut down before the scan ran.
    pub async fn trigger_scan_now(&self) -> anyhow::Result<ScanReport> {
        let rx = {
            let worker = self.worker.lock().await;
            match worker.as_ref() {
                Some(running) => {
                    let (tx, rx) = oneshot::channel();
                    running.submit(ScanTask::ScanNow { reply: Some(tx) }).await?;
                    rx
                }
                None => return Ok(run_scan(&self.store, self.sink.as_ref())),
            }
        };
        rx.await
            .map_err(|_| anyhow::anyhow!("scheduler stopped before the scan ran"))
    }
}
