//! # Refresh Scheduler
//!
//! Drives periodic and on-demand refreshes of both aggregators and publishes
//! the results into the [`SnapshotStore`].
//!
//! ```text
//!   timer / manual
//!        │
//!        ▼
//!     ┌──────┐  CAS   ┌────────────┐  publish  ┌───────────┐
//!     │ Idle │ ─────▶ │ Refreshing │ ────────▶ │ Published │
//!     └──────┘        └────────────┘           └─────┬─────┘
//!        ▲                  │ tick error             │
//!        └──────────────────┴────────────────────────┘
//! ```
//!
//! A tick that finds the scheduler anywhere but `Idle` is dropped; it never
//! cancels the refresh already in flight.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::health::HealthAggregator;
use crate::logging::{log_error, log_tick};
use crate::metrics::{MetricWindow, MetricsAggregator};
use crate::store::SnapshotStore;

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Refreshing = 1,
    Published = 2,
}

impl SchedulerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Refreshing,
            2 => Self::Published,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Refreshing => write!(f, "refreshing"),
            Self::Published => write!(f, "published"),
        }
    }
}

/// What started a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickTrigger {
    Timer,
    Manual,
}

impl fmt::Display for TickTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer => write!(f, "timer"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// How a tick ended
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Both snapshots were published under this store version
    Published { version: u64 },
    /// Another refresh was in progress; nothing ran
    Dropped,
    /// The refresh failed; the previous snapshots remain current
    Failed(DashboardError),
}

impl TickOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Published { .. } => "published",
            Self::Dropped => "dropped",
            Self::Failed(_) => "failed",
        }
    }
}

/// Point-in-time copy of the scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub ticks_started: u64,
    pub ticks_dropped: u64,
    pub ticks_failed: u64,
    pub ticks_published: u64,
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    published: AtomicU64,
}

/// Timing parameters for the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Interval between timer ticks
    pub interval: Duration,
    /// Trailing window handed to the metrics aggregator
    pub series_span: Duration,
}

impl From<&DashboardConfig> for SchedulerConfig {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            interval: config.refresh_interval,
            series_span: config.series_span(),
        }
    }
}

#[derive(Debug)]
struct SchedulerInner {
    health: HealthAggregator,
    metrics: MetricsAggregator,
    store: SnapshotStore,
    config: SchedulerConfig,
    state: AtomicU8,
    counters: Counters,
}

impl SchedulerInner {
    async fn execute_tick(&self, trigger: TickTrigger) -> TickOutcome {
        let start = Instant::now();

        let outcome = match self.refresh_and_publish().await {
            Ok(version) => {
                self.state
                    .store(SchedulerState::Published as u8, Ordering::Release);
                self.counters.published.fetch_add(1, Ordering::Relaxed);
                TickOutcome::Published { version }
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log_error(
                    "scheduler",
                    "run_tick",
                    &e.to_string(),
                    Some("previous snapshots kept"),
                );
                TickOutcome::Failed(e)
            }
        };

        let version = match &outcome {
            TickOutcome::Published { version } => Some(*version),
            _ => None,
        };
        log_tick(
            &trigger.to_string(),
            outcome.label(),
            start.elapsed().as_millis() as u64,
            version,
        );

        outcome
    }

    async fn refresh_and_publish(&self) -> DashboardResult<u64> {
        let window = MetricWindow::trailing(Utc::now(), self.config.series_span)?;

        let (health, metrics) = tokio::join!(self.health.refresh(), self.metrics.refresh(window));

        if !health.is_complete() {
            return Err(DashboardError::SchedulerTickError(
                "health snapshot is missing dependencies".to_string(),
            ));
        }
        if !metrics.series_are_well_formed() {
            return Err(DashboardError::SchedulerTickError(
                "metrics snapshot has a malformed series".to_string(),
            ));
        }

        Ok(self.store.publish(health, metrics))
    }
}

/// Periodic and on-demand refresh driver
///
/// Cloning is cheap; clones share state, so a tick started from one clone
/// blocks ticks from every other.
#[derive(Debug, Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

/// Returns the scheduler to `Idle` when the refresh task ends, whether it
/// published, failed or panicked.
struct IdleOnDrop(Arc<SchedulerInner>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        self.0
            .state
            .store(SchedulerState::Idle as u8, Ordering::Release);
    }
}

impl Scheduler {
    pub fn new(
        health: HealthAggregator,
        metrics: MetricsAggregator,
        store: SnapshotStore,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                health,
                metrics,
                store,
                config,
                state: AtomicU8::new(SchedulerState::Idle as u8),
                counters: Counters::default(),
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> SchedulerStats {
        let c = &self.inner.counters;
        SchedulerStats {
            ticks_started: c.started.load(Ordering::Relaxed),
            ticks_dropped: c.dropped.load(Ordering::Relaxed),
            ticks_failed: c.failed.load(Ordering::Relaxed),
            ticks_published: c.published.load(Ordering::Relaxed),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.inner.store
    }

    /// Run one refresh now, unless one is already running.
    pub async fn trigger_refresh(&self) -> TickOutcome {
        self.run_tick(TickTrigger::Manual).await
    }

    /// Run a single tick: refresh both aggregators and publish.
    ///
    /// The refresh runs in its own task that holds the `Refreshing` state
    /// until it finishes. Dropping the returned future detaches that task;
    /// it still publishes, and ticks arriving meanwhile are dropped.
    pub async fn run_tick(&self, trigger: TickTrigger) -> TickOutcome {
        let claimed = self.inner.state.compare_exchange(
            SchedulerState::Idle as u8,
            SchedulerState::Refreshing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if let Err(current) = claimed {
            self.inner.counters.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(
                trigger = %trigger,
                state = %SchedulerState::from_u8(current),
                "Tick dropped, refresh already in progress"
            );
            return TickOutcome::Dropped;
        }

        self.inner.counters.started.fetch_add(1, Ordering::Relaxed);
        let idle = IdleOnDrop(Arc::clone(&self.inner));
        let refresh = tokio::spawn(async move {
            let inner = Arc::clone(&idle.0);
            let outcome = inner.execute_tick(trigger).await;
            drop(idle);
            outcome
        });

        match refresh.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let e = DashboardError::SchedulerTickError(format!("refresh task failed: {e}"));
                self.inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                log_error(
                    "scheduler",
                    "run_tick",
                    &e.to_string(),
                    Some("previous snapshots kept"),
                );
                TickOutcome::Failed(e)
            }
        }
    }

    /// Start the timer loop in the background.
    ///
    /// The first tick fires immediately. Each timer tick runs in its own task,
    /// so a slow refresh makes the following ticks drop instead of queueing.
    pub fn spawn(&self) -> SchedulerHandle {
        let (shutdown_sender, mut shutdown_receiver) = oneshot::channel::<()>();
        let scheduler = self.clone();
        let interval = self.inner.config.interval;

        info!(
            interval_ms = interval.as_millis() as u64,
            series_span_secs = self.inner.config.series_span.as_secs(),
            "Starting refresh scheduler"
        );

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut shutdown_receiver => {
                        info!("Refresh scheduler stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let tick = scheduler.clone();
                        tokio::spawn(async move {
                            tick.run_tick(TickTrigger::Timer).await;
                        });
                    }
                }
            }
        });

        SchedulerHandle {
            shutdown_sender: Some(shutdown_sender),
            join: Some(join),
        }
    }
}

/// Handle to a running timer loop
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_sender: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        self.shutdown_sender.is_some()
    }

    /// Signal the timer loop to stop. A tick already in flight finishes.
    pub fn stop(&mut self) -> DashboardResult<()> {
        match self.shutdown_sender.take() {
            Some(sender) => {
                sender.send(()).map_err(|_| {
                    DashboardError::Internal("Failed to send scheduler shutdown signal".to_string())
                })?;
                info!("Refresh scheduler shutdown requested");
                Ok(())
            }
            None => {
                warn!("Refresh scheduler already stopped");
                Ok(())
            }
        }
    }

    /// Stop the timer loop and wait for it to exit.
    pub async fn shutdown(mut self) -> DashboardResult<()> {
        self.stop()?;
        if let Some(join) = self.join.take() {
            join.await.map_err(|e| {
                DashboardError::Internal(format!("Scheduler loop terminated abnormally: {e}"))
            })?;
        }
        Ok(())
    }
}
