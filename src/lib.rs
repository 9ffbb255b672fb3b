#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, Redis in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Statusboard Core
//!
//! Health-aggregation and periodic-refresh engine for an operational status
//! dashboard.
//!
//! ## Overview
//!
//! The core probes a small set of backend dependencies (a Redis cache and a
//! PostgreSQL database), derives a handful of usage and performance metrics,
//! and publishes both as consistent, timestamped snapshots. Rendering is left
//! to whatever presentation layer reads from the [`SnapshotStore`].
//!
//! ## Module Organization
//!
//! - [`health`] - Probes, per-dependency outcomes and the health aggregator
//! - [`metrics`] - Metric sources, bucketed windows and the metrics aggregator
//! - [`scheduler`] - Timer and manual refresh with overlap dropping
//! - [`store`] - Latest snapshots with atomic replacement and subscriptions
//! - [`dashboard`] - Bootstrap facade exposing the presentation boundary
//! - [`config`] - Environment configuration
//! - [`error`] - Probe-level and crate-level error types
//! - [`logging`] - Structured console logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use statusboard_core::{DashboardConfig, DashboardCore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # tokio_test::block_on(async {
//! let core = DashboardCore::bootstrap(DashboardConfig::from_env()?)?;
//! let handle = core.start();
//!
//! let mut versions = core.subscribe();
//! versions.changed().await?;
//! println!("{}", core.current_health().overall_status());
//!
//! handle.shutdown().await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # })
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests, no live Redis or PostgreSQL required
//! ```

pub mod config;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod store;

pub use config::{DashboardConfig, DatabaseConfig, RedisConfig};
pub use dashboard::DashboardCore;
pub use error::{
    DashboardError, DashboardResult, ProbeError, ProbeFailureKind, ProbeResult,
};
pub use health::{
    CacheProbe, DatabaseProbe, DependencyId, HealthAggregator, HealthSnapshot, HealthStatus,
    HealthSummary, ProbeClient, ProbeOutcome,
};
pub use metrics::{
    ActiveSessionsSource, MetricKind, MetricSample, MetricSource, MetricWindow,
    MetricsAggregator, MetricsSnapshot, PerformanceSeriesSource, SuccessRateSource, TrafficModel,
};
pub use scheduler::{
    Scheduler, SchedulerConfig, SchedulerHandle, SchedulerState, SchedulerStats, TickOutcome,
    TickTrigger,
};
pub use store::SnapshotStore;
