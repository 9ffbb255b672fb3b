//! # Metrics Module
//!
//! Business metrics for the dashboard: scalar gauges (`active_users`,
//! `success_rate`) and one-minute bucketed series (`response_time`,
//! `error_rate`) over a trailing window.

pub mod active_sessions;
pub mod aggregator;
pub mod source;
pub mod synthetic;
pub mod types;

pub use active_sessions::ActiveSessionsSource;
pub use aggregator::MetricsAggregator;
pub use source::{MetricKind, MetricSource};
pub use synthetic::{PerformanceSeriesSource, SuccessRateSource, TrafficModel};
pub use types::{
    MetricSample, MetricWindow, MetricsSnapshot, ACTIVE_USERS, ERROR_RATE, RESPONSE_TIME,
    SUCCESS_RATE,
};
