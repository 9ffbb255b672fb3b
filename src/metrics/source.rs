//! # Metric Source
//!
//! A metric source turns a time window into samples. Sources may read a
//! dependency opportunistically; failures are returned as [`ProbeError`] and
//! the aggregator downgrades them to "no samples".
//!
//! [`ProbeError`]: crate::error::ProbeError

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{MetricSample, MetricWindow};
use crate::error::ProbeResult;

/// How the aggregator treats a source's samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Point-in-time value, sampled over the most recent bucket
    Gauge,
    /// One sample per bucket over the trailing window
    Series,
}

#[async_trait]
pub trait MetricSource: Send + Sync + std::fmt::Debug {
    /// Source name used in logs
    fn name(&self) -> &str;

    fn kind(&self) -> MetricKind;

    async fn sample(&self, window: MetricWindow) -> ProbeResult<Vec<MetricSample>>;
}
