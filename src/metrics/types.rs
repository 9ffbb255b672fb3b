//! # Metric Types
//!
//! Windows, samples and the aggregated metrics snapshot.

use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::BUCKET_WIDTH;
use crate::error::{DashboardError, DashboardResult};

/// Scalar: sessions currently in the active set
pub const ACTIVE_USERS: &str = "active_users";
/// Scalar: percentage of successful requests, always within `[0, 100]`
pub const SUCCESS_RATE: &str = "success_rate";
/// Series: mean response time per bucket
pub const RESPONSE_TIME: &str = "response_time";
/// Series: error percentage per bucket
pub const ERROR_RATE: &str = "error_rate";

/// Closed time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MetricWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DashboardResult<Self> {
        if start > end {
            return Err(DashboardError::InvalidWindow(format!(
                "start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `span` ending at `now` floored to the bucket grid.
    pub fn trailing(now: DateTime<Utc>, span: Duration) -> DashboardResult<Self> {
        let bucket = bucket_width()?;
        let end = now
            .duration_trunc(bucket)
            .map_err(|e| DashboardError::InvalidWindow(format!("cannot align {now}: {e}")))?;
        let span = ChronoDuration::from_std(span)
            .map_err(|e| DashboardError::InvalidWindow(format!("span out of range: {e}")))?;
        let start = end
            .checked_sub_signed(span)
            .ok_or_else(|| DashboardError::InvalidWindow("span underflows the calendar".into()))?;
        Self::new(start, end)
    }

    pub fn duration(&self) -> ChronoDuration {
        self.end - self.start
    }

    /// Whether both edges sit on the bucket grid and the window spans at least one bucket.
    pub fn is_bucket_aligned(&self) -> bool {
        let Ok(bucket) = bucket_width() else {
            return false;
        };
        self.start.duration_trunc(bucket).ok() == Some(self.start)
            && self.end.duration_trunc(bucket).ok() == Some(self.end)
            && self.end > self.start
    }

    /// The final bucket of this window
    pub fn last_bucket(&self) -> DashboardResult<Self> {
        let bucket = bucket_width()?;
        let start = (self.end - bucket).max(self.start);
        Self::new(start, self.end)
    }

    /// Consecutive, non-overlapping one-minute buckets on the minute grid
    /// inside the window.
    ///
    /// Partial buckets at either edge are not produced.
    pub fn buckets(&self) -> Vec<MetricWindow> {
        let Ok(bucket) = bucket_width() else {
            return Vec::new();
        };
        let Ok(mut start) = self.start.duration_trunc(bucket) else {
            return Vec::new();
        };
        if start < self.start {
            start += bucket;
        }
        let mut buckets = Vec::new();
        while start + bucket <= self.end {
            buckets.push(MetricWindow {
                start,
                end: start + bucket,
            });
            start += bucket;
        }
        buckets
    }
}

fn bucket_width() -> DashboardResult<ChronoDuration> {
    ChronoDuration::from_std(BUCKET_WIDTH)
        .map_err(|e| DashboardError::InvalidWindow(format!("bucket width out of range: {e}")))
}

/// One measured value over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub window: MetricWindow,
}

impl MetricSample {
    pub fn new(
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        window: MetricWindow,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            window,
        }
    }
}

/// Scalar gauges and bucketed series as of one tick
///
/// Every series is ordered by `window.start`, non-overlapping, gap-free and
/// made of one-minute buckets. A metric whose source failed is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub scalars: BTreeMap<String, MetricSample>,
    pub series: BTreeMap<String, Vec<MetricSample>>,
    /// Window the series were requested for, `None` before the first tick
    pub window: Option<MetricWindow>,
    pub generated_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Snapshot with no metrics, used before the first tick
    pub fn empty() -> Self {
        Self {
            scalars: BTreeMap::new(),
            series: BTreeMap::new(),
            window: None,
            generated_at: Utc::now(),
        }
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).map(|sample| sample.value)
    }

    pub fn series(&self, name: &str) -> Option<&[MetricSample]> {
        self.series.get(name).map(Vec::as_slice)
    }

    /// Check the series invariant for every series
    pub fn series_are_well_formed(&self) -> bool {
        self.series
            .values()
            .all(|samples| check_series(samples).is_ok())
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Validate that `samples` (already sorted) form a contiguous run of buckets.
pub(crate) fn check_series(samples: &[MetricSample]) -> Result<(), String> {
    let bucket = bucket_width().map_err(|e| e.to_string())?;
    for sample in samples {
        if !sample.window.is_bucket_aligned() || sample.window.duration() != bucket {
            return Err(format!(
                "sample at {} is not a one-minute bucket",
                sample.window.start.to_rfc3339()
            ));
        }
    }
    for pair in samples.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.window.start < prev.window.end {
            return Err(format!(
                "buckets overlap at {}",
                next.window.start.to_rfc3339()
            ));
        }
        if next.window.start > prev.window.end {
            return Err(format!("gap after {}", prev.window.end.to_rfc3339()));
        }
    }
    Ok(())
}
