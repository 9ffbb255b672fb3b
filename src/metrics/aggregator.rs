//! # Metrics Aggregator
//!
//! Same fan-out / isolate / collect discipline as the health aggregator:
//! every source runs in its own bounded task, and a source that errors,
//! times out or panics contributes nothing rather than failing the snapshot.

use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::source::{MetricKind, MetricSource};
use super::types::{check_series, MetricSample, MetricWindow, MetricsSnapshot, SUCCESS_RATE};
use crate::error::{ProbeError, ProbeResult};

/// Slack on top of the source timeout before a sampling task is abandoned.
pub const SOURCE_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    sources: Vec<Arc<dyn MetricSource>>,
    source_timeout: Duration,
}

impl MetricsAggregator {
    pub fn new(sources: Vec<Arc<dyn MetricSource>>, source_timeout: Duration) -> Self {
        Self {
            sources,
            source_timeout,
        }
    }

    /// Sample every source concurrently and build a snapshot.
    ///
    /// Gauges are sampled over the last bucket of `window`, series over all of it.
    pub async fn refresh(&self, window: MetricWindow) -> MetricsSnapshot {
        let gauge_window = window.last_bucket().unwrap_or(window);

        debug!(
            sources = self.sources.len(),
            window_start = %window.start,
            window_end = %window.end,
            "Starting metrics refresh"
        );

        let pending = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let timeout = self.source_timeout;
            let requested = match source.kind() {
                MetricKind::Gauge => gauge_window,
                MetricKind::Series => window,
            };

            async move {
                let kind = source.kind();
                let name = source.name().to_string();
                let task = tokio::spawn(async move {
                    tokio::time::timeout(timeout, source.sample(requested)).await
                });
                let abort = task.abort_handle();

                let result: ProbeResult<Vec<MetricSample>> =
                    match tokio::time::timeout(timeout + SOURCE_GRACE, task).await {
                        Ok(Ok(Ok(sampled))) => sampled,
                        Ok(Ok(Err(_elapsed))) => Err(ProbeError::Timeout(timeout)),
                        Ok(Err(join_error)) => Err(ProbeError::protocol(format!(
                            "metric task failed: {join_error}"
                        ))),
                        Err(_elapsed) => {
                            abort.abort();
                            Err(ProbeError::Timeout(timeout))
                        }
                    };

                (name, kind, result)
            }
        });

        let mut scalars: BTreeMap<String, MetricSample> = BTreeMap::new();
        let mut grouped: BTreeMap<String, Vec<MetricSample>> = BTreeMap::new();

        for (source, kind, result) in join_all(pending).await {
            let samples = match result {
                Ok(samples) => samples,
                Err(e) => {
                    warn!(
                        source = %source,
                        failure = %e.kind(),
                        error = %e.detail(),
                        "Metric source failed, metric omitted"
                    );
                    continue;
                }
            };

            match kind {
                MetricKind::Gauge => {
                    for sample in samples {
                        merge_scalar(&mut scalars, sample);
                    }
                }
                MetricKind::Series => {
                    for sample in samples {
                        grouped.entry(sample.name.clone()).or_default().push(sample);
                    }
                }
            }
        }

        if let Some(rate) = scalars.get_mut(SUCCESS_RATE) {
            rate.value = clamp_percent(rate.value);
        }

        let series = grouped
            .into_iter()
            .filter_map(|(name, samples)| match normalize_series(samples, &window) {
                Ok(samples) => Some((name, samples)),
                Err(e) => {
                    warn!(
                        series = %name,
                        failure = %e.kind(),
                        error = %e.detail(),
                        "Malformed series omitted"
                    );
                    None
                }
            })
            .collect();

        let snapshot = MetricsSnapshot {
            scalars,
            series,
            window: Some(window),
            generated_at: Utc::now(),
        };

        debug!(
            scalars = snapshot.scalars.len(),
            series = snapshot.series.len(),
            "Metrics refresh complete"
        );

        snapshot
    }
}

/// Keep the most recent sample per gauge name
fn merge_scalar(scalars: &mut BTreeMap<String, MetricSample>, sample: MetricSample) {
    if !sample.value.is_finite() {
        warn!(metric = %sample.name, "Non-finite gauge value dropped");
        return;
    }
    match scalars.get(&sample.name) {
        Some(existing) if existing.window.end > sample.window.end => {}
        _ => {
            scalars.insert(sample.name.clone(), sample);
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Sort a series by bucket start and check it covers its buckets without
/// gaps or overlaps inside the requested window.
fn normalize_series(
    mut samples: Vec<MetricSample>,
    window: &MetricWindow,
) -> ProbeResult<Vec<MetricSample>> {
    if let Some(outside) = samples
        .iter()
        .find(|s| s.window.start < window.start || s.window.end > window.end)
    {
        return Err(ProbeError::protocol(format!(
            "bucket at {} lies outside the requested window",
            outside.window.start.to_rfc3339()
        )));
    }
    if samples.iter().any(|s| !s.value.is_finite()) {
        return Err(ProbeError::protocol("series contains a non-finite value"));
    }

    samples.sort_by_key(|s| s.window.start);
    check_series(&samples).map_err(ProbeError::protocol)?;
    Ok(samples)
}
