//! # Synthetic Traffic Metrics
//!
//! Response-time and error-rate figures for deployments that have no request
//! telemetry wired in yet. Values are a pure function of the bucket's start
//! minute and the model seed, so the same window always yields the same
//! samples.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::f64::consts::TAU;

use super::source::{MetricKind, MetricSource};
use super::types::{MetricSample, MetricWindow, ERROR_RATE, RESPONSE_TIME, SUCCESS_RATE};
use crate::error::ProbeResult;

const MINUTES_PER_DAY: f64 = 1440.0;

/// Deterministic per-minute traffic model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficModel {
    pub seed: u64,
    /// Mean response time in milliseconds
    pub base_response_ms: f64,
    /// Amplitude of the daily response-time wave
    pub daily_swing_ms: f64,
    /// Maximum per-minute response-time noise
    pub jitter_ms: f64,
    /// Error percentage floor
    pub base_error_pct: f64,
    /// Maximum per-minute error noise
    pub error_jitter_pct: f64,
    /// Probability of an error spike in a given minute
    pub spike_probability: f64,
    /// Extra error percentage during a spike
    pub spike_pct: f64,
}

impl Default for TrafficModel {
    fn default() -> Self {
        Self {
            seed: 0x5eed_cafe,
            base_response_ms: 180.0,
            daily_swing_ms: 40.0,
            jitter_ms: 30.0,
            base_error_pct: 0.5,
            error_jitter_pct: 1.5,
            spike_probability: 0.03,
            spike_pct: 5.0,
        }
    }
}

impl TrafficModel {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn response_time_ms(&self, at: DateTime<Utc>) -> f64 {
        let minute = minute_index(at);
        let phase = (minute.rem_euclid(MINUTES_PER_DAY as i64) as f64) / MINUTES_PER_DAY;
        let wave = (phase * TAU).sin() * self.daily_swing_ms;
        let noise = self.unit(minute, 0) * self.jitter_ms;
        (self.base_response_ms + wave + noise).max(0.0)
    }

    /// Error percentage in `[0, 100]`
    pub fn error_rate_pct(&self, at: DateTime<Utc>) -> f64 {
        let minute = minute_index(at);
        let mut rate = self.base_error_pct + self.unit(minute, 1) * self.error_jitter_pct;
        if self.unit(minute, 2) < self.spike_probability {
            rate += self.spike_pct;
        }
        rate.clamp(0.0, 100.0)
    }

    /// Pseudo-random value in `[0, 1)` for a minute and stream
    fn unit(&self, minute: i64, stream: u64) -> f64 {
        let mixed = splitmix64(self.seed ^ (minute as u64) ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        (mixed >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn minute_index(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(60)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// `response_time` and `error_rate` series, one sample per bucket
#[derive(Debug, Clone, Default)]
pub struct PerformanceSeriesSource {
    model: TrafficModel,
}

impl PerformanceSeriesSource {
    pub fn new(model: TrafficModel) -> Self {
        Self { model }
    }
}

#[async_trait]
impl MetricSource for PerformanceSeriesSource {
    fn name(&self) -> &str {
        "performance_series"
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Series
    }

    async fn sample(&self, window: MetricWindow) -> ProbeResult<Vec<MetricSample>> {
        let buckets = window.buckets();
        let mut samples = Vec::with_capacity(buckets.len() * 2);
        for bucket in buckets {
            samples.push(MetricSample::new(
                RESPONSE_TIME,
                self.model.response_time_ms(bucket.start),
                "ms",
                bucket,
            ));
            samples.push(MetricSample::new(
                ERROR_RATE,
                self.model.error_rate_pct(bucket.start),
                "percent",
                bucket,
            ));
        }
        Ok(samples)
    }
}

/// `success_rate` gauge: the complement of the model's error rate
#[derive(Debug, Clone, Default)]
pub struct SuccessRateSource {
    model: TrafficModel,
}

impl SuccessRateSource {
    pub fn new(model: TrafficModel) -> Self {
        Self { model }
    }
}

#[async_trait]
impl MetricSource for SuccessRateSource {
    fn name(&self) -> &str {
        "success_rate"
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    async fn sample(&self, window: MetricWindow) -> ProbeResult<Vec<MetricSample>> {
        let rate = 100.0 - self.model.error_rate_pct(window.start);
        Ok(vec![MetricSample::new(SUCCESS_RATE, rate, "percent", window)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(minutes: u32) -> MetricWindow {
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let end = start + chrono::Duration::minutes(i64::from(minutes));
        MetricWindow::new(start, end).unwrap()
    }

    #[test]
    fn test_model_is_deterministic() {
        let model = TrafficModel::default();
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 17, 0).unwrap();
        assert_eq!(model.response_time_ms(at), model.response_time_ms(at));
        assert_eq!(model.error_rate_pct(at), model.error_rate_pct(at));

        // Seconds within the same minute map to the same bucket value
        let later = Utc.with_ymd_and_hms(2026, 5, 1, 8, 17, 59).unwrap();
        assert_eq!(model.response_time_ms(at), model.response_time_ms(later));
    }

    #[test]
    fn test_seed_changes_values() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 17, 0).unwrap();
        let a = TrafficModel::with_seed(1);
        let b = TrafficModel::with_seed(2);
        assert_ne!(a.response_time_ms(at), b.response_time_ms(at));
    }

    #[test]
    fn test_model_bounds() {
        let model = TrafficModel::default();
        for bucket in window(1440).buckets() {
            let rt = model.response_time_ms(bucket.start);
            let err = model.error_rate_pct(bucket.start);
            assert!(rt >= 0.0);
            assert!((0.0..=100.0).contains(&err));
        }
    }

    #[tokio::test]
    async fn test_series_source_emits_two_samples_per_bucket() {
        let source = PerformanceSeriesSource::default();
        let samples = source.sample(window(60)).await.unwrap();
        assert_eq!(samples.len(), 120);
        assert_eq!(samples.iter().filter(|s| s.name == RESPONSE_TIME).count(), 60);
        assert_eq!(samples.iter().filter(|s| s.name == ERROR_RATE).count(), 60);
    }

    #[tokio::test]
    async fn test_series_source_is_reproducible() {
        let source = PerformanceSeriesSource::default();
        let first = source.sample(window(10)).await.unwrap();
        let second = source.sample(window(10)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_success_rate_complements_error_rate() {
        let model = TrafficModel::default();
        let source = SuccessRateSource::new(model);
        let w = window(1);
        let samples = source.sample(w).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, SUCCESS_RATE);
        assert!((samples[0].value + model.error_rate_pct(w.start) - 100.0).abs() < 1e-9);
    }
}
