//! Metrics Aggregation Tests
//!
//! Scalar presence/absence, clamping and the series invariant across the
//! aggregator and the built-in synthetic sources.

mod common;

use chrono::{DateTime, TimeZone, Utc};
use common::ScriptedGauge;
use proptest::prelude::*;
use statusboard_core::error::CONNECTION_REFUSED;
use statusboard_core::metrics::{ACTIVE_USERS, ERROR_RATE, RESPONSE_TIME, SUCCESS_RATE};
use statusboard_core::{
    MetricSource, MetricWindow, MetricsAggregator, PerformanceSeriesSource, ProbeError,
    SuccessRateSource, TrafficModel,
};
use std::sync::Arc;
use std::time::Duration;

fn hour_window() -> MetricWindow {
    let now = Utc.with_ymd_and_hms(2026, 9, 14, 15, 42, 17).unwrap();
    MetricWindow::trailing(now, Duration::from_secs(3600)).unwrap()
}

fn aggregator(sources: Vec<Arc<dyn MetricSource>>) -> MetricsAggregator {
    MetricsAggregator::new(sources, Duration::from_secs(1))
}

#[tokio::test]
async fn active_users_reflects_source() {
    let snapshot = aggregator(vec![ScriptedGauge::value(ACTIVE_USERS, 42.0)])
        .refresh(hour_window())
        .await;

    assert_eq!(snapshot.scalar(ACTIVE_USERS), Some(42.0));
}

#[tokio::test]
async fn failed_source_leaves_metric_absent() {
    let snapshot = aggregator(vec![
        ScriptedGauge::failing(ACTIVE_USERS, ProbeError::connection(CONNECTION_REFUSED)),
        Arc::new(SuccessRateSource::default()),
    ])
    .refresh(hour_window())
    .await;

    assert_eq!(snapshot.scalar(ACTIVE_USERS), None);
    assert!(!snapshot.scalars.contains_key(ACTIVE_USERS));
    assert!(snapshot.scalar(SUCCESS_RATE).is_some());
}

#[tokio::test]
async fn success_rate_stays_within_percent_bounds() {
    let spiky = TrafficModel {
        base_error_pct: 150.0,
        ..TrafficModel::default()
    };
    let snapshot = aggregator(vec![Arc::new(SuccessRateSource::new(spiky))])
        .refresh(hour_window())
        .await;

    let rate = snapshot.scalar(SUCCESS_RATE).unwrap();
    assert!((0.0..=100.0).contains(&rate));
}

#[tokio::test]
async fn default_sources_fill_one_hour_of_buckets() {
    let window = hour_window();
    let snapshot = aggregator(vec![
        Arc::new(PerformanceSeriesSource::default()),
        Arc::new(SuccessRateSource::default()),
    ])
    .refresh(window)
    .await;

    for name in [RESPONSE_TIME, ERROR_RATE] {
        let series = snapshot.series(name).unwrap();
        assert_eq!(series.len(), 60);
        assert_eq!(series.first().unwrap().window.start, window.start);
        assert_eq!(series.last().unwrap().window.end, window.end);
    }
    assert_eq!(snapshot.window, Some(window));
    assert!(snapshot.series_are_well_formed());
}

#[tokio::test]
async fn success_rate_matches_latest_error_bucket() {
    let window = hour_window();
    let snapshot = aggregator(vec![
        Arc::new(PerformanceSeriesSource::default()),
        Arc::new(SuccessRateSource::default()),
    ])
    .refresh(window)
    .await;

    let latest_error = snapshot.series(ERROR_RATE).unwrap().last().unwrap().value;
    let success = snapshot.scalar(SUCCESS_RATE).unwrap();
    assert!((success + latest_error - 100.0).abs() < 1e-9);
}

fn window_strategy() -> impl Strategy<Value = (DateTime<Utc>, u32)> {
    // Any second across ten years, any series length up to a day
    (0i64..315_360_000, 1u32..=1440).prop_map(|(offset, minutes)| {
        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        (base + chrono::Duration::seconds(offset), minutes)
    })
}

proptest! {
    /// Property: aggregated series are strictly ordered and gap-free for any trailing window
    #[test]
    fn series_are_ordered_and_contiguous((now, minutes) in window_strategy(), seed in any::<u64>()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let window = MetricWindow::trailing(now, Duration::from_secs(60) * minutes).unwrap();
        let sources: Vec<Arc<dyn MetricSource>> =
            vec![Arc::new(PerformanceSeriesSource::new(TrafficModel::with_seed(seed)))];

        let snapshot = runtime.block_on(aggregator(sources).refresh(window));
        let series = snapshot.series(RESPONSE_TIME).unwrap();

        prop_assert_eq!(series.len(), minutes as usize);
        for pair in series.windows(2) {
            prop_assert!(pair[0].window.start < pair[1].window.start);
            prop_assert_eq!(pair[0].window.end, pair[1].window.start);
        }
        prop_assert!(snapshot.series_are_well_formed());
    }

    /// Property: buckets never extend past either edge of the window
    #[test]
    fn buckets_stay_inside_window((start, minutes) in window_strategy(), extra in 0i64..120) {
        let end = start + chrono::Duration::minutes(i64::from(minutes)) + chrono::Duration::seconds(extra);
        let window = MetricWindow::new(start, end).unwrap();
        for bucket in window.buckets() {
            prop_assert!(bucket.start >= window.start);
            prop_assert!(bucket.end <= window.end);
            prop_assert!(bucket.is_bucket_aligned());
        }
    }
}
