//! Shared fakes for integration tests.
//!
//! Probes and metric sources that return scripted results after a scripted
//! delay, so tests never need a live Redis or PostgreSQL.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use statusboard_core::{
    DashboardConfig, DependencyId, MetricKind, MetricSample, MetricSource, MetricWindow,
    ProbeClient, ProbeError, ProbeResult,
};

/// Probe with a fixed delay and result that counts its invocations and the
/// most checks it ever saw running at once
#[derive(Debug)]
pub struct ScriptedProbe {
    pub dependency: DependencyId,
    pub delay: Duration,
    pub result: ProbeResult<()>,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl ScriptedProbe {
    pub fn healthy(dependency: DependencyId, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            dependency,
            delay: Duration::from_millis(delay_ms),
            result: Ok(()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn failing(dependency: DependencyId, delay_ms: u64, error: ProbeError) -> Arc<Self> {
        Arc::new(Self {
            dependency,
            delay: Duration::from_millis(delay_ms),
            result: Err(error),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeClient for ScriptedProbe {
    fn dependency(&self) -> DependencyId {
        self.dependency
    }

    async fn check(&self) -> ProbeResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Gauge source returning one fixed value, or a fixed error
#[derive(Debug)]
pub struct ScriptedGauge {
    pub metric: &'static str,
    pub result: ProbeResult<f64>,
}

impl ScriptedGauge {
    pub fn value(metric: &'static str, value: f64) -> Arc<Self> {
        Arc::new(Self {
            metric,
            result: Ok(value),
        })
    }

    pub fn failing(metric: &'static str, error: ProbeError) -> Arc<Self> {
        Arc::new(Self {
            metric,
            result: Err(error),
        })
    }
}

#[async_trait]
impl MetricSource for ScriptedGauge {
    fn name(&self) -> &str {
        self.metric
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    async fn sample(&self, window: MetricWindow) -> ProbeResult<Vec<MetricSample>> {
        let value = self.result.clone()?;
        Ok(vec![MetricSample::new(self.metric, value, "units", window)])
    }
}

pub fn as_probes(probes: &[Arc<ScriptedProbe>]) -> Vec<Arc<dyn ProbeClient>> {
    probes
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn ProbeClient>)
        .collect()
}

/// Default configuration with short timings suited to paused-clock tests
pub fn test_config() -> DashboardConfig {
    DashboardConfig {
        refresh_interval: Duration::from_secs(30),
        probe_timeout: Duration::from_millis(500),
        ..DashboardConfig::default()
    }
}
