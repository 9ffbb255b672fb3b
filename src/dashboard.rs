//! # Dashboard Core
//!
//! Bootstrap facade: wires configuration into probes, metric sources,
//! aggregators, the scheduler and the snapshot store, and exposes the
//! boundary the presentation layer talks to.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::health::{CacheProbe, DatabaseProbe, HealthAggregator, HealthSnapshot, ProbeClient};
use crate::metrics::{
    ActiveSessionsSource, MetricSource, MetricsAggregator, MetricsSnapshot,
    PerformanceSeriesSource, SuccessRateSource, TrafficModel,
};
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerHandle, SchedulerStats, TickOutcome};
use crate::store::SnapshotStore;

/// Fully wired dashboard engine
#[derive(Debug, Clone)]
pub struct DashboardCore {
    config: Arc<DashboardConfig>,
    store: SnapshotStore,
    scheduler: Scheduler,
}

impl DashboardCore {
    /// Build the engine with the Redis and PostgreSQL backed probes and sources.
    ///
    /// Nothing connects here; connections are opened per probe on each tick.
    pub fn bootstrap(config: DashboardConfig) -> DashboardResult<Self> {
        config.validate()?;

        info!(config = %config.sanitized(), "Bootstrapping dashboard core");

        let cache_probe = CacheProbe::from_config(&config.redis)
            .map_err(|e| DashboardError::ConfigurationError(e.detail()))?;
        let database_probe = DatabaseProbe::from_config(&config.database);
        let active_sessions = ActiveSessionsSource::from_config(&config.redis)
            .map_err(|e| DashboardError::ConfigurationError(e.detail()))?;

        let model = TrafficModel::default();
        let probes: Vec<Arc<dyn ProbeClient>> = vec![Arc::new(cache_probe), Arc::new(database_probe)];
        let sources: Vec<Arc<dyn MetricSource>> = vec![
            Arc::new(active_sessions),
            Arc::new(SuccessRateSource::new(model)),
            Arc::new(PerformanceSeriesSource::new(model)),
        ];

        Self::with_components(config, probes, sources)
    }

    /// Build the engine around caller-supplied probes and sources.
    pub fn with_components(
        config: DashboardConfig,
        probes: Vec<Arc<dyn ProbeClient>>,
        sources: Vec<Arc<dyn MetricSource>>,
    ) -> DashboardResult<Self> {
        config.validate()?;

        let store = SnapshotStore::new();
        let scheduler = Scheduler::new(
            HealthAggregator::new(probes, config.probe_timeout),
            MetricsAggregator::new(sources, config.probe_timeout),
            store.clone(),
            SchedulerConfig::from(&config),
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            scheduler,
        })
    }

    /// Start periodic refreshes. The first refresh runs immediately.
    pub fn start(&self) -> SchedulerHandle {
        self.scheduler.spawn()
    }

    pub fn current_health(&self) -> Arc<HealthSnapshot> {
        self.store.current_health()
    }

    pub fn current_metrics(&self) -> Arc<MetricsSnapshot> {
        self.store.current_metrics()
    }

    /// Refresh now. Dropped if a refresh is already running.
    pub async fn trigger_refresh(&self) -> TickOutcome {
        self.scheduler.trigger_refresh().await
    }

    /// Version channel that changes on every publish
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    /// Whether the published snapshots are older than the configured threshold
    pub fn is_stale(&self) -> bool {
        self.store.is_stale(self.config.stale_after)
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }
}
