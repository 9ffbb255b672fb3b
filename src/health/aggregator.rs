//! # Health Aggregator
//!
//! Fans out one task per known dependency, waits for all of them and
//! assembles a complete [`HealthSnapshot`]. A probe that errors, times out,
//! panics or was never registered still produces an (unhealthy) entry.

use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::probe::ProbeClient;
use super::types::{DependencyId, HealthSnapshot, ProbeOutcome};
use crate::error::ProbeError;
use crate::logging::log_probe_outcome;

/// Slack on top of the probe timeout before a probe task is abandoned.
pub const PROBE_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct HealthAggregator {
    probes: BTreeMap<DependencyId, Arc<dyn ProbeClient>>,
    probe_timeout: Duration,
}

impl HealthAggregator {
    /// Build an aggregator. A later probe for the same dependency replaces
    /// an earlier one.
    pub fn new(probes: Vec<Arc<dyn ProbeClient>>, probe_timeout: Duration) -> Self {
        let probes = probes
            .into_iter()
            .map(|probe| (probe.dependency(), probe))
            .collect();

        Self {
            probes,
            probe_timeout,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Probe every known dependency concurrently and build a snapshot.
    pub async fn refresh(&self) -> HealthSnapshot {
        debug!(
            dependencies = DependencyId::ALL.len(),
            timeout_ms = self.probe_timeout.as_millis() as u64,
            "Starting health refresh"
        );

        let pending = DependencyId::ALL.iter().map(|dependency| {
            let dependency = *dependency;
            let probe = self.probes.get(&dependency).cloned();
            let timeout = self.probe_timeout;

            async move {
                let Some(probe) = probe else {
                    return ProbeOutcome::failed(
                        dependency,
                        &ProbeError::protocol("no probe configured"),
                        Duration::ZERO,
                    );
                };

                let task = tokio::spawn(async move { probe.probe(timeout).await });
                let abort = task.abort_handle();

                match tokio::time::timeout(timeout + PROBE_GRACE, task).await {
                    Ok(Ok(outcome)) if outcome.dependency == dependency => outcome,
                    Ok(Ok(outcome)) => {
                        warn!(
                            expected = %dependency,
                            reported = %outcome.dependency,
                            "Probe reported the wrong dependency"
                        );
                        ProbeOutcome::failed(
                            dependency,
                            &ProbeError::protocol(format!(
                                "probe reported dependency '{}'",
                                outcome.dependency
                            )),
                            outcome.latency,
                        )
                    }
                    Ok(Err(join_error)) => ProbeOutcome::failed(
                        dependency,
                        &ProbeError::protocol(format!("probe task failed: {join_error}")),
                        Duration::ZERO,
                    ),
                    Err(_elapsed) => {
                        abort.abort();
                        ProbeOutcome::failed(dependency, &ProbeError::Timeout(timeout), timeout)
                    }
                }
            }
        });

        let outcomes: BTreeMap<DependencyId, ProbeOutcome> = join_all(pending)
            .await
            .into_iter()
            .inspect(log_probe_outcome)
            .map(|outcome| (outcome.dependency, outcome))
            .collect();

        let snapshot = HealthSnapshot {
            outcomes,
            generated_at: Utc::now(),
        };

        debug!(
            status = %snapshot.overall_status(),
            "Health refresh complete"
        );

        snapshot
    }
}
