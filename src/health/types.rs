//! # Health Types
//!
//! Dependency identifiers, per-probe outcomes and the aggregated snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::{ProbeError, ProbeFailureKind};

/// Error text carried by every entry of the initial, never-checked snapshot.
pub const NOT_YET_CHECKED: &str = "not yet checked";

/// Identifier of a probed backend dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyId {
    /// Key-value cache service (Redis)
    Cache,
    /// Relational store (PostgreSQL)
    Database,
}

impl DependencyId {
    /// Every dependency the dashboard knows about
    pub const ALL: [DependencyId; 2] = [DependencyId::Cache, DependencyId::Database];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Database => "database",
        }
    }

    /// Whether a failure of this dependency makes the whole dashboard unhealthy.
    ///
    /// A cache outage slows requests down; a database outage stops them.
    pub fn is_critical(&self) -> bool {
        match self {
            Self::Cache => false,
            Self::Database => true,
        }
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DependencyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache" => Ok(Self::Cache),
            "database" => Ok(Self::Database),
            _ => Err(format!("Unknown dependency: {s}")),
        }
    }
}

/// Result of one probe execution. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub dependency: DependencyId,
    pub healthy: bool,
    /// Time spent on the probe, including a timed-out wait
    #[serde(with = "duration_ms")]
    pub latency: Duration,
    pub checked_at: DateTime<Utc>,
    /// Failure message, `None` when healthy
    pub error: Option<String>,
    /// Failure classification, `None` when healthy or never checked
    pub failure: Option<ProbeFailureKind>,
}

impl ProbeOutcome {
    pub fn healthy(dependency: DependencyId, latency: Duration) -> Self {
        Self {
            dependency,
            healthy: true,
            latency,
            checked_at: Utc::now(),
            error: None,
            failure: None,
        }
    }

    pub fn failed(dependency: DependencyId, error: &ProbeError, latency: Duration) -> Self {
        Self {
            dependency,
            healthy: false,
            latency,
            checked_at: Utc::now(),
            error: Some(error.detail()),
            failure: Some(error.kind()),
        }
    }

    /// Placeholder for a dependency that has not been probed yet
    pub fn unknown(dependency: DependencyId, at: DateTime<Utc>) -> Self {
        Self {
            dependency,
            healthy: false,
            latency: Duration::ZERO,
            checked_at: at,
            error: Some(NOT_YET_CHECKED.to_string()),
            failure: None,
        }
    }

    /// Whether this outcome is an unchecked placeholder
    pub fn is_unknown(&self) -> bool {
        !self.healthy && self.failure.is_none()
    }
}

/// Overall dashboard status derived from a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Every dependency is healthy
    Healthy,
    /// Only non-critical dependencies failed
    Degraded,
    /// At least one critical dependency failed
    Unhealthy,
    /// Nothing has been checked yet
    Unknown,
}

impl HealthStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Health of every known dependency as of one tick
///
/// Always holds an entry for each of [`DependencyId::ALL`]; a failed probe is
/// an unhealthy entry, never a missing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub outcomes: BTreeMap<DependencyId, ProbeOutcome>,
    pub generated_at: DateTime<Utc>,
}

impl HealthSnapshot {
    /// Explicit "nothing checked yet" snapshot used before the first tick
    pub fn unknown() -> Self {
        let now = Utc::now();
        Self {
            outcomes: DependencyId::ALL
                .iter()
                .map(|dep| (*dep, ProbeOutcome::unknown(*dep, now)))
                .collect(),
            generated_at: now,
        }
    }

    pub fn get(&self, dependency: DependencyId) -> Option<&ProbeOutcome> {
        self.outcomes.get(&dependency)
    }

    /// True when no dependency has been probed yet
    pub fn is_unknown(&self) -> bool {
        self.outcomes.values().all(ProbeOutcome::is_unknown)
    }

    /// Whether every known dependency has exactly one entry
    pub fn is_complete(&self) -> bool {
        self.outcomes.len() == DependencyId::ALL.len()
            && DependencyId::ALL
                .iter()
                .all(|dep| self.outcomes.get(dep).is_some_and(|o| o.dependency == *dep))
    }

    pub fn overall_status(&self) -> HealthStatus {
        if self.outcomes.is_empty() || self.is_unknown() {
            return HealthStatus::Unknown;
        }

        let mut failed = self.outcomes.values().filter(|o| !o.healthy).peekable();
        if failed.peek().is_none() {
            HealthStatus::Healthy
        } else if failed.any(|o| o.dependency.is_critical()) {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        }
    }

    /// Counts for the status summary card
    pub fn summary(&self) -> HealthSummary {
        let checked = || self.outcomes.values().filter(|o| !o.is_unknown());
        HealthSummary {
            overall_status: self.overall_status(),
            total_checks: self.outcomes.len(),
            healthy_checks: checked().filter(|o| o.healthy).count(),
            unhealthy_checks: checked().filter(|o| !o.healthy).count(),
            last_check: checked().map(|o| o.checked_at).max(),
        }
    }
}

/// Aggregate view of a [`HealthSnapshot`]
///
/// Never-checked placeholders count toward `total_checks` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub overall_status: HealthStatus,
    pub total_checks: usize,
    pub healthy_checks: usize,
    pub unhealthy_checks: usize,
    /// Most recent probe time, `None` before the first probe
    pub last_check: Option<DateTime<Utc>>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Serialize a `Duration` as integer milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(dep: DependencyId, healthy: bool) -> ProbeOutcome {
        if healthy {
            ProbeOutcome::healthy(dep, Duration::from_millis(5))
        } else {
            ProbeOutcome::failed(
                dep,
                &ProbeError::connection("connection refused"),
                Duration::from_millis(1),
            )
        }
    }

    fn snapshot(cache: bool, database: bool) -> HealthSnapshot {
        HealthSnapshot {
            outcomes: [
                (DependencyId::Cache, outcome(DependencyId::Cache, cache)),
                (DependencyId::Database, outcome(DependencyId::Database, database)),
            ]
            .into_iter()
            .collect(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_dependency_id_round_trips_through_str() {
        for dep in DependencyId::ALL {
            assert_eq!(dep.as_str().parse::<DependencyId>().unwrap(), dep);
        }
        assert!("queue".parse::<DependencyId>().is_err());
    }

    #[test]
    fn test_unknown_snapshot_has_every_dependency() {
        let snapshot = HealthSnapshot::unknown();
        assert!(snapshot.is_complete());
        assert!(snapshot.is_unknown());
        assert_eq!(snapshot.overall_status(), HealthStatus::Unknown);
        for dep in DependencyId::ALL {
            let entry = snapshot.get(dep).unwrap();
            assert!(!entry.healthy);
            assert_eq!(entry.error.as_deref(), Some(NOT_YET_CHECKED));
        }
    }

    #[test]
    fn test_failed_outcome_records_detail_and_kind() {
        let failed = outcome(DependencyId::Database, false);
        assert!(!failed.healthy);
        assert_eq!(failed.error.as_deref(), Some("connection refused"));
        assert_eq!(failed.failure, Some(ProbeFailureKind::Connection));
        assert!(!failed.is_unknown());
    }

    #[test]
    fn test_overall_status() {
        assert_eq!(snapshot(true, true).overall_status(), HealthStatus::Healthy);
        assert_eq!(snapshot(false, true).overall_status(), HealthStatus::Degraded);
        assert_eq!(snapshot(true, false).overall_status(), HealthStatus::Unhealthy);
        assert_eq!(snapshot(false, false).overall_status(), HealthStatus::Unhealthy);
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Unknown.is_operational());
    }

    #[test]
    fn test_only_database_is_critical() {
        assert!(DependencyId::Database.is_critical());
        assert!(!DependencyId::Cache.is_critical());
    }

    #[test]
    fn test_summary_counts() {
        let summary = snapshot(false, true).summary();
        assert_eq!(summary.overall_status, HealthStatus::Degraded);
        assert_eq!(summary.total_checks, 2);
        assert_eq!(summary.healthy_checks, 1);
        assert_eq!(summary.unhealthy_checks, 1);
        assert!(summary.last_check.is_some());
    }

    #[test]
    fn test_summary_of_unknown_snapshot() {
        let summary = HealthSnapshot::unknown().summary();
        assert_eq!(summary.overall_status, HealthStatus::Unknown);
        assert_eq!(summary.total_checks, 2);
        assert_eq!(summary.healthy_checks, 0);
        assert_eq!(summary.unhealthy_checks, 0);
        assert!(summary.last_check.is_none());
    }

    #[test]
    fn test_incomplete_snapshot_detected() {
        let mut snapshot = snapshot(true, true);
        snapshot.outcomes.remove(&DependencyId::Database);
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_outcome_serializes_latency_as_millis() {
        let json = serde_json::to_value(outcome(DependencyId::Cache, true)).unwrap();
        assert_eq!(json["dependency"], "cache");
        assert_eq!(json["latency"], 5);
        assert_eq!(json["healthy"], true);
    }
}
