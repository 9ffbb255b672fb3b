//! # Health Module
//!
//! Dependency liveness probing and aggregation.
//!
//! ```text
//!   ┌──────────────┐   ┌───────────────┐
//!   │  CacheProbe  │   │ DatabaseProbe │   (one transient connection each)
//!   └──────┬───────┘   └───────┬───────┘
//!          │ ProbeOutcome      │ ProbeOutcome
//!          ▼                   ▼
//!   ┌──────────────────────────────────┐
//!   │         HealthAggregator         │   (concurrent fan-out, bounded)
//!   └────────────────┬─────────────────┘
//!                    │ HealthSnapshot
//!                    ▼
//!              SnapshotStore
//! ```

pub mod aggregator;
pub mod cache_probe;
pub mod db_probe;
pub mod probe;
pub mod types;

pub use aggregator::HealthAggregator;
pub use cache_probe::CacheProbe;
pub use db_probe::DatabaseProbe;
pub use probe::ProbeClient;
pub use types::{DependencyId, HealthSnapshot, HealthStatus, HealthSummary, ProbeOutcome};
