//! # Snapshot Store
//!
//! Holds the one current [`HealthSnapshot`] and [`MetricsSnapshot`] the
//! presentation layer reads from. The scheduler is the only writer.
//!
//! ## Design Principles
//!
//! 1. **Whole replacement**: snapshots are published as `Arc`s and swapped
//!    under a short write lock, never mutated in place
//! 2. **Consistent pairs**: health and metrics live behind the same lock, so a
//!    reader never observes one tick's health next to another tick's metrics
//! 3. **Push and pull**: readers may poll the accessors or watch the version
//!    channel returned by [`SnapshotStore::subscribe`]
//! 4. **Stale detection**: the publish instant is kept for `age()` / `is_stale()`

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::health::HealthSnapshot;
use crate::metrics::MetricsSnapshot;

#[derive(Debug)]
struct Published {
    health: Arc<HealthSnapshot>,
    metrics: Arc<MetricsSnapshot>,
    version: u64,
    published_at: Option<Instant>,
}

#[derive(Debug)]
struct StoreInner {
    current: RwLock<Published>,
    versions: watch::Sender<u64>,
}

/// Latest health and metrics snapshots, shared between scheduler and readers
///
/// Cloning is cheap; all clones refer to the same snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    inner: Arc<StoreInner>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Create a store holding the unknown health snapshot and empty metrics.
    ///
    /// Version starts at 0; the first publish makes it 1.
    #[must_use]
    pub fn new() -> Self {
        let (versions, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                current: RwLock::new(Published {
                    health: Arc::new(HealthSnapshot::unknown()),
                    metrics: Arc::new(MetricsSnapshot::empty()),
                    version: 0,
                    published_at: None,
                }),
                versions,
            }),
        }
    }

    pub fn current_health(&self) -> Arc<HealthSnapshot> {
        Arc::clone(&self.inner.current.read().health)
    }

    pub fn current_metrics(&self) -> Arc<MetricsSnapshot> {
        Arc::clone(&self.inner.current.read().metrics)
    }

    /// Both snapshots from the same publish
    pub fn current(&self) -> (Arc<HealthSnapshot>, Arc<MetricsSnapshot>) {
        let current = self.inner.current.read();
        (Arc::clone(&current.health), Arc::clone(&current.metrics))
    }

    /// Number of publishes so far
    pub fn version(&self) -> u64 {
        self.inner.current.read().version
    }

    /// Replace both snapshots in one step. Returns the new version.
    pub fn publish(&self, health: HealthSnapshot, metrics: MetricsSnapshot) -> u64 {
        self.swap(|current| {
            current.health = Arc::new(health);
            current.metrics = Arc::new(metrics);
        })
    }

    /// Replace the health snapshot only. Returns the new version.
    pub fn publish_health(&self, health: HealthSnapshot) -> u64 {
        self.swap(|current| current.health = Arc::new(health))
    }

    /// Replace the metrics snapshot only. Returns the new version.
    pub fn publish_metrics(&self, metrics: MetricsSnapshot) -> u64 {
        self.swap(|current| current.metrics = Arc::new(metrics))
    }

    fn swap(&self, replace: impl FnOnce(&mut Published)) -> u64 {
        let version = {
            let mut current = self.inner.current.write();
            replace(&mut current);
            current.version += 1;
            current.published_at = Some(Instant::now());
            current.version
        };

        // Notify outside the lock; a store with no subscribers is fine.
        self.inner.versions.send_replace(version);
        debug!(version = version, "Snapshots published");
        version
    }

    /// Receiver that observes every new version
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.versions.subscribe()
    }

    /// Time since the last publish, `None` if nothing was published yet
    pub fn age(&self) -> Option<Duration> {
        self.inner
            .current
            .read()
            .published_at
            .map(|instant| instant.elapsed())
    }

    /// Whether the snapshots are older than `threshold` or were never published
    pub fn is_stale(&self, threshold: Duration) -> bool {
        match self.age() {
            None => true,
            Some(age) => age > threshold,
        }
    }
}
