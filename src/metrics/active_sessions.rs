//! # Active Sessions Source
//!
//! Reports the cardinality of the Redis set holding active session ids as the
//! `active_users` gauge. A missing set counts as zero; an unreachable cache is
//! an error, which leaves the gauge absent for that tick.

use async_trait::async_trait;
use tracing::debug;

use super::source::{MetricKind, MetricSource};
use super::types::{MetricSample, MetricWindow, ACTIVE_USERS};
use crate::config::{redact_url, RedisConfig};
use crate::error::{ProbeError, ProbeResult};

#[derive(Clone)]
pub struct ActiveSessionsSource {
    client: redis::Client,
    key: String,
    redacted_url: String,
}

impl std::fmt::Debug for ActiveSessionsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSessionsSource")
            .field("url", &self.redacted_url)
            .field("key", &self.key)
            .finish()
    }
}

impl ActiveSessionsSource {
    pub fn from_config(config: &RedisConfig) -> ProbeResult<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            ProbeError::connection(format!("Invalid Redis url: {e}"))
        })?;

        Ok(Self {
            client,
            key: config.active_users_key.clone(),
            redacted_url: redact_url(&config.url),
        })
    }
}

#[async_trait]
impl MetricSource for ActiveSessionsSource {
    fn name(&self) -> &str {
        "active_sessions"
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    async fn sample(&self, window: MetricWindow) -> ProbeResult<Vec<MetricSample>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: u64 = redis::cmd("SCARD")
            .arg(&self.key)
            .query_async(&mut conn)
            .await?;

        debug!(key = %self.key, count = count, "Active session count read");

        Ok(vec![MetricSample::new(
            ACTIVE_USERS,
            count as f64,
            "users",
            window,
        )])
    }
}
