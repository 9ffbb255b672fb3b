//! # Cache Probe
//!
//! Liveness check for the Redis cache: open a connection, `PING`, expect `PONG`.
//! The connection is dropped after every probe.

use async_trait::async_trait;
use tracing::debug;

use super::probe::ProbeClient;
use super::types::DependencyId;
use crate::config::{redact_url, RedisConfig};
use crate::error::{ProbeError, ProbeResult};

#[derive(Clone)]
pub struct CacheProbe {
    client: redis::Client,
    redacted_url: String,
}

impl std::fmt::Debug for CacheProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheProbe")
            .field("url", &self.redacted_url)
            .finish()
    }
}

impl CacheProbe {
    /// Build a probe from configuration. Parses the url; does not connect.
    pub fn from_config(config: &RedisConfig) -> ProbeResult<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            ProbeError::connection(format!("Invalid Redis url: {e}"))
        })?;

        Ok(Self {
            client,
            redacted_url: redact_url(&config.url),
        })
    }
}

#[async_trait]
impl ProbeClient for CacheProbe {
    fn dependency(&self) -> DependencyId {
        DependencyId::Cache
    }

    async fn check(&self) -> ProbeResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;

        if pong != "PONG" {
            return Err(ProbeError::protocol(format!(
                "Unexpected PING reply: {pong}"
            )));
        }

        debug!(url = %self.redacted_url, "Redis PING answered");
        Ok(())
    }
}
