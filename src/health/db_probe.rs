//! # Database Probe
//!
//! Liveness check for PostgreSQL: open a single connection, run `SELECT 1`,
//! close it. No pool is kept between ticks.

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use tracing::debug;

use super::probe::ProbeClient;
use super::types::DependencyId;
use crate::config::DatabaseConfig;
use crate::error::ProbeResult;

#[derive(Clone)]
pub struct DatabaseProbe {
    options: PgConnectOptions,
    host: String,
    port: u16,
}

impl std::fmt::Debug for DatabaseProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseProbe")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl DatabaseProbe {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.username)
            .password(&config.password);

        Self {
            options,
            host: config.host.clone(),
            port: config.port,
        }
    }
}

#[async_trait]
impl ProbeClient for DatabaseProbe {
    fn dependency(&self) -> DependencyId {
        DependencyId::Database
    }

    async fn check(&self) -> ProbeResult<()> {
        let mut conn = PgConnection::connect_with(&self.options).await?;
        let query_result = sqlx::query("SELECT 1").execute(&mut conn).await;

        if let Err(e) = conn.close().await {
            debug!(host = %self.host, error = %e, "Database probe connection did not close cleanly");
        }

        query_result?;
        debug!(host = %self.host, port = self.port, "Database SELECT 1 answered");
        Ok(())
    }
}
