//! # Probe Client
//!
//! A probe performs one bounded liveness check against a single dependency.
//! Implementors only write the raw [`ProbeClient::check`]; the provided
//! [`ProbeClient::probe`] adds the timeout, latency measurement and error
//! capture, so callers always get a [`ProbeOutcome`] back.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use super::types::{DependencyId, ProbeOutcome};
use crate::error::{ProbeError, ProbeResult};

#[async_trait]
pub trait ProbeClient: Send + Sync + std::fmt::Debug {
    /// Dependency this client checks
    fn dependency(&self) -> DependencyId;

    /// Raw liveness check.
    ///
    /// Opens whatever connection it needs and closes it before returning.
    async fn check(&self) -> ProbeResult<()>;

    /// Run [`check`](Self::check) bounded by `timeout` and record the result.
    ///
    /// Never fails: errors and timeouts become `healthy = false`.
    async fn probe(&self, timeout: Duration) -> ProbeOutcome {
        let dependency = self.dependency();
        let start = Instant::now();

        match tokio::time::timeout(timeout, self.check()).await {
            Ok(Ok(())) => ProbeOutcome::healthy(dependency, start.elapsed()),
            Ok(Err(e)) => ProbeOutcome::failed(dependency, &e, start.elapsed()),
            Err(_elapsed) => {
                ProbeOutcome::failed(dependency, &ProbeError::Timeout(timeout), start.elapsed())
            }
        }
    }
}
