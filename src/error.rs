//! Error types for the dashboard core.
//!
//! Two layers:
//! - [`ProbeError`] lives at the probe / metric-source boundary. It is always
//!   recovered locally and recorded on a `ProbeOutcome` or logged by an
//!   aggregator, never propagated past it.
//! - [`DashboardError`] covers everything outside that boundary: configuration,
//!   window construction and scheduler ticks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Message recorded for refused connections, regardless of driver wording.
pub const CONNECTION_REFUSED: &str = "connection refused";

/// Classification of a probe or metric-source failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailureKind {
    /// The dependency did not answer within the configured bound
    Timeout,
    /// The dependency could not be reached
    Connection,
    /// The dependency answered, but not with what was expected
    Protocol,
}

impl fmt::Display for ProbeFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connection => write!(f, "connection"),
            Self::Protocol => write!(f, "protocol"),
        }
    }
}

/// Failure of a single probe or metric sample
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Probe timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The driver gave up waiting before the probe bound elapsed
    #[error("Probe driver timed out: {0}")]
    DriverTimeout(String),
    #[error("Probe connection error: {0}")]
    Connection(String),
    #[error("Probe protocol error: {0}")]
    Protocol(String),
}

impl ProbeError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn driver_timeout(message: impl Into<String>) -> Self {
        Self::DriverTimeout(message.into())
    }

    pub fn kind(&self) -> ProbeFailureKind {
        match self {
            Self::Timeout(_) | Self::DriverTimeout(_) => ProbeFailureKind::Timeout,
            Self::Connection(_) => ProbeFailureKind::Connection,
            Self::Protocol(_) => ProbeFailureKind::Protocol,
        }
    }

    /// The bare failure message, without the classification prefix.
    ///
    /// This is what gets recorded on a `ProbeOutcome`.
    pub fn detail(&self) -> String {
        match self {
            Self::Timeout(after) => format!("timed out after {}ms", after.as_millis()),
            Self::DriverTimeout(msg) | Self::Connection(msg) | Self::Protocol(msg) => msg.clone(),
        }
    }
}

impl From<redis::RedisError> for ProbeError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() {
            ProbeError::connection(CONNECTION_REFUSED)
        } else if err.is_timeout() {
            ProbeError::driver_timeout(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() {
            ProbeError::connection(err.to_string())
        } else {
            ProbeError::protocol(err.to_string())
        }
    }
}

impl From<sqlx::Error> for ProbeError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
                ProbeError::connection(CONNECTION_REFUSED)
            }
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                ProbeError::driver_timeout(io.to_string())
            }
            sqlx::Error::Io(io) => ProbeError::connection(io.to_string()),
            sqlx::Error::Tls(e) => ProbeError::connection(format!("tls: {e}")),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                ProbeError::connection(err.to_string())
            }
            other => ProbeError::protocol(other.to_string()),
        }
    }
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Crate-level errors outside the probe boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Invalid metric window: {0}")]
    InvalidWindow(String),
    #[error("Scheduler tick error: {0}")]
    SchedulerTickError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DashboardResult<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_kind_and_detail() {
        let timeout = ProbeError::Timeout(Duration::from_millis(250));
        assert_eq!(timeout.kind(), ProbeFailureKind::Timeout);
        assert_eq!(timeout.detail(), "timed out after 250ms");
        assert_eq!(timeout.to_string(), "Probe timed out after 250ms");

        let refused = ProbeError::connection(CONNECTION_REFUSED);
        assert_eq!(refused.kind(), ProbeFailureKind::Connection);
        assert_eq!(refused.detail(), "connection refused");

        let bad_reply = ProbeError::protocol("expected PONG");
        assert_eq!(bad_reply.kind(), ProbeFailureKind::Protocol);
        assert_eq!(bad_reply.to_string(), "Probe protocol error: expected PONG");
    }

    #[test]
    fn test_sqlx_io_refusal_is_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "os error 111");
        let err: ProbeError = sqlx::Error::Io(io).into();
        assert_eq!(err, ProbeError::connection(CONNECTION_REFUSED));
    }

    #[test]
    fn test_sqlx_row_not_found_is_protocol() {
        let err: ProbeError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), ProbeFailureKind::Protocol);
    }

    #[test]
    fn test_redis_refusal_is_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "os error 111");
        let err: ProbeError = redis::RedisError::from(io).into();
        assert_eq!(err, ProbeError::connection(CONNECTION_REFUSED));
    }

    #[test]
    fn test_redis_timeout_is_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let err: ProbeError = redis::RedisError::from(io).into();
        assert_eq!(err.kind(), ProbeFailureKind::Timeout);
        assert!(matches!(err, ProbeError::DriverTimeout(_)));
        assert!(err.detail().contains("read timed out"));
    }

    #[test]
    fn test_sqlx_io_timeout_is_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out");
        let err: ProbeError = sqlx::Error::Io(io).into();
        assert_eq!(err, ProbeError::driver_timeout("connect timed out"));
        assert_eq!(err.kind(), ProbeFailureKind::Timeout);
        assert_eq!(err.to_string(), "Probe driver timed out: connect timed out");
    }

    #[test]
    fn test_sqlx_io_reset_stays_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err: ProbeError = sqlx::Error::Io(io).into();
        assert_eq!(err.kind(), ProbeFailureKind::Connection);
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ProbeFailureKind::Connection).unwrap();
        assert_eq!(json, "\"connection\"");
    }

    #[test]
    fn test_dashboard_error_display() {
        let err = DashboardError::SchedulerTickError("refresh task panicked".to_string());
        assert_eq!(err.to_string(), "Scheduler tick error: refresh task panicked");
    }
}
