//! # Structured Logging Module
//!
//! Environment-aware console logging using the tracing ecosystem. Logs go to
//! stdout so container runtimes can collect them; set `LOG_FORMAT=json` for
//! machine-readable output and `RUST_LOG` to override the level filter.

use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::health::ProbeOutcome;

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console logging once per process.
///
/// Safe to call repeatedly and safe to call when another global subscriber
/// is already installed (tests, embedding applications).
pub fn init_console_only() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var("RUST_LOG")
            .ok()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(get_log_level(&environment)));
        let json = use_json_format();
        let use_ansi = !json && IsTerminal::is_terminal(&std::io::stdout());

        let console_layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                ansi_colors = use_ansi,
                json_format = json,
                "Console logging initialized"
            );
        }
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DASHBOARD_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log the result of one dependency probe
pub fn log_probe_outcome(outcome: &ProbeOutcome) {
    let latency_ms = outcome.latency.as_millis() as u64;
    if outcome.healthy {
        tracing::debug!(
            dependency = %outcome.dependency,
            latency_ms = latency_ms,
            "Probe succeeded"
        );
    } else {
        tracing::warn!(
            dependency = %outcome.dependency,
            latency_ms = latency_ms,
            failure = ?outcome.failure,
            error = outcome.error.as_deref().unwrap_or("unknown"),
            "Probe failed"
        );
    }
}

/// Log the end of a scheduler tick
pub fn log_tick(trigger: &str, outcome: &str, duration_ms: u64, version: Option<u64>) {
    tracing::info!(
        trigger = %trigger,
        outcome = %outcome,
        duration_ms = duration_ms,
        version = version,
        timestamp = %Utc::now().to_rfc3339(),
        "Scheduler tick finished"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "Operation failed"
    );
}
