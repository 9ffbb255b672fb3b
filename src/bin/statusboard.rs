//! # Statusboard
//!
//! Headless runner for the dashboard core. Loads configuration from the
//! environment, refreshes on the configured interval and prints every
//! published snapshot pair to stdout as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use statusboard_core::{logging, DashboardConfig, DashboardCore, TickOutcome};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "statusboard")]
#[command(about = "Probe dashboard dependencies and print status snapshots")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Run a single refresh, print it and exit
    #[arg(long)]
    once: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Print the effective configuration (credentials masked) and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_console_only();

    let config = DashboardConfig::from_env().context("Failed to load dashboard configuration")?;

    if cli.show_config {
        print_json(&config.sanitized(), cli.pretty)?;
        return Ok(());
    }

    let core = DashboardCore::bootstrap(config).context("Failed to bootstrap dashboard core")?;

    if cli.once {
        return match core.trigger_refresh().await {
            TickOutcome::Published { .. } => print_snapshot(&core, cli.pretty),
            TickOutcome::Dropped => anyhow::bail!("Refresh was dropped"),
            TickOutcome::Failed(e) => Err(e).context("Refresh failed"),
        };
    }

    let mut versions = core.subscribe();
    let handle = core.start();
    info!("Statusboard running, press Ctrl+C to stop");

    loop {
        tokio::select! {
            changed = versions.changed() => {
                if changed.is_err() {
                    error!("Snapshot store closed");
                    break;
                }
                print_snapshot(&core, cli.pretty)?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                info!("Shutdown signal received");
                break;
            }
        }
    }

    handle.shutdown().await.context("Failed to stop scheduler")?;
    Ok(())
}

fn print_snapshot(core: &DashboardCore, pretty: bool) -> Result<()> {
    let (health, metrics) = core.store().current();
    let body = json!({
        "version": core.store().version(),
        "summary": health.summary(),
        "stale": core.is_stale(),
        "health": &*health,
        "metrics": &*metrics,
        "scheduler": core.stats(),
    });
    print_json(&body, pretty)
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
