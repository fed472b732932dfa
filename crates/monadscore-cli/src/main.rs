//! monadscore - keeps Monad Score nodes alive for a fleet of wallets.
//!
//! Reads accounts and tuning from the environment (and `.env`), then runs
//! one agent per wallet until the process is interrupted.

use std::io;
use std::path::Path;

use anyhow::{bail, Result};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use monadscore_core::{AgentOutcome, Fleet, Settings};

/// Log file name prefix inside `LOG_DIR`
const LOG_FILE_PREFIX: &str = "monadscore.log";

/// Initialize the tracing subscriber for logging.
///
/// Console output always goes to stderr; when `log_dir` is set a daily
/// rotated file receives the same events. The returned guard must be held
/// for the lifetime of the process so buffered lines get flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            let _ = init_tracing(None);
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };

    let _guard = init_tracing(settings.log_dir.as_deref());
    info!(api_url = %settings.api_url, accounts = settings.accounts.len(), "monadscore starting");

    let fleet = Fleet::from_settings(&settings)?;
    for wallet in fleet.wallets() {
        info!(wallet = %wallet, "Wallet loaded");
    }

    tokio::select! {
        exits = fleet.run() => {
            let failed = exits
                .iter()
                .filter(|exit| !matches!(exit.outcome, AgentOutcome::Finished))
                .count();
            if failed > 0 {
                bail!("{} of {} agents stopped with errors", failed, exits.len());
            }
            info!("All agents stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
