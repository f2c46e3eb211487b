// valvewatch Monitor - Command-line runner
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # valvewatch
//!
//! Connects to the border router's serial socket, watches the per-node
//! reading trend and opens valves when it climbs too fast.
//!
//! ## Usage
//!
//! ```bash
//! # Wait for Cooja on the default socket (127.0.0.1:60001)
//! valvewatch
//!
//! # Smaller windows, stricter threshold
//! valvewatch --window-size 10 --slope-threshold 0.8
//! ```

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use valvewatch::{MonitorError, RunOutcome, RunReport, ShutdownSignal, Supervisor, WindowStore};

use cli::Args;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let level = args.level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(level.into()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("valvewatch v{}", valvewatch::VERSION);

    match run(&args) {
        Ok(report) => {
            log_report(&report);
            match report.outcome {
                RunOutcome::StreamFailed { .. } => ExitCode::FAILURE,
                RunOutcome::Interrupted | RunOutcome::StreamClosed => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<RunReport, AppError> {
    let config = args.to_config();
    info!(
        "Monitoring {} (window={} samples / {}s, threshold={})",
        config.address(),
        config.window.size,
        config.window.expiry.as_secs(),
        config.slope_threshold
    );

    let store = Arc::new(WindowStore::new(config.window));
    let shutdown = ShutdownSignal::new();
    let handler_signal = shutdown.clone();
    ctrlc::set_handler(move || handler_signal.trigger())?;

    let supervisor = Supervisor::new(config, store, shutdown)?;
    Ok(supervisor.run()?)
}

fn log_report(report: &RunReport) {
    match &report.outcome {
        RunOutcome::Interrupted => info!("Monitor interrupted"),
        RunOutcome::StreamClosed => info!("Stream closed by peer"),
        RunOutcome::StreamFailed { reason } => warn!("Stream failed: {}", reason),
    }

    let m = &report.metrics;
    info!(
        "Session: {} connect attempt(s), {} backlog bytes dropped, {} bytes read",
        report.connect_attempts, report.backlog_bytes, m.bytes_received
    );
    info!(
        "Lines: {} total, {} readings, {} ignored; {} slopes computed, {} valve command(s), {} failed write(s)",
        m.lines, m.readings, m.ignored, m.evaluations, m.triggers, m.failed_writes
    );
}
