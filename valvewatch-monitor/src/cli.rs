// valvewatch Monitor - Command-line runner
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Command-line arguments and their mapping onto [`MonitorConfig`].

use std::time::Duration;

use clap::Parser;
use tracing::Level;
use valvewatch::{MonitorConfig, ReconnectPolicy, WindowConfig, DEFAULT_HOST, DEFAULT_PORT};

/// Sliding-window trend monitor for a simulated sensor network
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host of the border router's serial socket
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port of the border router's serial socket
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Readings per node needed before a slope is computed
    #[arg(short = 'w', long, default_value_t = 30)]
    pub window_size: usize,

    /// Readings older than this many seconds are dropped
    #[arg(short = 'e', long, default_value_t = 300)]
    pub window_expiry: u64,

    /// Slopes strictly above this open the node's valve
    #[arg(short = 't', long, default_value_t = 0.5, allow_negative_numbers = true)]
    pub slope_threshold: f64,

    /// Delay between connection attempts, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub reconnect_delay_ms: u64,

    /// Give up after this many refused attempts (retries forever by default)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Build the monitor configuration from the parsed arguments
    pub fn to_config(&self) -> MonitorConfig {
        let delay = Duration::from_millis(self.reconnect_delay_ms);
        let reconnect = match self.max_attempts {
            Some(max) => ReconnectPolicy::limited(delay, max),
            None => ReconnectPolicy::unbounded(delay),
        };

        MonitorConfig::with_endpoint(self.host.clone(), self.port)
            .window(WindowConfig::new(
                self.window_size,
                Duration::from_secs(self.window_expiry),
            ))
            .slope_threshold(self.slope_threshold)
            .reconnect(reconnect)
    }

    /// Log level, falling back to INFO for unknown names
    pub fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}
