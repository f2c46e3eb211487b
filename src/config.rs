// valvewatch - Streaming trend monitor for sensor networks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for valvewatch
//!
//! Every value is fixed at process start; nothing is reconfigured while the
//! monitor runs.

use std::time::Duration;

use crate::error::{MonitorError, Result};
use crate::supervisor::ReconnectPolicy;

/// Default host of the Cooja serial socket
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port of the Cooja serial socket
pub const DEFAULT_PORT: u16 = 60001;

/// Per-node window configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    /// Number of samples a full window holds (default: 30)
    pub size: usize,

    /// Samples older than this, relative to the newest arrival, are dropped
    /// (default: 300 s)
    pub expiry: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: 30,
            expiry: Duration::from_secs(300),
        }
    }
}

impl WindowConfig {
    /// Create a window configuration
    pub fn new(size: usize, expiry: Duration) -> Self {
        Self { size, expiry }
    }

    /// Check the invariants the slope estimator relies on
    pub fn validate(&self) -> Result<()> {
        if self.size < 2 {
            return Err(MonitorError::InvalidConfig(format!(
                "window size must be at least 2, got {}",
                self.size
            )));
        }
        if self.expiry.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "window expiry must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Monitor-level configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Host of the telemetry stream
    pub host: String,

    /// Port of the telemetry stream
    pub port: u16,

    /// Window shape shared by every node
    pub window: WindowConfig,

    /// Slopes strictly above this open the valve (default: 0.5)
    pub slope_threshold: f64,

    /// Retry policy while the endpoint refuses connections
    pub reconnect: ReconnectPolicy,

    /// Read timeout used while discarding the backlog (default: 100 ms)
    pub flush_timeout: Duration,

    /// How often the supervisor checks on the ingestion thread (default: 1 s)
    pub poll_interval: Duration,

    /// Size of each socket read (default: 1024 bytes)
    pub read_chunk: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            window: WindowConfig::default(),
            slope_threshold: 0.5,
            reconnect: ReconnectPolicy::default(),
            flush_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_secs(1),
            read_chunk: 1024,
        }
    }
}

impl MonitorConfig {
    /// Create a configuration targeting a specific endpoint
    pub fn with_endpoint(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Replace the window configuration
    pub fn window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Replace the slope threshold
    pub fn slope_threshold(mut self, threshold: f64) -> Self {
        self.slope_threshold = threshold;
        self
    }

    /// Replace the reconnect policy
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// `host:port` string used for connecting and logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("host must not be empty".to_string()));
        }
        self.window.validate()?;
        if !self.slope_threshold.is_finite() {
            return Err(MonitorError::InvalidConfig(format!(
                "slope threshold must be finite, got {}",
                self.slope_threshold
            )));
        }
        if self.flush_timeout.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "flush timeout must be non-zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.read_chunk == 0 {
            return Err(MonitorError::InvalidConfig(
                "read chunk must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 60001);
        assert_eq!(config.window.size, 30);
        assert_eq!(config.window.expiry, Duration::from_secs(300));
        assert_eq!(config.slope_threshold, 0.5);
        assert_eq!(config.reconnect.delay, Duration::from_secs(2));
        assert!(config.reconnect.max_attempts.is_none());
        assert_eq!(config.address(), "127.0.0.1:60001");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_monitor_config_builders() {
        let config = MonitorConfig::with_endpoint("localhost", 7000)
            .window(WindowConfig::new(3, Duration::from_secs(10)))
            .slope_threshold(1.5);
        assert_eq!(config.address(), "localhost:7000");
        assert_eq!(config.window.size, 3);
        assert_eq!(config.slope_threshold, 1.5);
    }

    #[test]
    fn test_window_too_small_rejected() {
        let config = MonitorConfig::default().window(WindowConfig::new(1, Duration::from_secs(1)));
        assert!(matches!(
            config.validate(),
            Err(MonitorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let window = WindowConfig::new(5, Duration::ZERO);
        assert!(window.validate().is_err());
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        let config = MonitorConfig::default().slope_threshold(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_host_rejected() {
        let config = MonitorConfig::with_endpoint(" ", 1);
        assert!(config.validate().is_err());
    }
}
