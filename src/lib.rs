//! # valvewatch - Streaming trend monitor for sensor networks
//!
//! Watches the serial output of a simulated sensor network's border router,
//! keeps a short history of readings per node, and opens a node's valve when
//! its readings climb faster than a threshold.
//!
//! ## Key Features
//!
//! - **Line framing**: newline-delimited ASCII over one TCP stream
//! - **Embedded readings**: `ID=<n>` / `value=<v>` found anywhere in a line
//! - **Bounded windows**: per-node, pruned by age and by count
//! - **Trend trigger**: position-indexed least-squares slope over a full window
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//! use valvewatch::{Pipeline, WindowConfig, WindowStore};
//!
//! let store = Arc::new(WindowStore::new(WindowConfig::new(3, Duration::from_secs(300))));
//! let pipeline = Pipeline::new(Arc::clone(&store), 0.5);
//!
//! let mut outbound = Vec::new();
//! let now = Instant::now();
//! for value in [1, 2, 3] {
//!     let line = format!("PROCESS : Server got ID=7, value={}", value);
//!     pipeline.handle_line(&line, now, &mut outbound);
//! }
//!
//! // The rising window opened node 7's valve and was reset
//! assert_eq!(outbound, b"3 7 1\n");
//! assert_eq!(store.len(7), 0);
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: readings, commands and their wire format
//! - [`framer`]: newline framing over raw bytes
//! - [`extract`]: reading extraction from log lines
//! - [`window`]: per-node sliding windows behind one lock
//! - [`slope`]: least-squares slope estimation
//! - [`trigger`]: threshold decision and command emission
//! - [`ingest`]: the line-to-command pipeline and its read loop
//! - [`supervisor`]: connection lifecycle, backlog flush and shutdown
//! - [`config`]: process-start configuration

// Modules
pub mod config;
pub mod error;
pub mod extract;
pub mod framer;
pub mod ingest;
pub mod protocol;
pub mod slope;
pub mod supervisor;
pub mod trigger;
pub mod window;

// Re-exports for convenient access
pub use config::{MonitorConfig, WindowConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{CommandParseError, MonitorError, Result};
pub use extract::extract;
pub use framer::LineFramer;
pub use ingest::{IngestMetrics, IngestStats, LineOutcome, Pipeline};
pub use protocol::{Command, CommandType, NodeId, Reading, SensorReading, OPEN_VALVE_CODE};
pub use slope::{least_squares_slope, SlopeEstimator};
pub use supervisor::{
    ReconnectPolicy, RunOutcome, RunReport, ShutdownSignal, Supervisor, SupervisorState,
};
pub use trigger::TriggerController;
pub use window::{NodeRegistry, Window, WindowStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
