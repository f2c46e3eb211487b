// valvewatch Testdata - Synthetic sensor network traffic
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # valvewatch Testdata
//!
//! Synthetic traffic for exercising the monitor without a Cooja simulation:
//!
//! - **Signal patterns**: constant, linear ramps, random walks, sawtooth
//! - **Node feeds**: border-router log lines for a set of nodes, with
//!   optional routing chatter in between
//! - **Fake border router**: a loopback TCP endpoint that plays a script of
//!   lines and collects the commands sent back
//!
//! ## Quick Start
//!
//! ```rust
//! use valvewatch_testdata::{NodeFeed, SignalPattern};
//!
//! let mut feed = NodeFeed::new(42)
//!     .with_node(2, SignalPattern::Linear { start: 500.0, step: 4.0 })
//!     .with_node(3, SignalPattern::Constant { value: 480.0 });
//!
//! let lines = feed.take_rounds(3);
//! assert_eq!(lines.len(), 6);
//! assert_eq!(lines[0], "PROCESS : Server got ID=2, value=500");
//! ```

pub mod border_router;
pub mod feed;
pub mod patterns;

// Re-exports for convenience
pub use border_router::{FakeBorderRouter, RouterHandle, Script};
pub use feed::{hello_line, reading_line, NodeFeed};
pub use patterns::{SignalGenerator, SignalPattern};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
