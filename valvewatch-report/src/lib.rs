// valvewatch Report - Offline run-log analysis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # valvewatch Report
//!
//! Counts line categories in a finished Cooja run log, keeping only lines
//! logged before a time cutoff.
//!
//! Cooja writes one line per node message:
//!
//! ```text
//! 1:46:39.448	ID:5	TREE : Node 5: broadcast rank 1
//! ```
//!
//! i.e. elapsed simulation time, the emitting mote and the message, separated
//! by tabs.
//!
//! ## Example
//!
//! ```rust
//! use valvewatch_report::LogReport;
//!
//! let log = "0:00:01.000\tID:3\tPROCESS : Node 3: send reading 42 to 2\n\
//!            0:00:02.000\tID:1\tPROCESS : Server got ID=3, value=42\n\
//!            3:00:00.000\tID:1\tPROCESS : Server got ID=3, value=43\n";
//!
//! let counts = LogReport::new(7200.0).analyze(log.as_bytes()).unwrap();
//! assert_eq!(counts.send_reading, 1);
//! assert_eq!(counts.server_got, 1);
//! assert_eq!(counts.total, 2);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cutoff: two hours of simulated time
pub const DEFAULT_CUTOFF_SECS: f64 = 7200.0;

/// Error type for report generation
#[derive(Error, Debug)]
pub enum ReportError {
    /// Reading the log failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The cutoff argument could not be parsed
    #[error("Invalid cutoff {0:?}: expected H:MM:SS[.mmm] or seconds")]
    InvalidCutoff(String),

    /// JSON encoding failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Message categories counted by the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// A sensor node sending a reading
    SendReading,
    /// Routing-tree hello broadcasts
    Hello,
    /// Valve open/close events
    Valve,
    /// Readings received by the border router
    ServerGot,
}

impl Category {
    /// Every category, in report order
    pub const ALL: [Category; 4] = [
        Category::SendReading,
        Category::Hello,
        Category::Valve,
        Category::ServerGot,
    ];

    /// Case-sensitive substring identifying the category
    pub fn marker(&self) -> &'static str {
        match self {
            Category::SendReading => "send reading",
            Category::Hello => "HELLO",
            Category::Valve => "valve",
            Category::ServerGot => "Server got",
        }
    }

    /// Check whether `line` falls in this category
    pub fn matches(&self, line: &str) -> bool {
        line.contains(self.marker())
    }
}

/// Category counts over the kept lines.
///
/// A line may count in several categories; `total` counts every kept line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub send_reading: u64,
    pub hello: u64,
    pub valve: u64,
    pub server_got: u64,
    pub total: u64,
}

impl CategoryCounts {
    /// Count one kept line
    pub fn observe(&mut self, line: &str) {
        for category in Category::ALL {
            if category.matches(line) {
                *self.count_mut(category) += 1;
            }
        }
        self.total += 1;
    }

    /// Count for a single category
    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::SendReading => self.send_reading,
            Category::Hello => self.hello,
            Category::Valve => self.valve,
            Category::ServerGot => self.server_got,
        }
    }

    fn count_mut(&mut self, category: Category) -> &mut u64 {
        match category {
            Category::SendReading => &mut self.send_reading,
            Category::Hello => &mut self.hello,
            Category::Valve => &mut self.valve,
            Category::ServerGot => &mut self.server_got,
        }
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for CategoryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for category in Category::ALL {
            writeln!(f, "Count of '{}': {}", category.marker(), self.get(category))?;
        }
        write!(f, "Count of all lines: {}", self.total)
    }
}

/// Parse an elapsed-time field `h:m:s[.fff]` into seconds.
///
/// Hours and minutes must be integers; seconds may be fractional.
pub fn parse_elapsed(field: &str) -> Option<f64> {
    let mut parts = field.trim().split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let hours: u64 = h.parse().ok()?;
    let minutes: u64 = m.parse().ok()?;
    let seconds: f64 = s.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Parse a cutoff given either as `H:MM:SS[.mmm]` or as plain seconds
pub fn parse_cutoff(arg: &str) -> Result<f64> {
    let parsed = if arg.contains(':') {
        parse_elapsed(arg)
    } else {
        arg.trim().parse::<f64>().ok()
    };
    parsed
        .and_then(|secs| cutoff_from_secs(secs).ok())
        .ok_or_else(|| ReportError::InvalidCutoff(arg.to_string()))
}

/// Check a cutoff given directly in seconds
pub fn cutoff_from_secs(secs: f64) -> Result<f64> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err(ReportError::InvalidCutoff(secs.to_string()))
    }
}

/// Line-category report over a run log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogReport {
    cutoff_secs: f64,
}

impl Default for LogReport {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF_SECS)
    }
}

impl LogReport {
    /// Keep lines logged at or before `cutoff_secs` of simulated time
    pub fn new(cutoff_secs: f64) -> Self {
        Self { cutoff_secs }
    }

    /// Configured cutoff in seconds
    pub fn cutoff_secs(&self) -> f64 {
        self.cutoff_secs
    }

    /// Whether a raw log line is kept.
    ///
    /// Lines need at least three tab-separated fields and a parseable time.
    pub fn keeps(&self, line: &str) -> bool {
        let mut fields = line.split('\t');
        let time = fields.next();
        if fields.clone().count() < 2 {
            return false;
        }
        time.and_then(parse_elapsed)
            .map_or(false, |secs| secs <= self.cutoff_secs)
    }

    /// Count categories over every kept line of `reader`.
    ///
    /// Invalid UTF-8 is replaced rather than failing the report.
    pub fn analyze<R: BufRead>(&self, mut reader: R) -> Result<CategoryCounts> {
        let mut counts = CategoryCounts::default();
        let mut raw = Vec::new();

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&raw);
            if self.keeps(&line) {
                counts.observe(line.trim());
            }
        }

        Ok(counts)
    }

    /// Count categories in the log file at `path`
    pub fn analyze_file(&self, path: impl AsRef<Path>) -> Result<CategoryCounts> {
        let file = File::open(path)?;
        self.analyze(BufReader::new(file))
    }
}
