//! Error types for valvewatch
//!
//! This module defines all error types used throughout the library.

use std::io;
use thiserror::Error;

/// Result type alias for valvewatch operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// I/O error on the telemetry stream
    #[error("Stream I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connecting to the telemetry endpoint failed with something other than a refusal
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The reconnect policy ran out of attempts
    #[error("Gave up connecting to {addr} after {attempts} attempts")]
    RetriesExhausted { addr: String, attempts: u32 },

    /// The ingestion thread panicked
    #[error("Ingestion thread panicked")]
    IngestPanicked,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed command line
    #[error("Command error: {0}")]
    CommandParse(#[from] CommandParseError),
}

/// Errors while parsing a `<type> <node> <code>` command line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    /// Wrong number of whitespace-separated fields
    #[error("Expected 3 fields, got {0}")]
    FieldCount(usize),

    /// A field is not an unsigned integer
    #[error("Invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// Type number with no known command
    #[error("Unknown command type: {0}")]
    UnknownType(u8),
}
