//! Protocol definitions for valvewatch
//!
//! This module defines the core types exchanged with the border router:
//! - Readings kept in the per-node windows
//! - Readings extracted from inbound text lines
//! - Control commands and their text wire format

use crate::error::CommandParseError;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Identifier of a sensor node
pub type NodeId = u32;

/// Code carried by every valve command
pub const OPEN_VALVE_CODE: u16 = 1;

/// A reading as stored in a node's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Instant the line was ingested (not a timestamp from the wire)
    pub arrival: Instant,
    /// The measured value
    pub value: u64,
}

impl Reading {
    /// Create a new reading
    pub fn new(arrival: Instant, value: u64) -> Self {
        Self { arrival, value }
    }
}

/// A `(node id, value)` pair found in an inbound line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorReading {
    /// Node that produced the value
    pub node_id: NodeId,
    /// The measured value
    pub value: u64,
}

impl SensorReading {
    /// Create a new sensor reading
    pub fn new(node_id: NodeId, value: u64) -> Self {
        Self { node_id, value }
    }
}

/// Command types understood by the border router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// Open the node's valve for its configured duration
    OpenValve = 3,
}

impl CommandType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            3 => Some(CommandType::OpenValve),
            _ => None,
        }
    }

    /// Wire number of this command type
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::OpenValve => write!(f, "OPEN_VALVE"),
        }
    }
}

/// A control command sent back over the telemetry stream
///
/// Encoded as the ASCII line `"<type> <node_id> <code>\n"`. Commands are
/// fire-and-forget: nothing is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub kind: CommandType,
    pub node_id: NodeId,
    pub code: u16,
}

impl Command {
    /// Build an `OPEN_VALVE` command for a node
    pub fn open_valve(node_id: NodeId) -> Self {
        Self {
            kind: CommandType::OpenValve,
            node_id,
            code: OPEN_VALVE_CODE,
        }
    }

    /// Encode as a newline-terminated text line
    pub fn encode(&self) -> String {
        format!("{} {} {}\n", self.kind.as_u8(), self.node_id, self.code)
    }

    /// Encode as ASCII bytes ready to be written to the stream
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} node={} code={}", self.kind, self.node_id, self.code)
    }
}

impl FromStr for Command {
    type Err = CommandParseError;

    /// Parse `"<type> <node> <code>"`, ignoring surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(CommandParseError::FieldCount(fields.len()));
        }

        let raw_type: u8 = parse_field("type", fields[0])?;
        let node_id: NodeId = parse_field("node", fields[1])?;
        let code: u16 = parse_field("code", fields[2])?;

        let kind = CommandType::from_u8(raw_type).ok_or(CommandParseError::UnknownType(raw_type))?;

        Ok(Self {
            kind,
            node_id,
            code,
        })
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, CommandParseError> {
    value.parse().map_err(|_| CommandParseError::InvalidField {
        field,
        value: value.to_string(),
    })
}
