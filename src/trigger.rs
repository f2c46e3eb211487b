// valvewatch - Streaming trend monitor for sensor networks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Threshold decision and command emission.

use std::io::{self, Write};

use log::{info, warn};

use crate::protocol::{Command, NodeId};

/// Decides when a slope warrants opening a node's valve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerController {
    threshold: f64,
}

impl TriggerController {
    /// Create a controller firing on slopes strictly above `threshold`
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Configured threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The command to emit for `node_id`, if `slope` exceeds the threshold
    pub fn evaluate(&self, node_id: NodeId, slope: f64) -> Option<Command> {
        (slope > self.threshold).then(|| Command::open_valve(node_id))
    }

    /// Write `command` to `out` and flush it.
    ///
    /// Delivery is best-effort: the error is logged and handed back so the
    /// caller can count it, but it must not stop the window reset.
    pub fn send<W: Write + ?Sized>(&self, command: &Command, out: &mut W) -> io::Result<()> {
        info!("Triggering {} for node {}", command.kind, command.node_id);

        let line = command.encode();
        let result = out.write_all(line.as_bytes()).and_then(|()| out.flush());
        match &result {
            Ok(()) => info!("Sent command: {}", line.trim_end()),
            Err(e) => warn!(
                "Failed to send command {:?} to node {}: {}",
                line.trim_end(),
                command.node_id,
                e
            ),
        }
        result
    }
}
