// valvewatch - Streaming trend monitor for sensor networks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! The ingestion pipeline.
//!
//! Bytes from the stream go through the [`LineFramer`], each line through
//! [`extract`], and every reading into the shared [`WindowStore`]. When a
//! node's window is full its slope is fitted and, above the threshold, an
//! `OPEN_VALVE` command is written back and the window reset.
//!
//! The command write happens while the registry lock is held. With a single
//! producer this costs nothing, but a stalled peer also stalls every window
//! update until the write returns.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};

use crate::error::Result;
use crate::extract::extract;
use crate::framer::LineFramer;
use crate::protocol::{Command, SensorReading};
use crate::slope::SlopeEstimator;
use crate::trigger::TriggerController;
use crate::window::WindowStore;

/// Default size of each socket read
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Point-in-time copy of the ingestion counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestMetrics {
    /// Total bytes read from the stream
    pub bytes_received: u64,
    /// Complete lines framed
    pub lines: u64,
    /// Lines carrying a reading
    pub readings: u64,
    /// Lines without a reading
    pub ignored: u64,
    /// Slopes computed over full windows
    pub evaluations: u64,
    /// Commands emitted
    pub triggers: u64,
    /// Commands whose write failed
    pub failed_writes: u64,
}

/// Ingestion counters, shared between the ingestion and supervisor threads
#[derive(Debug, Default)]
pub struct IngestStats {
    bytes_received: AtomicU64,
    lines: AtomicU64,
    readings: AtomicU64,
    ignored: AtomicU64,
    evaluations: AtomicU64,
    triggers: AtomicU64,
    failed_writes: AtomicU64,
}

impl IngestStats {
    /// Copy the current counter values
    pub fn snapshot(&self) -> IngestMetrics {
        IngestMetrics {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            lines: self.lines.load(Ordering::Relaxed),
            readings: self.readings.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            triggers: self.triggers.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

/// What a single line did to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// No reading in the line; nothing changed
    Ignored,
    /// Reading stored, window not full
    Recorded(SensorReading),
    /// Window full, slope at or below the threshold
    Evaluated { reading: SensorReading, slope: f64 },
    /// Slope above the threshold: command emitted and window reset
    Triggered {
        reading: SensorReading,
        slope: f64,
        command: Command,
        delivered: bool,
    },
}

/// Line-to-command processing shared by the ingestion loop
#[derive(Debug)]
pub struct Pipeline {
    store: Arc<WindowStore>,
    estimator: SlopeEstimator,
    controller: TriggerController,
    stats: Arc<IngestStats>,
    read_chunk: usize,
}

impl Pipeline {
    /// Create a pipeline over `store`, firing on slopes above `threshold`
    pub fn new(store: Arc<WindowStore>, threshold: f64) -> Self {
        let window_size = store.lock().config().size;
        Self {
            store,
            estimator: SlopeEstimator::new(window_size),
            controller: TriggerController::new(threshold),
            stats: Arc::new(IngestStats::default()),
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }

    /// Use reads of `read_chunk` bytes
    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk.max(1);
        self
    }

    /// Shared counters, readable from other threads
    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// The store this pipeline records into
    pub fn store(&self) -> &Arc<WindowStore> {
        &self.store
    }

    /// Process one framed line that arrived at `now`.
    ///
    /// Commands are written to `out`; a failed write is counted and logged,
    /// and the window is reset regardless.
    pub fn handle_line<W: Write + ?Sized>(&self, line: &str, now: Instant, out: &mut W) -> LineOutcome {
        IngestStats::bump(&self.stats.lines, 1);

        let Some(reading) = extract(line) else {
            IngestStats::bump(&self.stats.ignored, 1);
            return LineOutcome::Ignored;
        };
        IngestStats::bump(&self.stats.readings, 1);

        let node_id = reading.node_id;
        let mut registry = self.store.lock();
        let Some(values) = registry.record(node_id, reading.value, now) else {
            return LineOutcome::Recorded(reading);
        };

        let slope = self.estimator.fit(&values);
        IngestStats::bump(&self.stats.evaluations, 1);
        debug!("Node {}: slope={:.3} based on {} pts", node_id, slope, values.len());

        let Some(command) = self.controller.evaluate(node_id, slope) else {
            return LineOutcome::Evaluated { reading, slope };
        };

        let delivered = self.controller.send(&command, out).is_ok();
        if !delivered {
            IngestStats::bump(&self.stats.failed_writes, 1);
        }
        registry.reset(node_id);
        IngestStats::bump(&self.stats.triggers, 1);

        LineOutcome::Triggered {
            reading,
            slope,
            command,
            delivered,
        }
    }

    /// Blocking ingestion loop.
    ///
    /// Returns `Ok(())` when the peer closes the stream. Any other read
    /// error is logged and ends the loop; there is no reconnect.
    pub fn run<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        let mut framer = LineFramer::new();
        let mut chunk = vec![0u8; self.read_chunk];

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => {
                    info!("Connection closed by peer, stopping ingestion");
                    return Ok(());
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Error in ingestion loop: {}", e);
                    return Err(e.into());
                }
            };
            IngestStats::bump(&self.stats.bytes_received, n as u64);

            for line in framer.feed(&chunk[..n]) {
                self.handle_line(&line, Instant::now(), &mut writer);
            }
        }
    }
}
