// valvewatch - Streaming trend monitor for sensor networks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sliding window management for node readings.
//!
//! Each node owns a bounded window, pruned by age before every append and
//! by count on the append itself. All windows live in one [`NodeRegistry`]
//! behind a single coarse lock held by [`WindowStore`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::config::WindowConfig;
use crate::protocol::{NodeId, Reading};

/// Recent readings of one node, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Window {
    samples: VecDeque<Reading>,
}

impl Window {
    /// Create an empty window with room for `capacity` readings
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Prune expired readings, append, then enforce the size bound.
    ///
    /// Returns the value snapshot when the window holds exactly
    /// `config.size` readings afterwards.
    fn record(&mut self, reading: Reading, config: &WindowConfig) -> Option<Vec<u64>> {
        self.prune_expired(reading.arrival, config);

        self.samples.push_back(reading);
        while self.samples.len() > config.size {
            self.samples.pop_front();
        }

        (self.samples.len() == config.size).then(|| self.values())
    }

    fn prune_expired(&mut self, now: Instant, config: &WindowConfig) {
        while let Some(front) = self.samples.front() {
            if now.saturating_duration_since(front.arrival) > config.expiry {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Values in arrival order
    pub fn values(&self) -> Vec<u64> {
        self.samples.iter().map(|r| r.value).collect()
    }

    /// Readings in arrival order
    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.samples.iter()
    }

    /// Number of readings held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the window is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop every reading
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Windows of every node seen so far.
///
/// Entries are created on the first reading of a node and never removed;
/// a reset leaves an empty window behind.
#[derive(Debug)]
pub struct NodeRegistry {
    windows: HashMap<NodeId, Window>,
    config: WindowConfig,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new(config: WindowConfig) -> Self {
        Self {
            windows: HashMap::new(),
            config,
        }
    }

    /// Record `value` for `node_id` as arriving at `now`.
    ///
    /// Returns the ordered values when the node's window is exactly full.
    pub fn record(&mut self, node_id: NodeId, value: u64, now: Instant) -> Option<Vec<u64>> {
        let capacity = self.config.size;
        self.windows
            .entry(node_id)
            .or_insert_with(|| Window::with_capacity(capacity))
            .record(Reading::new(now, value), &self.config)
    }

    /// Empty the window of `node_id`
    pub fn reset(&mut self, node_id: NodeId) {
        if let Some(window) = self.windows.get_mut(&node_id) {
            window.clear();
        }
    }

    /// Window of a node, if it has ever reported
    pub fn window(&self, node_id: NodeId) -> Option<&Window> {
        self.windows.get(&node_id)
    }

    /// Number of readings held for a node (0 for unknown nodes)
    pub fn len(&self, node_id: NodeId) -> usize {
        self.windows.get(&node_id).map_or(0, Window::len)
    }

    /// Values held for a node, oldest first
    pub fn values(&self, node_id: NodeId) -> Vec<u64> {
        self.windows
            .get(&node_id)
            .map(Window::values)
            .unwrap_or_default()
    }

    /// Get the number of known nodes
    pub fn node_count(&self) -> usize {
        self.windows.len()
    }

    /// Known node ids, sorted
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.windows.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Get total reading count across all nodes
    pub fn total_readings(&self) -> usize {
        self.windows.values().map(Window::len).sum()
    }

    /// Window configuration in effect
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }
}

/// The node registry behind one process-wide lock.
///
/// Constructed once at start-up and shared by reference with the ingestion
/// thread. Callers that must decide and act atomically (record, fit, send,
/// reset) take the guard from [`WindowStore::lock`] and do it all under it.
#[derive(Debug)]
pub struct WindowStore {
    registry: Mutex<NodeRegistry>,
}

impl WindowStore {
    /// Create a store for the given window configuration
    pub fn new(config: WindowConfig) -> Self {
        Self {
            registry: Mutex::new(NodeRegistry::new(config)),
        }
    }

    /// Acquire the registry lock.
    ///
    /// A poisoned lock is recovered: every registry operation leaves the
    /// windows consistent, so a panic elsewhere cannot corrupt them.
    pub fn lock(&self) -> MutexGuard<'_, NodeRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a reading under the lock
    pub fn record(&self, node_id: NodeId, value: u64, now: Instant) -> Option<Vec<u64>> {
        self.lock().record(node_id, value, now)
    }

    /// Reset a node's window under the lock
    pub fn reset(&self, node_id: NodeId) {
        self.lock().reset(node_id);
    }

    /// Number of readings held for a node
    pub fn len(&self, node_id: NodeId) -> usize {
        self.lock().len(node_id)
    }

    /// Values held for a node, oldest first
    pub fn values(&self, node_id: NodeId) -> Vec<u64> {
        self.lock().values(node_id)
    }

    /// Get the number of known nodes
    pub fn node_count(&self) -> usize {
        self.lock().node_count()
    }

    /// Known node ids, sorted
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.lock().node_ids()
    }
}
