// valvewatch Testdata - Node feeds
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Border-router log lines for a set of simulated nodes.

use crate::patterns::{SignalGenerator, SignalPattern};
use rand::prelude::*;
use rand::rngs::StdRng;
use valvewatch::NodeId;

/// Line the border router prints when a reading reaches it
pub fn reading_line(node: NodeId, value: u64) -> String {
    format!("PROCESS : Server got ID={}, value={}", node, value)
}

/// Routing chatter printed by a node joining the tree
pub fn hello_line(node: NodeId, rank: u32) -> String {
    format!("TREE : HELLO Node {}: broadcast rank {}", node, rank)
}

/// Round-robin feed of readings from several nodes
///
/// Each round yields one reading per node, in the order nodes were added.
/// With a chatter rate above zero, routing lines are mixed in after some
/// readings; the monitor must ignore them.
#[derive(Debug, Clone)]
pub struct NodeFeed {
    seed: u64,
    nodes: Vec<(NodeId, SignalGenerator)>,
    noise_std: f64,
    chatter_rate: f64,
    rng: StdRng,
}

impl NodeFeed {
    /// Empty feed with a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            nodes: Vec::new(),
            noise_std: 0.0,
            chatter_rate: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Add a node following `pattern`
    pub fn with_node(mut self, node: NodeId, pattern: SignalPattern) -> Self {
        self.add_node(node, pattern);
        self
    }

    /// Gaussian noise applied to nodes added after this call
    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    /// Probability of a routing line after each reading
    pub fn with_chatter(mut self, rate: f64) -> Self {
        self.chatter_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Add a node following `pattern`
    pub fn add_node(&mut self, node: NodeId, pattern: SignalPattern) {
        let seed = self.seed.wrapping_add(u64::from(node));
        let generator = SignalGenerator::new(pattern, seed).with_noise(self.noise_std);
        self.nodes.push((node, generator));
    }

    /// Node ids in feed order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|(id, _)| *id).collect()
    }

    /// Lines for one round
    pub fn next_round(&mut self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.nodes.len());
        for (node, generator) in &mut self.nodes {
            lines.push(reading_line(*node, generator.next_value()));
            if self.chatter_rate > 0.0 && self.rng.gen_bool(self.chatter_rate) {
                let rank = self.rng.gen_range(1..=4);
                lines.push(hello_line(*node, rank));
            }
        }
        lines
    }

    /// Lines for `rounds` consecutive rounds
    pub fn take_rounds(&mut self, rounds: usize) -> Vec<String> {
        (0..rounds).flat_map(|_| self.next_round()).collect()
    }
}
