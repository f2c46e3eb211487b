// valvewatch Testdata - Signal patterns
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Signal pattern generators for synthetic node readings.
//!
//! Patterns are indexed by reading number rather than time, matching how the
//! monitor fits its slope.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Signal pattern definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalPattern {
    /// Constant value.
    Constant { value: f64 },

    /// Linear trend.
    ///
    /// `value = start + step * n`
    Linear { start: f64, step: f64 },

    /// Random walk (Brownian motion).
    RandomWalk { start: f64, step_std: f64 },

    /// Sawtooth wave (linear ramp with reset every `period` readings).
    Sawtooth { min: f64, max: f64, period: u64 },
}

impl SignalPattern {
    /// Evaluate the pattern for the `n`-th reading.
    ///
    /// `RandomWalk` needs state; use [`SignalGenerator`] for it. Here it
    /// returns its start value.
    pub fn evaluate(&self, n: u64) -> f64 {
        match self {
            SignalPattern::Constant { value } => *value,
            SignalPattern::Linear { start, step } => start + step * n as f64,
            SignalPattern::RandomWalk { start, .. } => *start,
            SignalPattern::Sawtooth { min, max, period } => {
                let period = (*period).max(1);
                let fraction = (n % period) as f64 / period as f64;
                min + (max - min) * fraction
            }
        }
    }
}

/// Stateful, seeded generator of integer readings for one node
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    pattern: SignalPattern,
    noise_std: f64,
    rng: StdRng,
    walk: Option<f64>,
    n: u64,
}

impl SignalGenerator {
    /// Create a generator for `pattern`, seeded for reproducibility
    pub fn new(pattern: SignalPattern, seed: u64) -> Self {
        Self {
            pattern,
            noise_std: 0.0,
            rng: StdRng::seed_from_u64(seed),
            walk: None,
            n: 0,
        }
    }

    /// Add zero-mean gaussian noise with the given standard deviation
    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    /// Next reading, rounded and clamped at zero
    pub fn next_value(&mut self) -> u64 {
        let base = match self.pattern {
            SignalPattern::RandomWalk { start, step_std } => {
                let next = match self.walk {
                    None => start,
                    Some(prev) => prev + gaussian(&mut self.rng, step_std),
                };
                self.walk = Some(next);
                next
            }
            ref pattern => pattern.evaluate(self.n),
        };
        self.n += 1;

        let value = base + gaussian(&mut self.rng, self.noise_std);
        value.round().max(0.0) as u64
    }

    /// Readings produced so far
    pub fn produced(&self) -> u64 {
        self.n
    }
}

fn gaussian(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    Normal::new(0.0, std_dev)
        .map(|dist| dist.sample(rng))
        .unwrap_or(0.0)
}
