// valvewatch - Streaming trend monitor for sensor networks
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Least-squares trend estimation over a full window.
//!
//! The independent variable is the sample position `0..N-1`, not elapsed
//! time, so irregularly spaced readings are fitted as if evenly spaced.
//!
//! ```text
//! Sx  = Σ i        Sxx = Σ i²        (fixed for a given N)
//! Sy  = Σ v_i      Sxy = Σ i·v_i
//! slope = (N·Sxy − Sx·Sy) / (N·Sxx − Sx²)
//! ```

/// Slope estimator with the position sums precomputed for one window size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeEstimator {
    n: usize,
    sum_i: f64,
    denominator: f64,
}

impl SlopeEstimator {
    /// Precompute the position sums for windows of `n` samples
    pub fn new(n: usize) -> Self {
        let (sum_i, sum_i2) = position_sums(n);
        let nf = n as f64;
        Self {
            n,
            sum_i,
            denominator: nf * sum_i2 - sum_i * sum_i,
        }
    }

    /// Window size the sums were computed for
    pub fn window_size(&self) -> usize {
        self.n
    }

    /// Fitted slope of `values`.
    ///
    /// Slices of another length fall back to [`least_squares_slope`].
    pub fn fit(&self, values: &[u64]) -> f64 {
        if values.len() != self.n {
            return least_squares_slope(values);
        }
        if self.n <= 1 {
            return 0.0;
        }

        let (sum_v, sum_iv) = value_sums(values);
        let numerator = self.n as f64 * sum_iv - self.sum_i * sum_v;
        numerator / self.denominator
    }
}

/// Position-indexed least-squares slope of any slice.
///
/// Returns `0.0` for fewer than two values.
pub fn least_squares_slope(values: &[u64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }

    let (sum_i, sum_i2) = position_sums(n);
    let (sum_v, sum_iv) = value_sums(values);
    let nf = n as f64;
    let denominator = nf * sum_i2 - sum_i * sum_i;
    if denominator == 0.0 {
        return 0.0;
    }
    (nf * sum_iv - sum_i * sum_v) / denominator
}

/// `(Σ i, Σ i²)` for `i in 0..n`
fn position_sums(n: usize) -> (f64, f64) {
    (0..n).fold((0.0, 0.0), |(s, s2), i| {
        let x = i as f64;
        (s + x, s2 + x * x)
    })
}

/// `(Σ v_i, Σ i·v_i)`
fn value_sums(values: &[u64]) -> (f64, f64) {
    values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sv, siv), (i, &v)| {
            let v = v as f64;
            (sv + v, siv + i as f64 * v)
        })
}
