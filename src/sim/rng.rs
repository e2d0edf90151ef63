//! Shared uniform random source
//!
//! Every stochastic decision in a session (deck draw, spawn lottery, ailment
//! and wall rolls) pulls from one injected source so a fixed seed replays
//! the whole run.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// A uniform generator over `[0, 1)`
pub trait RandomSource {
    fn generate(&mut self) -> f32;
}

/// Seeded PCG generator used by real sessions
#[derive(Debug, Clone)]
pub struct SessionRng {
    inner: Pcg32,
}

impl SessionRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SessionRng {
    fn generate(&mut self) -> f32 {
        self.inner.random::<f32>()
    }
}

/// Replays a fixed list of draws, cycling when exhausted
///
/// Values are clamped into `[0, 1)`. An empty list always yields `0.0`.
#[derive(Debug, Clone, Default)]
pub struct SequenceRng {
    values: Vec<f32>,
    cursor: usize,
}

impl SequenceRng {
    pub fn new(values: impl Into<Vec<f32>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// Number of draws taken so far
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRng {
    fn generate(&mut self) -> f32 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v.clamp(0.0, 1.0 - f32::EPSILON)
    }
}

/// Uniform integer in `[min, max_inclusive]`
pub fn rand_int(rng: &mut dyn RandomSource, min: usize, max_inclusive: usize) -> usize {
    if max_inclusive <= min {
        return min;
    }
    let span = max_inclusive - min + 1;
    let pick = (rng.generate() * span as f32) as usize;
    min + pick.min(span - 1)
}

/// Cumulative-weight lottery over a snapshot of weights
///
/// Returns `None` for an empty slice. Falls back to the last index when
/// rounding leaves the remainder positive.
pub fn weighted_index(rng: &mut dyn RandomSource, weights: &[f32]) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f32 = weights.iter().map(|w| w.max(0.0)).sum();
    let mut r = rng.generate() * total;
    for (i, w) in weights.iter().enumerate() {
        r -= w.max(0.0);
        if r <= 0.0 {
            return Some(i);
        }
    }
    Some(weights.len() - 1)
}
