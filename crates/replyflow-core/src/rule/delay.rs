//! Humanized reply delays.

use super::model::Rule;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Computes `fixed_delay + uniform(0, random_delay_max)` for a rule.
///
/// Each calculator owns its generator. Two calculators built with the same
/// seed produce the same sequence of delays for the same sequence of rules.
#[derive(Debug)]
pub struct DelayCalculator {
    rng: Mutex<StdRng>,
}

impl DelayCalculator {
    /// Seeded when `seed` is given, otherwise seeded from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    /// Restarts the sequence from `seed`.
    pub fn reseed(&self, seed: u64) {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        *rng = StdRng::seed_from_u64(seed);
    }

    /// Total delay in seconds, within [`DelayCalculator::delay_range`].
    pub fn calculate_delay(&self, rule: &Rule) -> f64 {
        let max = rule.random_delay_max();
        if max <= 0.0 {
            return rule.fixed_delay();
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rule.fixed_delay() + rng.gen_range(0.0..=max)
    }

    /// `(min, max)` delay in seconds.
    pub fn delay_range(&self, rule: &Rule) -> (f64, f64) {
        rule.total_delay_range()
    }
}

impl Default for DelayCalculator {
    fn default() -> Self {
        Self::new(None)
    }
}
