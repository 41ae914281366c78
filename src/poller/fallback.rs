//! Fallback sampling
//!
//! When a poll fails the dashboard can still be fed a synthetic count so
//! it keeps moving during demos. The strategy is injectable so tests and
//! production deployments can turn it off or make it deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

use crate::config::FallbackConfig;

/// Decides whether a failed poll produces a synthetic count
pub trait FallbackStrategy: Send {
    fn synthesize(&mut self) -> Option<u32>;
}

/// Never substitutes anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

impl FallbackStrategy for NoFallback {
    fn synthesize(&mut self) -> Option<u32> {
        None
    }
}

/// Substitutes a uniform random count with a fixed probability
#[derive(Debug, Clone)]
pub struct RandomFallback {
    rng: StdRng,
    probability: f64,
    range: RangeInclusive<u32>,
}

impl RandomFallback {
    pub fn new(probability: f64, range: RangeInclusive<u32>) -> Self {
        Self::with_rng(StdRng::from_os_rng(), probability, range)
    }

    pub fn seeded(seed: u64, probability: f64, range: RangeInclusive<u32>) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), probability, range)
    }

    fn with_rng(rng: StdRng, probability: f64, range: RangeInclusive<u32>) -> Self {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };

        // An inverted range would panic when sampled
        let (lo, hi) = (*range.start(), *range.end());
        let range = lo.min(hi)..=lo.max(hi);

        Self {
            rng,
            probability,
            range,
        }
    }
}

impl FallbackStrategy for RandomFallback {
    fn synthesize(&mut self) -> Option<u32> {
        if self.rng.random_bool(self.probability) {
            Some(self.rng.random_range(self.range.clone()))
        } else {
            None
        }
    }
}

/// Build the strategy described by the config
pub fn from_config(config: &FallbackConfig) -> Box<dyn FallbackStrategy> {
    if !config.enabled {
        return Box::new(NoFallback);
    }

    let range = config.min_count..=config.max_count;
    match config.seed {
        Some(seed) => Box::new(RandomFallback::seeded(seed, config.probability, range)),
        None => Box::new(RandomFallback::new(config.probability, range)),
    }
}
