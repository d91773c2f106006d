//! Random source for particle spawning and field setup.
//!
//! All randomness in a run (emission angles, vortex drift directions) comes
//! from one [`SpawnContext`] owned by the world, so a seeded run is fully
//! reproducible.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Seedable random source with helpers for the spawn patterns the world needs.
#[derive(Debug, Clone)]
pub struct SpawnContext {
    rng: SmallRng,
}

impl SpawnContext {
    /// Create a context. With `None`, the seed is derived from the wall clock
    /// so every run differs; pass a seed for reproducible output.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Random f32 in `[min, max]`. Returns `min` for an empty range.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        }
    }

    /// Uniform random angle (radians) within `spread` centered on `direction`.
    pub fn angle_in_spread(&mut self, direction: f32, spread: f32) -> f32 {
        let half = spread.abs() * 0.5;
        self.random_range(direction - half, direction + half)
    }

    /// Random direction on the unit circle.
    pub fn random_unit_vec2(&mut self) -> Vec2 {
        let theta = self.rng.gen_range(0.0..TAU);
        Vec2::new(theta.cos(), theta.sin())
    }
}
