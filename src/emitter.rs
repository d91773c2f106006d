//! Particle emitters.
//!
//! An emitter is a fixed descriptor (where, which way, how fast, what color)
//! plus one piece of state: a fractional emission accumulator. Each sub-step
//! the accumulator gains `rate * dt`; its whole part is the number of
//! particles to spawn and the remainder carries over to the next sub-step.
//!
//! # Modulation
//!
//! An emitter may wobble over time. When a [`Modulation`] is configured,
//! [`Emitter::modulate`] recomputes the effective position and direction as
//! `base + amplitude * sin(2π * frequency * t)` per axis. The base values
//! never change, so modulation is a per-frame override.
//!
//! # Example
//!
//! ```
//! use particle_mask::{Emitter, EmitterConfig};
//! use particle_mask::spawn::SpawnContext;
//!
//! let config = EmitterConfig {
//!     emission_rate: 30.0,
//!     ..EmitterConfig::default()
//! };
//! let mut emitter = Emitter::from_config(&config, 0, 100, 100, 4.0).unwrap();
//! let mut rng = SpawnContext::new(Some(1));
//!
//! let count = emitter.accumulate(0.1);
//! assert_eq!(count, 3);
//! let particle = emitter.spawn(&mut rng, 0.0);
//! assert_eq!(particle.position, emitter.position());
//! ```

use crate::config::EmitterConfig;
use crate::error::{ConfigError, Result};
use crate::particle::Particle;
use crate::spawn::SpawnContext;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Slack used when extracting whole particles from the accumulator, so
/// `rate * dt` sums that land a hair under an integer still count.
pub const EMISSION_EPSILON: f32 = 1e-4;

/// Sinusoidal wobble of an emitter's position and direction.
///
/// Position amplitudes are in normalized frame units, the direction
/// amplitude in degrees. Frequencies are in Hz.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Modulation {
    /// Horizontal wobble frequency.
    #[serde(rename = "emitter_x_frequency")]
    pub x_frequency: f32,
    /// Horizontal wobble amplitude.
    #[serde(rename = "emitter_x_amplitude")]
    pub x_amplitude: f32,
    /// Vertical wobble frequency.
    #[serde(rename = "emitter_y_frequency")]
    pub y_frequency: f32,
    /// Vertical wobble amplitude.
    #[serde(rename = "emitter_y_amplitude")]
    pub y_amplitude: f32,
    /// Direction wobble frequency.
    pub direction_frequency: f32,
    /// Direction wobble amplitude.
    pub direction_amplitude: f32,
}

impl Modulation {
    #[inline]
    fn wave(frequency: f32, amplitude: f32, t: f32) -> f32 {
        amplitude * (TAU * frequency * t).sin()
    }
}

/// A configured emitter with its emission accumulator.
#[derive(Clone, Debug)]
pub struct Emitter {
    /// Index in the run's emitter list (for logging).
    index: usize,
    /// Frame size in pixels, for scaling normalized positions.
    frame_size: Vec2,
    /// Unmodulated position, normalized 0..1.
    base_position: Vec2,
    /// Unmodulated direction in degrees.
    base_direction: f32,
    /// Effective position in pixels.
    position: Vec2,
    /// Effective direction in degrees.
    direction: f32,
    /// Full spread angle in degrees.
    spread: f32,
    speed: f32,
    particle_size: f32,
    color: Vec3,
    rate: f32,
    initial_burst: f32,
    lifetime: f32,
    modulation: Option<Modulation>,
    /// Fractional particles owed; always in [0, 1) after `accumulate`.
    accumulator: f32,
}

impl Emitter {
    /// Build an emitter for a `width` x `height` frame.
    ///
    /// `default_lifetime` applies unless the descriptor overrides it.
    /// Fails on a malformed color or an out-of-range parameter.
    pub fn from_config(
        config: &EmitterConfig,
        index: usize,
        width: u32,
        height: u32,
        default_lifetime: f32,
    ) -> Result<Self> {
        config.validate(index)?;
        let color = config.color.to_rgb()?;
        let lifetime = config.lifetime.unwrap_or(default_lifetime);
        if !(lifetime > 0.0) {
            return Err(ConfigError::invalid(
                format!("emitters[{index}].lifetime"),
                "must be > 0",
            ));
        }

        let frame_size = Vec2::new(width as f32, height as f32);
        let base_position = Vec2::new(config.emitter_x, config.emitter_y);
        Ok(Self {
            index,
            frame_size,
            base_position,
            base_direction: config.particle_direction,
            position: base_position * frame_size,
            direction: config.particle_direction,
            spread: config.particle_spread,
            speed: config.particle_speed,
            particle_size: config.particle_size,
            color,
            rate: config.emission_rate,
            initial_burst: config.initial_plume,
            lifetime,
            modulation: config.movement,
            accumulator: 0.0,
        })
    }

    /// Number of particles each emitter spawns up front:
    /// `floor(max_particles * fraction / emitter_count)`.
    pub fn burst_count(max_particles: u32, fraction: f32, emitter_count: usize) -> u32 {
        if emitter_count == 0 {
            return 0;
        }
        let share = max_particles as f32 * fraction / emitter_count as f32;
        share.floor().max(0.0) as u32
    }

    /// Add `rate * dt` to the accumulator and take out the whole particles.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += self.rate * dt;
        let whole = (self.accumulator + EMISSION_EPSILON).floor();
        self.accumulator = (self.accumulator - whole).max(0.0);
        whole as u32
    }

    /// Create one particle at the emitter's effective position.
    ///
    /// The heading is drawn uniformly from `direction ± spread / 2`.
    pub fn spawn(&self, rng: &mut SpawnContext, clock: f32) -> Particle {
        let angle = rng.angle_in_spread(self.direction.to_radians(), self.spread.to_radians());
        Particle {
            position: self.position,
            velocity: Vec2::new(angle.cos(), angle.sin()) * self.speed,
            radius: self.particle_size * 0.5,
            color: self.color,
            created_at: clock,
            lifetime: self.lifetime,
        }
    }

    /// Recompute the effective position and direction for time `t` seconds.
    /// Without a modulation this is a no-op.
    pub fn modulate(&mut self, t: f32) {
        let Some(m) = self.modulation else {
            return;
        };
        let offset = Vec2::new(
            Modulation::wave(m.x_frequency, m.x_amplitude, t),
            Modulation::wave(m.y_frequency, m.y_amplitude, t),
        );
        self.position = (self.base_position + offset) * self.frame_size;
        self.direction =
            self.base_direction + Modulation::wave(m.direction_frequency, m.direction_amplitude, t);
    }

    /// Index in the run's emitter list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Effective position in pixels.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Effective direction in degrees.
    pub fn direction(&self) -> f32 {
        self.direction
    }

    /// Particle size (diameter) in pixels.
    pub fn particle_size(&self) -> f32 {
        self.particle_size
    }

    /// Fraction of the particle cap spawned at setup.
    pub fn initial_burst(&self) -> f32 {
        self.initial_burst
    }

    /// Current fractional emission debt.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorSpec;

    fn config() -> EmitterConfig {
        EmitterConfig {
            emitter_x: 0.25,
            emitter_y: 0.5,
            particle_direction: 0.0,
            particle_spread: 0.0,
            particle_speed: 10.0,
            particle_size: 6.0,
            color: ColorSpec::Encoded("(255, 0, 0)".into()),
            emission_rate: 30.0,
            initial_plume: 0.0,
            movement: None,
            lifetime: None,
        }
    }

    #[test]
    fn test_from_config_scales_position() {
        let emitter = Emitter::from_config(&config(), 0, 200, 100, 4.0).unwrap();
        assert_eq!(emitter.position(), Vec2::new(50.0, 50.0));
        assert_eq!(emitter.accumulator(), 0.0);
    }

    #[test]
    fn test_accumulate_carries_remainder() {
        let mut emitter = Emitter::from_config(&config(), 0, 100, 100, 4.0).unwrap();
        let sub_dt = 1.0 / 150.0;
        let mut total = 0;
        for step in 1..=150 {
            total += emitter.accumulate(sub_dt);
            assert!((0.0..1.0).contains(&emitter.accumulator()));
            if step % 5 == 0 {
                assert_eq!(total, step / 5, "one particle per frame");
            }
        }
        assert_eq!(total, 30);
    }

    #[test]
    fn test_accumulate_large_step() {
        let mut emitter = Emitter::from_config(&config(), 0, 100, 100, 4.0).unwrap();
        assert_eq!(emitter.accumulate(0.5), 15);
        assert!(emitter.accumulator() < 1.0);
    }

    #[test]
    fn test_zero_rate_never_emits() {
        let mut cfg = config();
        cfg.emission_rate = 0.0;
        let mut emitter = Emitter::from_config(&cfg, 0, 100, 100, 4.0).unwrap();
        for _ in 0..1000 {
            assert_eq!(emitter.accumulate(0.01), 0);
        }
    }

    #[test]
    fn test_spawn_straight_line() {
        let emitter = Emitter::from_config(&config(), 0, 100, 100, 4.0).unwrap();
        let mut rng = SpawnContext::new(Some(9));
        let p = emitter.spawn(&mut rng, 1.5);
        assert_eq!(p.velocity, Vec2::new(10.0, 0.0));
        assert_eq!(p.radius, 3.0);
        assert_eq!(p.color, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(p.created_at, 1.5);
        assert_eq!(p.lifetime, 4.0);
    }

    #[test]
    fn test_spawn_respects_spread() {
        let mut cfg = config();
        cfg.particle_direction = 90.0;
        cfg.particle_spread = 40.0;
        let emitter = Emitter::from_config(&cfg, 0, 100, 100, 4.0).unwrap();
        let mut rng = SpawnContext::new(Some(2));
        for _ in 0..500 {
            let p = emitter.spawn(&mut rng, 0.0);
            let heading = p.velocity.y.atan2(p.velocity.x).to_degrees();
            assert!((69.99..=110.01).contains(&heading), "heading {heading}");
            assert!((p.velocity.length() - 10.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_lifetime_override() {
        let mut cfg = config();
        cfg.lifetime = Some(1.25);
        let emitter = Emitter::from_config(&cfg, 0, 100, 100, 4.0).unwrap();
        let mut rng = SpawnContext::new(Some(1));
        assert_eq!(emitter.spawn(&mut rng, 0.0).lifetime, 1.25);
    }

    #[test]
    fn test_bad_color_rejected() {
        let mut cfg = config();
        cfg.color = ColorSpec::Encoded("red".into());
        assert!(matches!(
            Emitter::from_config(&cfg, 0, 100, 100, 4.0),
            Err(ConfigError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_modulation() {
        let mut cfg = config();
        cfg.movement = Some(Modulation {
            x_frequency: 1.0,
            x_amplitude: 0.25,
            direction_frequency: 0.5,
            direction_amplitude: 90.0,
            ..Modulation::default()
        });
        let mut emitter = Emitter::from_config(&cfg, 0, 100, 100, 4.0).unwrap();

        // Quarter period: sin = 1
        emitter.modulate(0.25);
        assert!((emitter.position().x - 50.0).abs() < 1e-3);
        assert!((emitter.position().y - 50.0).abs() < 1e-3);
        assert!((emitter.direction() - 90.0 * (TAU * 0.125).sin()).abs() < 1e-3);

        // Override, not accumulation: t = 0 returns to base
        emitter.modulate(0.0);
        assert!((emitter.position().x - 25.0).abs() < 1e-4);
        assert_eq!(emitter.direction(), 0.0);
    }

    #[test]
    fn test_modulate_without_movement_is_noop() {
        let mut emitter = Emitter::from_config(&config(), 0, 100, 100, 4.0).unwrap();
        emitter.modulate(3.7);
        assert_eq!(emitter.position(), Vec2::new(25.0, 50.0));
    }

    #[test]
    fn test_burst_count() {
        assert_eq!(Emitter::burst_count(200, 0.5, 3), 33);
        assert_eq!(Emitter::burst_count(200, 0.0, 3), 0);
        assert_eq!(Emitter::burst_count(0, 1.0, 2), 0);
        assert_eq!(Emitter::burst_count(10, 1.0, 0), 0);
    }
}
