//! The simulated particle.

use glam::{Vec2, Vec3};

/// Mass of every particle. Forces integrate as `velocity += force / mass * dt`.
pub const PARTICLE_MASS: f32 = 1.0;

/// A single point particle owned by the [`World`](crate::World).
///
/// Radius, color and lifetime are fixed when the particle is spawned;
/// only position and velocity change while it lives.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Position in pixels (x right, y down).
    pub position: Vec2,
    /// Velocity in pixels per second.
    pub velocity: Vec2,
    /// Disc radius in pixels (half of the emitter's particle size).
    pub radius: f32,
    /// RGB color, 0.0-1.0 per channel.
    pub color: Vec3,
    /// Simulation clock value at spawn.
    pub created_at: f32,
    /// Lifetime in seconds.
    pub lifetime: f32,
}

impl Particle {
    /// Seconds since spawn at simulation time `clock`.
    #[inline]
    pub fn age(&self, clock: f32) -> f32 {
        clock - self.created_at
    }

    /// A particle is live while its age is strictly below its lifetime.
    #[inline]
    pub fn is_alive(&self, clock: f32) -> bool {
        self.age(clock) < self.lifetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(created_at: f32, lifetime: f32) -> Particle {
        Particle {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            radius: 1.0,
            color: Vec3::ONE,
            created_at,
            lifetime,
        }
    }

    #[test]
    fn test_age_and_liveness() {
        let p = particle(1.0, 2.0);
        assert_eq!(p.age(1.5), 0.5);
        assert!(p.is_alive(2.9));
        // Expires exactly at age == lifetime
        assert!(!p.is_alive(3.0));
        assert!(!p.is_alive(10.0));
    }
}
