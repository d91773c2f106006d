//! Force fields acting on particles.
//!
//! Three kinds of field shape particle motion:
//!
//! - **Uniform field**: wind plus gravity, the same everywhere.
//! - **Gravity wells**: localized attract/repel sources. Forces from all wells
//!   within range are summed.
//! - **Vortices**: localized swirls that *set* a particle's velocity instead of
//!   adding to it, which keeps the swirl visually stable. Vortices also drift
//!   across the frame and bounce off its edges.
//!
//! Every localized source has a hard cutoff: at or beyond its radius it
//! contributes exactly nothing.
//!
//! # Overlapping vortices
//!
//! When several vortices reach the same particle, each one overwrites the
//! velocity set by the previous one, so the last vortex in list order wins.
//!
//! # Example
//!
//! ```
//! use particle_mask::field::{FieldRegistry, GravityWell, UniformField, WellPolarity};
//! use particle_mask::Vec2;
//!
//! let mut fields = FieldRegistry::new(UniformField::new(0.0, 0.0, 9.8));
//! fields.add_well(GravityWell::new(Vec2::new(50.0, 50.0), 100.0, 20.0, WellPolarity::Attract));
//!
//! let force = fields.net_force(Vec2::new(60.0, 50.0));
//! assert!(force.x < 0.0); // pulled toward the well
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Whether a gravity well pulls particles in or pushes them away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellPolarity {
    /// Pull toward the well center.
    #[default]
    Attract,
    /// Push away from the well center.
    Repel,
}

/// A localized attract/repel force source. Fixed in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravityWell {
    /// Center in pixels.
    pub position: Vec2,
    /// Force at the center (before the global multiplier).
    pub strength: f32,
    /// Radius of influence in pixels.
    pub radius: f32,
    /// Attract or repel.
    pub polarity: WellPolarity,
}

impl GravityWell {
    /// Create a well.
    pub fn new(position: Vec2, strength: f32, radius: f32, polarity: WellPolarity) -> Self {
        Self {
            position,
            strength,
            radius,
            polarity,
        }
    }

    /// Force this well applies at `point`, scaled by `multiplier`.
    ///
    /// Magnitude falls off linearly from `strength` at the center to zero at
    /// the radius. A particle exactly on the center gets no force.
    pub fn force_at(&self, point: Vec2, multiplier: f32) -> Vec2 {
        let offset = self.position - point;
        let distance = offset.length();
        if distance >= self.radius {
            return Vec2::ZERO;
        }
        let magnitude = self.strength * (1.0 - distance / self.radius) * multiplier;
        let direction = match self.polarity {
            WellPolarity::Attract => offset.normalize_or_zero(),
            WellPolarity::Repel => -offset.normalize_or_zero(),
        };
        direction * magnitude
    }
}

/// A drifting swirl field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vortex {
    /// Current center in pixels.
    pub position: Vec2,
    /// Drift velocity of the center in pixels per second.
    pub velocity: Vec2,
    /// Swirl speed.
    pub strength: f32,
    /// Radius of influence in pixels.
    pub radius: f32,
    /// Speed of the inward pull toward the center, as a fraction of `strength`.
    pub inward_factor: f32,
}

impl Vortex {
    /// Create a vortex.
    pub fn new(
        position: Vec2,
        velocity: Vec2,
        strength: f32,
        radius: f32,
        inward_factor: f32,
    ) -> Self {
        Self {
            position,
            velocity,
            strength,
            radius,
            inward_factor,
        }
    }

    /// Velocity this vortex imposes on a particle at `point`, or `None` when
    /// the point is out of range.
    ///
    /// The tangential part grows linearly from zero at the center to
    /// `strength` at the radius; the radial part pulls inward at
    /// `strength * inward_factor`.
    pub fn velocity_at(&self, point: Vec2) -> Option<Vec2> {
        let offset = point - self.position;
        let distance = offset.length();
        if distance >= self.radius {
            return None;
        }
        let tangent = offset.perp().normalize_or_zero();
        let radial = -offset.normalize_or_zero();
        let tangential = tangent * self.strength * (distance / self.radius);
        let inward = radial * self.strength * self.inward_factor;
        Some(tangential + inward)
    }

    /// Move the center by its drift velocity and bounce off the frame edges.
    ///
    /// A velocity component is negated when the center has crossed the
    /// matching edge while still heading outward; the center is then clamped
    /// back onto the frame.
    pub fn drift(&mut self, dt: f32, width: f32, height: f32) {
        self.position += self.velocity * dt;

        if (self.position.x < 0.0 && self.velocity.x < 0.0)
            || (self.position.x > width && self.velocity.x > 0.0)
        {
            self.velocity.x = -self.velocity.x;
        }
        if (self.position.y < 0.0 && self.velocity.y < 0.0)
            || (self.position.y > height && self.velocity.y > 0.0)
        {
            self.velocity.y = -self.velocity.y;
        }
        self.position = self.position.clamp(Vec2::ZERO, Vec2::new(width, height));
    }
}

/// Position-independent wind and gravity.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct UniformField {
    /// Wind acceleration along `wind_direction`.
    pub wind_strength: f32,
    /// Wind heading in degrees (0 = +x, 90 = +y).
    pub wind_direction: f32,
    /// Gravity along +y (downward in image space).
    pub gravity: f32,
}

impl UniformField {
    /// Create a uniform field.
    pub fn new(wind_strength: f32, wind_direction: f32, gravity: f32) -> Self {
        Self {
            wind_strength,
            wind_direction,
            gravity,
        }
    }

    /// The combined acceleration vector.
    pub fn acceleration(&self) -> Vec2 {
        let heading = self.wind_direction.to_radians();
        Vec2::new(heading.cos(), heading.sin()) * self.wind_strength + Vec2::new(0.0, self.gravity)
    }
}

/// All force sources of a run.
///
/// Owned by the [`World`](crate::World). Wells and the uniform field are
/// pure functions of position; vortex positions are the only state and
/// advance through [`FieldRegistry::advance`].
#[derive(Clone, Debug)]
pub struct FieldRegistry {
    uniform: UniformField,
    wells: Vec<GravityWell>,
    vortices: Vec<Vortex>,
    well_multiplier: f32,
}

impl FieldRegistry {
    /// Create a registry with only a uniform field. The well multiplier
    /// starts at 1.0.
    pub fn new(uniform: UniformField) -> Self {
        Self {
            uniform,
            wells: Vec::new(),
            vortices: Vec::new(),
            well_multiplier: 1.0,
        }
    }

    /// Set the global multiplier applied to every well's force.
    pub fn with_well_multiplier(mut self, multiplier: f32) -> Self {
        self.well_multiplier = multiplier;
        self
    }

    /// Add a gravity well.
    pub fn add_well(&mut self, well: GravityWell) {
        self.wells.push(well);
    }

    /// Add a vortex.
    pub fn add_vortex(&mut self, vortex: Vortex) {
        self.vortices.push(vortex);
    }

    /// Configured wells.
    pub fn wells(&self) -> &[GravityWell] {
        &self.wells
    }

    /// Configured vortices, with their current positions.
    pub fn vortices(&self) -> &[Vortex] {
        &self.vortices
    }

    /// The uniform wind/gravity field.
    pub fn uniform(&self) -> &UniformField {
        &self.uniform
    }

    /// Sum of the uniform field and every well's force at `point`.
    pub fn net_force(&self, point: Vec2) -> Vec2 {
        self.wells
            .iter()
            .fold(self.uniform.acceleration(), |acc, well| {
                acc + well.force_at(point, self.well_multiplier)
            })
    }

    /// Velocity after vortex influence. Each vortex in range replaces the
    /// velocity outright; the last one in list order wins. Out of range of
    /// all vortices, `velocity` is returned unchanged.
    pub fn net_velocity_override(&self, point: Vec2, velocity: Vec2) -> Vec2 {
        self.vortices
            .iter()
            .filter_map(|vortex| vortex.velocity_at(point))
            .last()
            .unwrap_or(velocity)
    }

    /// Advance every vortex's drift by `dt` inside a `width` x `height` frame.
    pub fn advance(&mut self, dt: f32, width: f32, height: f32) {
        for vortex in &mut self.vortices {
            vortex.drift(dt, width, height);
        }
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new(UniformField::default())
    }
}
