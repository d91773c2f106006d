//! The particle world.
//!
//! A [`World`] owns everything that carries over from one frame to the next:
//! the live particles, the emitters and their accumulators, the force fields
//! (vortex positions drift), the boundary segments and the simulation clock.
//! It is built once per run by [`World::configure`], which starts from a
//! clean slate, and then advanced one frame at a time with
//! [`World::step_frame`].
//!
//! # Sub-step order
//!
//! Each frame is split into `sub_steps` equal sub-steps. Within one sub-step:
//!
//! 1. vortices drift
//! 2. every emitter emits its whole particles (never past the run-wide cap)
//! 3. each particle's velocity is overridden by vortices, then forces apply
//! 4. positions integrate, and boundary hits are resolved when enabled
//! 5. optional particle-particle contacts are resolved
//! 6. the clock advances and expired particles are culled
//!
//! # Example
//!
//! ```
//! use particle_mask::{ParticleMaskConfig, World};
//!
//! let config = ParticleMaskConfig { seed: Some(3), ..Default::default() };
//! let mut world = World::configure(&config, 64, 64).unwrap();
//! for frame in 0..10 {
//!     world.step_frame(frame, None);
//! }
//! assert!(world.total_emitted() <= config.particle_count);
//! let (mask, image) = world.render();
//! assert_eq!(mask.dimensions(), (64, 64));
//! assert_eq!(image.dimensions(), (64, 64));
//! ```

use crate::config::ParticleMaskConfig;
use crate::emitter::Emitter;
use crate::error::Result;
use crate::field::{FieldRegistry, GravityWell, UniformField, Vortex};
use crate::geometry::{extract_boundary, Segment};
use crate::particle::{Particle, PARTICLE_MASS};
use crate::raster::{Frame, Mask, Rasterizer};
use crate::spatial::{resolve_collisions, SpatialGrid};
use crate::spawn::SpawnContext;
use crate::time::SimClock;
use glam::Vec2;
use log::{debug, info};

/// Fraction of speed kept after bouncing off a boundary or another particle.
pub const RESTITUTION: f32 = 0.9;

/// Extra clearance, in pixels, added beyond the radius when a particle is
/// pushed off a boundary.
pub const PUSH_OUT_MARGIN: f32 = 1.0;

/// Scalar parameters of a world.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldParams {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Run-wide cap on particles ever created.
    pub max_particles: u32,
    /// Collide with the outline of each frame's mask.
    pub respect_boundary: bool,
    /// Resolve particle-particle contacts.
    pub particle_collisions: bool,
    /// Velocity kept after a bounce.
    pub restitution: f32,
}

impl WorldParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            max_particles: 200,
            respect_boundary: false,
            particle_collisions: false,
            restitution: RESTITUTION,
        }
    }

    pub fn with_max_particles(mut self, max_particles: u32) -> Self {
        self.max_particles = max_particles;
        self
    }

    pub fn with_boundary(mut self, respect: bool) -> Self {
        self.respect_boundary = respect;
        self
    }

    pub fn with_particle_collisions(mut self, enabled: bool) -> Self {
        self.particle_collisions = enabled;
        self
    }

    #[inline]
    fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Simulation state for one run.
#[derive(Clone, Debug)]
pub struct World {
    params: WorldParams,
    clock: SimClock,
    fields: FieldRegistry,
    emitters: Vec<Emitter>,
    particles: Vec<Particle>,
    segments: Vec<Segment>,
    total_emitted: u32,
    rng: SpawnContext,
    grid: Option<SpatialGrid>,
}

impl World {
    /// Assemble a world from already-built parts. Nothing is emitted yet.
    pub fn new(
        params: WorldParams,
        clock: SimClock,
        fields: FieldRegistry,
        emitters: Vec<Emitter>,
        rng: SpawnContext,
    ) -> Self {
        let grid = params.particle_collisions.then(|| {
            let max_size = emitters
                .iter()
                .map(Emitter::particle_size)
                .fold(1.0_f32, f32::max);
            SpatialGrid::for_particle_size(max_size)
        });
        Self {
            params,
            clock,
            fields,
            emitters,
            particles: Vec::new(),
            segments: Vec::new(),
            total_emitted: 0,
            rng,
            grid,
        }
    }

    /// Build a fresh world for a `width` x `height` sequence.
    ///
    /// Validates the whole configuration first, so a bad descriptor fails
    /// before any frame is touched. Vortices get a random drift heading and
    /// every emitter fires its initial burst.
    pub fn configure(config: &ParticleMaskConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        let params = WorldParams::new(width, height)
            .with_max_particles(config.particle_count)
            .with_boundary(config.respect_mask_boundary)
            .with_particle_collisions(config.particle_collisions);
        let size = params.size();
        let mut rng = SpawnContext::new(config.seed);

        let emitters = config
            .emitters
            .iter()
            .enumerate()
            .map(|(i, e)| Emitter::from_config(e, i, width, height, config.particle_lifetime))
            .collect::<Result<Vec<_>>>()?;
        for emitter in &emitters {
            debug!(
                "Emitter {} at {:?}, heading {} deg",
                emitter.index(),
                emitter.position(),
                emitter.direction()
            );
        }

        let uniform =
            UniformField::new(config.wind_strength, config.wind_direction, config.gravity);
        let mut fields = FieldRegistry::new(uniform)
            .with_well_multiplier(config.well_strength_multiplier);
        for well in &config.wells {
            fields.add_well(GravityWell::new(
                Vec2::new(well.x, well.y) * size,
                well.strength,
                well.radius,
                well.polarity,
            ));
        }
        for vortex in &config.vortices {
            let drift = rng.random_unit_vec2() * vortex.movement_speed;
            fields.add_vortex(Vortex::new(
                Vec2::new(vortex.x, vortex.y) * size,
                drift,
                vortex.strength,
                vortex.radius,
                vortex.inward_factor,
            ));
        }

        let clock = SimClock::new(config.frame_rate, config.sub_steps);
        let mut world = Self::new(params, clock, fields, emitters, rng);
        let burst = world.initial_burst();
        info!(
            "Configured world {}x{}: {} emitters, {} vortices, {} wells, cap {}, initial burst {}",
            width,
            height,
            world.emitters.len(),
            world.fields.vortices().len(),
            world.fields.wells().len(),
            world.params.max_particles,
            burst
        );
        Ok(world)
    }

    /// Spawn every emitter's share of the particle cap up front, bypassing
    /// the accumulators. Returns the number spawned.
    pub fn initial_burst(&mut self) -> u32 {
        let count = self.emitters.len();
        let max = self.params.max_particles;
        let mut spawned = 0;
        for i in 0..count {
            let n = Emitter::burst_count(max, self.emitters[i].initial_burst(), count);
            spawned += self.emit_from(i, n);
        }
        spawned
    }

    /// Add a particle directly. It counts toward the cap and is refused once
    /// the cap is reached.
    pub fn add_particle(&mut self, particle: Particle) -> bool {
        if self.total_emitted >= self.params.max_particles {
            return false;
        }
        self.particles.push(particle);
        self.total_emitted += 1;
        true
    }

    fn emit_from(&mut self, emitter: usize, count: u32) -> u32 {
        let mut spawned = 0;
        for _ in 0..count {
            if self.total_emitted >= self.params.max_particles {
                break;
            }
            let particle = self.emitters[emitter].spawn(&mut self.rng, self.clock.elapsed());
            self.particles.push(particle);
            self.total_emitted += 1;
            spawned += 1;
        }
        spawned
    }

    /// Advance one frame.
    ///
    /// `frame_index` drives emitter modulation. When boundary collisions are
    /// enabled, `mask` is re-extracted into segments that fully replace the
    /// previous frame's; with no mask there is nothing to collide with.
    pub fn step_frame(&mut self, frame_index: usize, mask: Option<&Mask>) {
        let t = self.clock.frame_time(frame_index);
        for emitter in &mut self.emitters {
            emitter.modulate(t);
        }

        if self.params.respect_boundary {
            self.segments = mask.map(extract_boundary).unwrap_or_default();
        } else {
            self.segments.clear();
        }

        for _ in 0..self.clock.sub_steps() {
            self.sub_step();
        }

        debug!(
            "Frame {}: {} live, {} emitted, {} segments",
            frame_index,
            self.particles.len(),
            self.total_emitted,
            self.segments.len()
        );
    }

    /// Advance one sub-step of `sub_dt` seconds.
    pub fn sub_step(&mut self) {
        let dt = self.clock.sub_dt();
        let size = self.params.size();

        self.fields.advance(dt, size.x, size.y);

        for i in 0..self.emitters.len() {
            let count = self.emitters[i].accumulate(dt);
            self.emit_from(i, count);
        }

        for particle in &mut self.particles {
            let velocity = self
                .fields
                .net_velocity_override(particle.position, particle.velocity);
            let force = self.fields.net_force(particle.position);
            particle.velocity = velocity + force / PARTICLE_MASS * dt;
            let from = particle.position;
            particle.position += particle.velocity * dt;
            if !self.segments.is_empty() {
                collide_with_boundary(particle, from, &self.segments, self.params.restitution);
            }
        }

        if let Some(grid) = self.grid.as_mut() {
            resolve_collisions(&mut self.particles, grid, self.params.restitution);
        }

        let now = self.clock.tick();
        self.particles.retain(|p| p.is_alive(now));
    }

    /// Rasterize the live particles onto fresh frames.
    pub fn render(&self) -> (Mask, Frame) {
        Rasterizer.render(self.params.width, self.params.height, &self.particles)
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    /// Live particles in spawn order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Boundary segments of the current frame.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Particles created so far in this run.
    pub fn total_emitted(&self) -> u32 {
        self.total_emitted
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }
}

/// Bounce `particle` off a segment crossed while moving from `from` to its
/// current position.
///
/// Segments are tested in order and the first one crossed wins, even when a
/// later one lies closer to `from`. The velocity is mirrored about the
/// segment normal and scaled by `restitution`; the particle is placed at the
/// hit point plus `radius + PUSH_OUT_MARGIN` along the normal facing the side
/// it came from.
fn collide_with_boundary(
    particle: &mut Particle,
    from: Vec2,
    segments: &[Segment],
    restitution: f32,
) -> bool {
    let to = particle.position;
    let hit = segments
        .iter()
        .find_map(|s| s.intersect(from, to).map(|t| (t, s)));
    let Some((t, segment)) = hit else {
        return false;
    };

    let mut normal = segment.normal();
    if normal.dot(to - from) > 0.0 {
        normal = -normal;
    }
    let v = particle.velocity;
    particle.velocity = (v - 2.0 * v.dot(normal) * normal) * restitution;
    particle.position = from.lerp(to, t) + normal * (particle.radius + PUSH_OUT_MARGIN);
    true
}
