//! # particle-mask
//!
//! A 2D particle simulation that turns a sequence of masks into animated
//! particle masks and color frames.
//!
//! Particles stream out of emitters, are pushed around by wind, gravity,
//! gravity wells and drifting vortices, optionally bounce off the outline of
//! each input mask, and are drawn as filled discs. State carries from frame
//! to frame, so the output is a continuous animation.
//!
//! ## Quick Start
//!
//! ```
//! use particle_mask::prelude::*;
//!
//! let config = ParticleMaskConfig::from_json(r#"{
//!     "emitters": [{
//!         "emitter_x": 0.5, "emitter_y": 0.9,
//!         "particle_direction": 270.0, "particle_spread": 30.0,
//!         "particle_speed": 40.0, "particle_size": 4.0,
//!         "color": "(255, 160, 0)", "emission_rate": 30.0
//!     }],
//!     "gravity": 10.0,
//!     "seed": 7
//! }"#).unwrap();
//!
//! let masks = vec![Mask::new(64, 64); 8];
//! let output = FrameDriver::new(config).unwrap().run(&masks, &mut ()).unwrap();
//! assert_eq!(output.images.len(), 8);
//! ```
//!
//! ## Core Concepts
//!
//! ### World
//!
//! [`World`] holds the live particles, the emitters, the force fields and the
//! clock. Every frame is split into a fixed number of sub-steps (5 by
//! default, at 30 frames per second); see the [`world`](World) docs for the
//! order of operations inside a sub-step.
//!
//! ### Fields
//!
//! | Source | Effect |
//! |--------|--------|
//! | Uniform field | wind along a heading plus gravity along +y |
//! | [`GravityWell`] | linear-falloff pull or push inside a radius |
//! | [`Vortex`] | replaces velocity with a swirl inside a radius; drifts and bounces |
//!
//! ### Boundaries
//!
//! With `respect_mask_boundary`, every frame's mask is traced into closed
//! polygons ([`geometry`]) and particles crossing an edge are reflected with
//! 0.9 restitution.
//!
//! ### Output
//!
//! [`FrameDriver`] runs a whole sequence, honoring the start/end frame range,
//! and passes each particle mask through the post-processing
//! [`Pipeline`](pipeline::Pipeline) (invert, blur, subtract original, clip).

pub mod config;
pub mod driver;
mod emitter;
mod error;
pub mod field;
pub mod geometry;
mod particle;
pub mod pipeline;
mod raster;
pub mod spatial;
pub mod spawn;
pub mod time;
mod world;

pub use config::{ColorSpec, EmitterConfig, ParticleMaskConfig, VortexConfig, WellConfig};
pub use driver::{FrameDriver, FrameOutput, FrameRange, ProgressSink};
pub use emitter::{Emitter, Modulation};
pub use error::{ConfigError, Result};
pub use field::{FieldRegistry, GravityWell, UniformField, Vortex, WellPolarity};
pub use geometry::Segment;
pub use glam::{Vec2, Vec3};
pub use particle::{Particle, PARTICLE_MASS};
pub use raster::{mask_to_frame, Frame, Mask, Rasterizer};
pub use world::{World, WorldParams};

/// Convenient re-exports for common usage.
///
/// ```
/// use particle_mask::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ColorSpec, EmitterConfig, ParticleMaskConfig, VortexConfig, WellConfig};
    pub use crate::driver::{FrameDriver, ProgressSink};
    pub use crate::field::WellPolarity;
    pub use crate::raster::{Frame, Mask};
    pub use crate::world::World;
    pub use crate::{Vec2, Vec3};
}
