//! Run configuration.
//!
//! A [`ParticleMaskConfig`] holds everything one invocation needs: emitters,
//! optional vortices and gravity wells, and the scalar parameters. It is
//! plain serde data so it can be written by hand as JSON and loaded by the
//! runner. Defaults match the values used when a field is omitted.
//!
//! ```json
//! {
//!   "emitters": [{
//!     "emitter_x": 0.5, "emitter_y": 0.9,
//!     "particle_direction": 270.0, "particle_spread": 30.0,
//!     "particle_speed": 120.0, "particle_size": 8.0,
//!     "color": "(255, 180, 40)",
//!     "emission_rate": 40.0, "initial_plume": 0.1
//!   }],
//!   "wells": [{ "x": 0.5, "y": 0.3, "strength": 400.0, "radius": 80.0, "type": "attract" }],
//!   "particle_count": 500,
//!   "gravity": 50.0,
//!   "respect_mask_boundary": true
//! }
//! ```

use crate::emitter::Modulation;
use crate::error::{ConfigError, Result};
use crate::field::WellPolarity;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_particle_count() -> u32 {
    200
}

fn default_lifetime() -> f32 {
    4.0
}

fn default_one() -> f32 {
    1.0
}

fn default_frame_rate() -> f32 {
    crate::time::DEFAULT_FRAME_RATE
}

fn default_sub_steps() -> u32 {
    crate::time::DEFAULT_SUB_STEPS
}

fn default_inward_factor() -> f32 {
    0.5
}

/// Particle color as written in a descriptor.
///
/// Either a `[r, g, b]` triple already in 0.0-1.0, or the encoded string
/// form `"(r, g, b)"` with 0-255 integer channels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    /// Normalized RGB triple.
    Rgb([f32; 3]),
    /// `"(r, g, b)"` with 0-255 channels.
    Encoded(String),
}

impl Default for ColorSpec {
    fn default() -> Self {
        ColorSpec::Rgb([1.0, 1.0, 1.0])
    }
}

impl ColorSpec {
    /// Decode to a normalized RGB vector.
    pub fn to_rgb(&self) -> Result<Vec3> {
        match self {
            ColorSpec::Rgb(rgb) => {
                if rgb.iter().all(|c| (0.0..=1.0).contains(c)) {
                    Ok(Vec3::from_array(*rgb))
                } else {
                    Err(ConfigError::InvalidColor(format!("{rgb:?}")))
                }
            }
            ColorSpec::Encoded(text) => parse_encoded_color(text),
        }
    }
}

fn parse_encoded_color(text: &str) -> Result<Vec3> {
    let invalid = || ConfigError::InvalidColor(text.to_string());
    let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
    let channels = inner
        .split(',')
        .map(|part| part.trim().parse::<u8>().map(|v| v as f32 / 255.0))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    match channels.as_slice() {
        [r, g, b] => Ok(Vec3::new(*r, *g, *b)),
        _ => Err(invalid()),
    }
}

/// One emitter descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmitterConfig {
    /// Horizontal position, normalized 0..1.
    pub emitter_x: f32,
    /// Vertical position, normalized 0..1.
    pub emitter_y: f32,
    /// Emission direction in degrees (0 = +x, 90 = +y / down).
    #[serde(default)]
    pub particle_direction: f32,
    /// Full spread angle in degrees.
    #[serde(default)]
    pub particle_spread: f32,
    /// Initial speed in pixels per second.
    #[serde(default = "EmitterConfig::default_speed")]
    pub particle_speed: f32,
    /// Particle diameter in pixels.
    #[serde(default = "EmitterConfig::default_size")]
    pub particle_size: f32,
    /// Particle color.
    #[serde(default)]
    pub color: ColorSpec,
    /// Particles per second.
    #[serde(default = "EmitterConfig::default_rate")]
    pub emission_rate: f32,
    /// Fraction of the particle cap spawned at setup, shared between emitters.
    #[serde(default)]
    pub initial_plume: f32,
    /// Optional position/direction wobble.
    #[serde(default)]
    pub movement: Option<Modulation>,
    /// Per-emitter lifetime override in seconds.
    #[serde(default)]
    pub lifetime: Option<f32>,
}

impl EmitterConfig {
    fn default_speed() -> f32 {
        100.0
    }

    fn default_size() -> f32 {
        10.0
    }

    fn default_rate() -> f32 {
        10.0
    }

    /// Range-check the numeric fields. `index` only labels the error.
    pub fn validate(&self, index: usize) -> Result<()> {
        let name = |field: &str| format!("emitters[{index}].{field}");
        let finite = [
            ("emitter_x", self.emitter_x),
            ("emitter_y", self.emitter_y),
            ("particle_direction", self.particle_direction),
            ("particle_spread", self.particle_spread),
            ("particle_speed", self.particle_speed),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::invalid(name(field), "must be finite"));
            }
        }
        if !(self.particle_size > 0.0) {
            return Err(ConfigError::invalid(name("particle_size"), "must be > 0"));
        }
        if !(self.emission_rate >= 0.0) {
            return Err(ConfigError::invalid(name("emission_rate"), "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.initial_plume) {
            return Err(ConfigError::invalid(name("initial_plume"), "must be in 0..=1"));
        }
        self.color.to_rgb()?;
        Ok(())
    }
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            emitter_x: 0.5,
            emitter_y: 0.5,
            particle_direction: 0.0,
            particle_spread: 0.0,
            particle_speed: Self::default_speed(),
            particle_size: Self::default_size(),
            color: ColorSpec::default(),
            emission_rate: Self::default_rate(),
            initial_plume: 0.0,
            movement: None,
            lifetime: None,
        }
    }
}

/// One vortex descriptor. Position is normalized 0..1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VortexConfig {
    pub x: f32,
    pub y: f32,
    pub strength: f32,
    pub radius: f32,
    #[serde(default = "default_inward_factor")]
    pub inward_factor: f32,
    /// Drift speed of the vortex center in pixels per second.
    #[serde(default)]
    pub movement_speed: f32,
}

/// One gravity well descriptor. Position is normalized 0..1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WellConfig {
    pub x: f32,
    pub y: f32,
    pub strength: f32,
    pub radius: f32,
    #[serde(rename = "type", default)]
    pub polarity: WellPolarity,
}

/// Complete configuration of one particle mask run.
///
/// Unknown keys at any level are rejected, so a misspelled field fails to
/// parse instead of silently taking its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticleMaskConfig {
    pub emitters: Vec<EmitterConfig>,
    #[serde(default)]
    pub vortices: Vec<VortexConfig>,
    #[serde(default)]
    pub wells: Vec<WellConfig>,
    /// Run-wide cap on particles ever created.
    #[serde(default = "default_particle_count")]
    pub particle_count: u32,
    /// Default particle lifetime in seconds.
    #[serde(default = "default_lifetime")]
    pub particle_lifetime: f32,
    #[serde(default)]
    pub wind_strength: f32,
    /// Wind heading in degrees.
    #[serde(default)]
    pub wind_direction: f32,
    /// Downward acceleration (negative pulls up).
    #[serde(default)]
    pub gravity: f32,
    /// First simulated frame.
    #[serde(default)]
    pub start_frame: usize,
    /// One past the last simulated frame; 0 means the whole sequence.
    #[serde(default)]
    pub end_frame: usize,
    /// Collide particles with the outline of each frame's mask.
    #[serde(default)]
    pub respect_mask_boundary: bool,
    #[serde(default = "default_one")]
    pub well_strength_multiplier: f32,
    /// Invert the particle mask after simulation.
    #[serde(default)]
    pub invert: bool,
    /// Clear the particle mask deep inside the original mask (0 = off).
    #[serde(default)]
    pub subtract_original: f32,
    /// Gaussian sigma applied to the particle mask (0 = off).
    #[serde(default)]
    pub grow_with_blur: f32,
    /// Frames per second assumed for the sequence.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    /// Physics sub-steps per frame.
    #[serde(default = "default_sub_steps")]
    pub sub_steps: u32,
    /// Resolve particle-particle collisions.
    #[serde(default)]
    pub particle_collisions: bool,
    /// Seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ParticleMaskConfig {
    fn default() -> Self {
        Self {
            emitters: vec![EmitterConfig::default()],
            vortices: Vec::new(),
            wells: Vec::new(),
            particle_count: default_particle_count(),
            particle_lifetime: default_lifetime(),
            wind_strength: 0.0,
            wind_direction: 0.0,
            gravity: 0.0,
            start_frame: 0,
            end_frame: 0,
            respect_mask_boundary: false,
            well_strength_multiplier: 1.0,
            invert: false,
            subtract_original: 0.0,
            grow_with_blur: 0.0,
            frame_rate: default_frame_rate(),
            sub_steps: default_sub_steps(),
            particle_collisions: false,
            seed: None,
        }
    }
}

impl ParticleMaskConfig {
    /// Parse from a JSON string and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every parameter. Called by the world before any frame runs.
    pub fn validate(&self) -> Result<()> {
        if self.emitters.is_empty() {
            return Err(ConfigError::NoEmitters);
        }
        for (i, emitter) in self.emitters.iter().enumerate() {
            emitter.validate(i)?;
            if let Some(lifetime) = emitter.lifetime {
                if !(lifetime > 0.0) {
                    let name = format!("emitters[{i}].lifetime");
                    return Err(ConfigError::invalid(name, "must be > 0"));
                }
            }
        }
        for (i, vortex) in self.vortices.iter().enumerate() {
            if !(vortex.radius > 0.0) {
                let name = format!("vortices[{i}].radius");
                return Err(ConfigError::invalid(name, "must be > 0"));
            }
        }
        for (i, well) in self.wells.iter().enumerate() {
            if !(well.radius > 0.0) {
                let name = format!("wells[{i}].radius");
                return Err(ConfigError::invalid(name, "must be > 0"));
            }
        }
        if !(self.particle_lifetime > 0.0) {
            return Err(ConfigError::invalid("particle_lifetime", "must be > 0"));
        }
        if !(self.frame_rate > 0.0) {
            return Err(ConfigError::invalid("frame_rate", "must be > 0"));
        }
        if self.sub_steps == 0 {
            return Err(ConfigError::invalid("sub_steps", "must be at least 1"));
        }
        if !(self.well_strength_multiplier >= 0.0) {
            return Err(ConfigError::invalid("well_strength_multiplier", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.subtract_original) {
            return Err(ConfigError::invalid("subtract_original", "must be in 0..=1"));
        }
        if !(self.grow_with_blur >= 0.0) {
            return Err(ConfigError::invalid("grow_with_blur", "must be >= 0"));
        }
        for (name, value) in [
            ("wind_strength", self.wind_strength),
            ("wind_direction", self.wind_direction),
            ("gravity", self.gravity),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(name, "must be finite"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_color() {
        let c = ColorSpec::Encoded("(255, 0, 51)".into()).to_rgb().unwrap();
        assert_eq!(c, Vec3::new(1.0, 0.0, 0.2));
        let c = ColorSpec::Encoded("  ( 0,255,0 ) ".into()).to_rgb().unwrap();
        assert_eq!(c, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_malformed_colors() {
        for bad in ["(255, 0)", "(1, 2, 3, 4)", "(256, 0, 0)", "red", "(a, b, c)", ""] {
            let result = ColorSpec::Encoded(bad.into()).to_rgb();
            assert!(matches!(result, Err(ConfigError::InvalidColor(_))), "accepted {bad:?}");
        }
        assert!(ColorSpec::Rgb([1.5, 0.0, 0.0]).to_rgb().is_err());
    }

    #[test]
    fn test_color_json_forms() {
        let triple: ColorSpec = serde_json::from_str("[0.5, 0.25, 1.0]").unwrap();
        assert_eq!(triple.to_rgb().unwrap(), Vec3::new(0.5, 0.25, 1.0));
        let encoded: ColorSpec = serde_json::from_str("\"(0, 0, 255)\"").unwrap();
        assert_eq!(encoded.to_rgb().unwrap(), Vec3::Z);
    }

    #[test]
    fn test_defaults_from_minimal_json() {
        let config = ParticleMaskConfig::from_json(
            r#"{ "emitters": [{ "emitter_x": 0.1, "emitter_y": 0.2 }] }"#,
        )
        .unwrap();
        assert_eq!(config.particle_count, 200);
        assert_eq!(config.particle_lifetime, 4.0);
        assert_eq!(config.well_strength_multiplier, 1.0);
        assert_eq!(config.frame_rate, 30.0);
        assert_eq!(config.sub_steps, 5);
        assert!(!config.respect_mask_boundary);
        assert!(!config.particle_collisions);
        assert_eq!(config.emitters[0].particle_size, 10.0);
    }

    #[test]
    fn test_full_json() {
        let config = ParticleMaskConfig::from_json(
            r#"{
                "emitters": [{
                    "emitter_x": 0.5, "emitter_y": 0.5,
                    "particle_direction": 45, "particle_spread": 10,
                    "particle_speed": 50, "particle_size": 4,
                    "color": "(10, 20, 30)", "emission_rate": 12, "initial_plume": 0.2,
                    "movement": { "emitter_x_frequency": 1.0, "emitter_x_amplitude": 0.1 }
                }],
                "vortices": [{
                    "x": 0.3, "y": 0.3, "strength": 50, "radius": 40, "movement_speed": 5
                }],
                "wells": [{ "x": 0.7, "y": 0.7, "strength": 100, "radius": 30, "type": "repel" }],
                "gravity": -20,
                "seed": 11
            }"#,
        )
        .unwrap();
        assert_eq!(config.wells[0].polarity, WellPolarity::Repel);
        assert_eq!(config.vortices[0].inward_factor, 0.5);
        let movement = config.emitters[0].movement.unwrap();
        assert_eq!(movement.x_frequency, 1.0);
        assert_eq!(movement.y_amplitude, 0.0);
        assert_eq!(config.seed, Some(11));
    }

    #[test]
    fn test_unknown_well_type_rejected() {
        let result = ParticleMaskConfig::from_json(
            r#"{ "emitters": [{ "emitter_x": 0.5, "emitter_y": 0.5 }],
                 "wells": [{ "x": 0.5, "y": 0.5, "strength": 1, "radius": 1, "type": "swirl" }] }"#,
        );
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_misspelled_keys_rejected() {
        let cases = [
            r#"{ "emitters": [{ "emitter_x": 0.5, "emitter_y": 0.5, "emision_rate": 5 }] }"#,
            r#"{ "emitters": [{ "emitter_x": 0.5, "emitter_y": 0.5 }], "gravty": 9 }"#,
            r#"{ "emitters": [{ "emitter_x": 0.5, "emitter_y": 0.5 }],
                 "vortices": [{ "x": 0.5, "y": 0.5, "strength": 1, "radius": 1, "speed": 3 }] }"#,
            r#"{ "emitters": [{ "emitter_x": 0.5, "emitter_y": 0.5 }],
                 "wells": [{ "x": 0.5, "y": 0.5, "strength": 1, "radius": 1, "kind": "repel" }] }"#,
            r#"{ "emitters": [{ "emitter_x": 0.5, "emitter_y": 0.5,
                                "movement": { "emitter_x_freq": 1.0 } }] }"#,
        ];
        for json in cases {
            let result = ParticleMaskConfig::from_json(json);
            assert!(matches!(result, Err(ConfigError::Json(_))), "accepted {json}");
        }
    }

    #[test]
    fn test_validation_failures() {
        let empty = ParticleMaskConfig {
            emitters: vec![],
            ..Default::default()
        };
        assert!(matches!(empty.validate(), Err(ConfigError::NoEmitters)));

        let mut config = ParticleMaskConfig::default();
        config.particle_lifetime = 0.0;
        assert!(config.validate().is_err());

        let mut config = ParticleMaskConfig::default();
        config.emitters[0].particle_size = 0.0;
        assert!(config.validate().is_err());

        let mut config = ParticleMaskConfig::default();
        config.emitters[0].initial_plume = 1.5;
        assert!(config.validate().is_err());

        let mut config = ParticleMaskConfig::default();
        config.wells.push(WellConfig {
            x: 0.0,
            y: 0.0,
            strength: 1.0,
            radius: 0.0,
            polarity: WellPolarity::Attract,
        });
        assert!(config.validate().is_err());

        let mut config = ParticleMaskConfig::default();
        config.emitters[0].color = ColorSpec::Encoded("(1,2)".into());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidColor(_))));
    }

    #[test]
    fn test_json_roundtrip_preserves_config() {
        let config = ParticleMaskConfig::default();
        let json = config.to_json().unwrap();
        let parsed = ParticleMaskConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, ParticleMaskConfig::default().to_json().unwrap()).unwrap();
        assert!(ParticleMaskConfig::load(&path).is_ok());
        assert!(matches!(
            ParticleMaskConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
