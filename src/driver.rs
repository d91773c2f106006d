//! Frame driver: runs a whole mask sequence through one world.
//!
//! The driver owns the per-run wiring. It checks the input sequence, builds a
//! fresh [`World`], and then walks the frames in order:
//!
//! - frames inside the configured range advance the world by one frame and
//!   rasterize its particles
//! - frames outside the range pass the input mask through untouched, with a
//!   gray copy of it as the image, and leave the world alone
//!
//! Every output mask then runs through the post-processing [`Pipeline`].
//! Frames are strictly sequential because each one continues the previous
//! frame's simulation.
//!
//! # Example
//!
//! ```
//! use particle_mask::{FrameDriver, Mask, ParticleMaskConfig};
//!
//! let config = ParticleMaskConfig { seed: Some(5), ..Default::default() };
//! let driver = FrameDriver::new(config).unwrap();
//! let masks = vec![Mask::new(32, 32); 4];
//!
//! let mut seen = Vec::new();
//! let mut sink = particle_mask::driver::ProgressFn(|done, total| seen.push((done, total)));
//! let output = driver.run(&masks, &mut sink).unwrap();
//!
//! assert_eq!(output.masks.len(), 4);
//! assert_eq!(seen.last(), Some(&(4, 4)));
//! ```

use crate::config::ParticleMaskConfig;
use crate::error::{ConfigError, Result};
use crate::pipeline::Pipeline;
use crate::raster::{mask_to_frame, Frame, Mask};
use crate::world::World;
use log::{info, warn};
use std::ops::Range;

/// Receives one notification per completed frame.
///
/// Sinks observe; they never change results.
pub trait ProgressSink {
    /// `completed` counts finished frames, from 1 up to `total`.
    fn on_frame(&mut self, completed: usize, total: usize);
}

/// No-op sink.
impl ProgressSink for () {
    fn on_frame(&mut self, _completed: usize, _total: usize) {}
}

/// Adapts a closure into a [`ProgressSink`].
pub struct ProgressFn<F>(pub F);

impl<F: FnMut(usize, usize)> ProgressSink for ProgressFn<F> {
    fn on_frame(&mut self, completed: usize, total: usize) {
        (self.0)(completed, total)
    }
}

/// Logs progress at info level every `every` frames and on the last one.
#[derive(Clone, Copy, Debug)]
pub struct LogProgress {
    pub every: usize,
}

impl ProgressSink for LogProgress {
    fn on_frame(&mut self, completed: usize, total: usize) {
        if completed == total || completed % self.every.max(1) == 0 {
            info!("Frame {}/{}", completed, total);
        }
    }
}

/// Simulated frame range. `end == 0` means "through the last frame".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FrameRange {
    pub start: usize,
    pub end: usize,
}

impl FrameRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Concrete half-open range for a sequence of `num_frames`.
    pub fn resolve(&self, num_frames: usize) -> Range<usize> {
        let end = if self.end == 0 { num_frames } else { self.end.min(num_frames) };
        self.start.min(end)..end
    }
}

/// Output of a run: one mask and one image per input frame.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    pub masks: Vec<Mask>,
    pub images: Vec<Frame>,
}

/// Runs configured simulations over mask sequences.
#[derive(Debug)]
pub struct FrameDriver {
    config: ParticleMaskConfig,
    range: FrameRange,
    pipeline: Pipeline,
}

impl FrameDriver {
    /// Validate `config` and prepare the post-processing chain.
    pub fn new(config: ParticleMaskConfig) -> Result<Self> {
        config.validate()?;
        let range = FrameRange::new(config.start_frame, config.end_frame);
        let pipeline = Pipeline::from_config(&config);
        Ok(Self {
            config,
            range,
            pipeline,
        })
    }

    /// Replace the post-processing chain.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn config(&self) -> &ParticleMaskConfig {
        &self.config
    }

    pub fn range(&self) -> FrameRange {
        self.range
    }

    /// Process `masks` in order.
    ///
    /// All masks must share one size; a mismatch is reported before any
    /// frame is simulated. Each call starts from a fresh world.
    pub fn run(&self, masks: &[Mask], progress: &mut impl ProgressSink) -> Result<FrameOutput> {
        let Some(first) = masks.first() else {
            return Ok(FrameOutput::default());
        };
        let (width, height) = first.dimensions();
        for (frame, mask) in masks.iter().enumerate() {
            if mask.dimensions() != (width, height) {
                return Err(ConfigError::MaskShape {
                    frame,
                    expected_width: width,
                    expected_height: height,
                    width: mask.width(),
                    height: mask.height(),
                });
            }
        }

        let total = masks.len();
        let active = self.range.resolve(total);
        if active.is_empty() {
            warn!(
                "Frame range {}..{} selects no frames of {}; passing masks through",
                self.range.start, self.range.end, total
            );
        }

        let mut world = World::configure(&self.config, width, height)?;
        info!(
            "Running {} frames ({}x{}), simulating {:?}, post stages {:?}",
            total,
            width,
            height,
            active,
            self.pipeline.stage_names()
        );

        let mut output = FrameOutput {
            masks: Vec::with_capacity(total),
            images: Vec::with_capacity(total),
        };
        for (index, original) in masks.iter().enumerate() {
            let (mut mask, image) = if active.contains(&index) {
                world.step_frame(index, Some(original));
                world.render()
            } else {
                (original.clone(), mask_to_frame(original))
            };
            self.pipeline.apply(&mut mask, original);
            output.masks.push(mask);
            output.images.push(image);
            progress.on_frame(index + 1, total);
        }

        info!(
            "Run finished: {} particles emitted, {} live",
            world.total_emitted(),
            world.live_count()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmitterConfig;
    use image::Luma;

    fn config() -> ParticleMaskConfig {
        ParticleMaskConfig {
            emitters: vec![EmitterConfig {
                emission_rate: 60.0,
                particle_speed: 0.0,
                particle_size: 6.0,
                ..EmitterConfig::default()
            }],
            seed: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_frame_range_resolve() {
        assert_eq!(FrameRange::new(0, 0).resolve(10), 0..10);
        assert_eq!(FrameRange::new(2, 5).resolve(10), 2..5);
        assert_eq!(FrameRange::new(3, 50).resolve(10), 3..10);
        assert!(FrameRange::new(8, 4).resolve(10).is_empty());
        assert!(FrameRange::new(12, 0).resolve(10).is_empty());
    }

    #[test]
    fn test_empty_sequence() {
        let output = FrameDriver::new(config())
            .unwrap()
            .run(&[], &mut ())
            .unwrap();
        assert!(output.masks.is_empty());
        assert!(output.images.is_empty());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let masks = vec![Mask::new(8, 8), Mask::new(8, 9)];
        let result = FrameDriver::new(config()).unwrap().run(&masks, &mut ());
        assert!(matches!(result, Err(ConfigError::MaskShape { frame: 1, .. })));
    }

    #[test]
    fn test_out_of_range_passthrough() {
        let mut cfg = config();
        cfg.start_frame = 1;
        cfg.end_frame = 2;
        let mut input = Mask::new(16, 16);
        input.put_pixel(0, 0, Luma([0.75]));
        let masks = vec![input.clone(); 3];

        let output = FrameDriver::new(cfg).unwrap().run(&masks, &mut ()).unwrap();
        assert_eq!(output.masks[0], input);
        assert_eq!(output.images[0].get_pixel(0, 0).0, [0.75, 0.75, 0.75]);
        assert_eq!(output.masks[2], input);

        // Simulated frame draws the emitter's particles at the center
        assert_eq!(output.masks[1].get_pixel(8, 8).0[0], 1.0);
        assert_eq!(output.masks[1].get_pixel(0, 0).0[0], 0.0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let masks = vec![Mask::new(8, 8); 5];
        let mut calls = Vec::new();
        let mut sink = ProgressFn(|done, total| calls.push((done, total)));
        FrameDriver::new(config())
            .unwrap()
            .run(&masks, &mut sink)
            .unwrap();
        assert_eq!(calls, vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
    }

    #[test]
    fn test_progress_does_not_change_results() {
        let masks = vec![Mask::new(12, 12); 4];
        let driver = FrameDriver::new(config()).unwrap();
        let quiet = driver.run(&masks, &mut ()).unwrap();
        let logged = driver.run(&masks, &mut LogProgress { every: 1 }).unwrap();
        assert_eq!(quiet.masks, logged.masks);
        assert_eq!(quiet.images, logged.images);
    }

    #[test]
    fn test_invert_applies_to_output() {
        let mut cfg = config();
        cfg.invert = true;
        cfg.end_frame = 1;
        let masks = vec![Mask::new(16, 16); 2];
        let output = FrameDriver::new(cfg).unwrap().run(&masks, &mut ()).unwrap();
        // Particle pixel inverted to 0, background to 1
        assert_eq!(output.masks[0].get_pixel(8, 8).0[0], 0.0);
        assert_eq!(output.masks[0].get_pixel(0, 0).0[0], 1.0);
        // Passthrough frame is inverted too
        assert!(output.masks[1].pixels().all(|p| p.0[0] == 1.0));
        // The color image is not post-processed
        assert_eq!(output.images[0].get_pixel(0, 0).0, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut cfg = config();
        cfg.emitters[0].color = crate::config::ColorSpec::Encoded("nope".into());
        assert!(matches!(FrameDriver::new(cfg), Err(ConfigError::InvalidColor(_))));
    }
}
