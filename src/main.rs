//! Command-line runner.
//!
//! ```text
//! particle-mask <config.json> [out_dir]
//! ```
//!
//! The JSON file holds the particle mask configuration under `simulation`
//! plus the input: either a `masks` list of image paths, or
//! `frames`/`width`/`height` to run over blank masks. Output frames are
//! written to `out_dir` (default `output`) as `mask_NNNN.png` and
//! `image_NNNN.png`.
//!
//! ```json
//! {
//!   "simulation": { "emitters": [{ "emitter_x": 0.5, "emitter_y": 0.9 }] },
//!   "masks": ["masks/0001.png", "masks/0002.png"]
//! }
//! ```

use image::{DynamicImage, GrayImage, Luma};
use log::{error, info};
use particle_mask::driver::LogProgress;
use particle_mask::{FrameDriver, FrameOutput, Mask, ParticleMaskConfig, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn default_frames() -> usize {
    30
}

fn default_size() -> u32 {
    256
}

/// Runner input: the simulation settings and where the masks come from.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunnerConfig {
    simulation: ParticleMaskConfig,
    /// Mask image paths, one per frame, relative to the config file.
    #[serde(default)]
    masks: Vec<PathBuf>,
    /// Blank frames to synthesize when `masks` is empty.
    #[serde(default = "default_frames")]
    frames: usize,
    #[serde(default = "default_size")]
    width: u32,
    #[serde(default = "default_size")]
    height: u32,
}

impl RunnerConfig {
    fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    fn input_masks(&self, base: &Path) -> Result<Vec<Mask>> {
        if self.masks.is_empty() {
            info!(
                "No masks listed, using {} blank {}x{} frames",
                self.frames, self.width, self.height
            );
            return Ok(vec![Mask::new(self.width, self.height); self.frames]);
        }
        self.masks
            .iter()
            .map(|p| -> Result<Mask> { Ok(image::open(base.join(p))?.to_luma32f()) })
            .collect()
    }
}

fn write_frames(output: &FrameOutput, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    for (i, (mask, frame)) in output.masks.iter().zip(&output.images).enumerate() {
        let gray = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
            Luma([(mask.get_pixel(x, y).0[0].clamp(0.0, 1.0) * 255.0).round() as u8])
        });
        gray.save(out_dir.join(format!("mask_{i:04}.png")))?;
        DynamicImage::ImageRgb32F(frame.clone())
            .to_rgb8()
            .save(out_dir.join(format!("image_{i:04}.png")))?;
    }
    Ok(())
}

fn run(config_path: &Path, out_dir: &Path) -> Result<()> {
    let config = RunnerConfig::load(config_path)?;
    let base = config_path.parent().unwrap_or(Path::new("."));
    let masks = config.input_masks(base)?;

    let driver = FrameDriver::new(config.simulation)?;
    let output = driver.run(&masks, &mut LogProgress { every: 10 })?;
    write_frames(&output, out_dir)?;
    info!("Wrote {} frames to {:?}", output.masks.len(), out_dir);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let Some(config_path) = args.get(1).map(PathBuf::from) else {
        eprintln!("Usage: particle-mask <config.json> [out_dir]");
        return ExitCode::FAILURE;
    };
    let out_dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("output"));

    match run(&config_path, &out_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}: {}", config_path.display(), e);
            ExitCode::FAILURE
        }
    }
}
