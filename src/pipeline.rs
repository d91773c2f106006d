//! Per-frame mask post-processing.
//!
//! After the particles are rasterized, the particle mask runs through a short
//! chain of stages that mirror the usual mask node options:
//!
//! ```text
//! invert -> grow with blur -> subtract original -> clip to [0, 1]
//! ```
//!
//! Each stage is a [`MaskStage`] value and a [`Pipeline`] is just an ordered
//! list of them, so callers can assemble their own chain. Stages see the
//! mask being processed and the untouched input mask of the same frame.
//!
//! # Example
//!
//! ```
//! use particle_mask::pipeline::{Invert, Pipeline};
//! use particle_mask::Mask;
//!
//! let pipeline = Pipeline::new().with_stage(Invert);
//! let original = Mask::new(4, 4);
//! let mut mask = Mask::new(4, 4);
//! pipeline.apply(&mut mask, &original);
//! assert_eq!(mask.get_pixel(0, 0).0[0], 1.0);
//! ```

use crate::config::ParticleMaskConfig;
use crate::raster::Mask;

/// Gaussian kernels extend this many sigmas to each side.
const GAUSSIAN_TRUNCATE: f32 = 4.0;

/// One post-processing operation on a mask.
pub trait MaskStage: std::fmt::Debug + Send + Sync {
    /// Transform `mask` in place. `original` is the frame's input mask.
    fn apply(&self, mask: &mut Mask, original: &Mask);

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// `1 - value` per pixel.
#[derive(Clone, Copy, Debug, Default)]
pub struct Invert;

impl MaskStage for Invert {
    fn apply(&self, mask: &mut Mask, _original: &Mask) {
        for px in mask.pixels_mut() {
            px.0[0] = 1.0 - px.0[0];
        }
    }

    fn name(&self) -> &'static str {
        "invert"
    }
}

/// Separable Gaussian blur with standard deviation `sigma` pixels.
///
/// Edges use half-sample symmetric reflection, so a constant mask stays
/// constant.
#[derive(Clone, Copy, Debug)]
pub struct GrowWithBlur {
    pub sigma: f32,
}

impl GrowWithBlur {
    pub fn new(sigma: f32) -> Self {
        Self { sigma }
    }

    fn kernel(&self) -> Vec<f32> {
        let radius = (GAUSSIAN_TRUNCATE * self.sigma + 0.5) as i32;
        let denom = 2.0 * self.sigma * self.sigma;
        let weights: Vec<f32> = (-radius..=radius)
            .map(|i| (-((i * i) as f32) / denom).exp())
            .collect();
        let sum: f32 = weights.iter().sum();
        weights.into_iter().map(|w| w / sum).collect()
    }
}

/// Reflect an out-of-range index back into `0..len` (`d c b a | a b c d`).
fn reflect(index: i32, len: i32) -> usize {
    let period = 2 * len;
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - 1 - i;
    }
    i as usize
}

/// Convolve each line of `data` (lines of `len` samples, `stride` apart).
fn convolve_lines(
    data: &mut [f32],
    lines: usize,
    len: usize,
    line_step: usize,
    stride: usize,
    kernel: &[f32],
) {
    let radius = (kernel.len() / 2) as i32;
    let mut line = vec![0.0; len];
    for l in 0..lines {
        let base = l * line_step;
        for (i, sample) in line.iter_mut().enumerate() {
            *sample = data[base + i * stride];
        }
        for i in 0..len {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let src = reflect(i as i32 + k as i32 - radius, len as i32);
                acc += w * line[src];
            }
            data[base + i * stride] = acc;
        }
    }
}

impl MaskStage for GrowWithBlur {
    fn apply(&self, mask: &mut Mask, _original: &Mask) {
        if !(self.sigma > 0.0) {
            return;
        }
        let (w, h) = (mask.width() as usize, mask.height() as usize);
        if w == 0 || h == 0 {
            return;
        }
        let kernel = self.kernel();
        let data: &mut [f32] = mask;
        // Rows, then columns
        convolve_lines(data, h, w, w, 1, &kernel);
        convolve_lines(data, w, h, 1, w, &kernel);
    }

    fn name(&self) -> &'static str {
        "grow_with_blur"
    }
}

/// Clear the mask wherever the original mask is deep inside its own region.
///
/// Depth is the Euclidean distance from each pixel to the nearest background
/// pixel of the original, normalized to [0, 1] over the frame. Pixels whose
/// normalized depth exceeds `1 - amount` are set to zero.
#[derive(Clone, Copy, Debug)]
pub struct SubtractOriginal {
    pub amount: f32,
}

impl SubtractOriginal {
    pub fn new(amount: f32) -> Self {
        Self { amount }
    }
}

impl MaskStage for SubtractOriginal {
    fn apply(&self, mask: &mut Mask, original: &Mask) {
        if !(self.amount > 0.0) || mask.dimensions() != original.dimensions() {
            return;
        }
        let depth = distance_transform(original);
        let (min, max) = depth
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| (lo.min(d), hi.max(d)));
        let range = max - min;
        if !(range > 0.0) {
            return;
        }
        let threshold = 1.0 - self.amount;
        for (px, d) in mask.pixels_mut().zip(depth) {
            if (d - min) / range > threshold {
                px.0[0] = 0.0;
            }
        }
    }

    fn name(&self) -> &'static str {
        "subtract_original"
    }
}

/// Clamp every value into [0, 1].
#[derive(Clone, Copy, Debug, Default)]
pub struct Clip;

impl MaskStage for Clip {
    fn apply(&self, mask: &mut Mask, _original: &Mask) {
        for px in mask.pixels_mut() {
            px.0[0] = px.0[0].clamp(0.0, 1.0);
        }
    }

    fn name(&self) -> &'static str {
        "clip"
    }
}

/// Exact Euclidean distance from each pixel to the nearest background
/// pixel, row-major. Foreground is any value that survives 8-bit
/// quantization. With no background at all, every distance is infinite.
pub fn distance_transform(mask: &Mask) -> Vec<f32> {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let mut sq: Vec<f32> = mask
        .pixels()
        .map(|px| if (px.0[0] * 255.0) as u8 > 0 { f32::INFINITY } else { 0.0 })
        .collect();

    let mut column = vec![0.0; h];
    let mut out = vec![0.0; w.max(h)];
    for x in 0..w {
        for y in 0..h {
            column[y] = sq[y * w + x];
        }
        squared_distance_1d(&column, &mut out[..h]);
        for y in 0..h {
            sq[y * w + x] = out[y];
        }
    }
    let mut row = vec![0.0; w];
    for y in 0..h {
        row.copy_from_slice(&sq[y * w..(y + 1) * w]);
        squared_distance_1d(&row, &mut out[..w]);
        sq[y * w..(y + 1) * w].copy_from_slice(&out[..w]);
    }
    sq.into_iter().map(f32::sqrt).collect()
}

/// One-dimensional squared distance transform over a sampled function
/// (lower envelope of parabolas).
fn squared_distance_1d(f: &[f32], out: &mut [f32]) {
    let n = f.len();
    // Sites with finite cost; an all-infinite line stays infinite
    let sites: Vec<usize> = (0..n).filter(|&q| f[q].is_finite()).collect();
    if sites.is_empty() {
        out.fill(f32::INFINITY);
        return;
    }

    let mut v = Vec::with_capacity(sites.len());
    let mut z: Vec<f32> = Vec::with_capacity(sites.len() + 1);
    v.push(sites[0]);
    z.push(f32::NEG_INFINITY);
    z.push(f32::INFINITY);
    let intersect = |q: usize, p: usize| -> f32 {
        let (qf, pf) = (q as f32, p as f32);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
    };
    for &q in &sites[1..] {
        let mut s = intersect(q, v[v.len() - 1]);
        while s <= z[v.len() - 1] {
            v.pop();
            z.pop();
            s = intersect(q, v[v.len() - 1]);
        }
        z[v.len()] = s;
        v.push(q);
        z.push(f32::INFINITY);
    }

    let mut k = 0;
    for (q, slot) in out.iter_mut().enumerate() {
        while z[k + 1] < q as f32 {
            k += 1;
        }
        let d = q as f32 - v[k] as f32;
        *slot = d * d + f[v[k]];
    }
}

/// Ordered list of stages.
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn MaskStage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn with_stage(mut self, stage: impl MaskStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// The standard chain for a run's settings. Disabled stages are left
    /// out; the final clip is always present.
    pub fn from_config(config: &ParticleMaskConfig) -> Self {
        let mut pipeline = Self::new();
        if config.invert {
            pipeline = pipeline.with_stage(Invert);
        }
        if config.grow_with_blur > 0.0 {
            pipeline = pipeline.with_stage(GrowWithBlur::new(config.grow_with_blur));
        }
        if config.subtract_original > 0.0 {
            pipeline = pipeline.with_stage(SubtractOriginal::new(config.subtract_original));
        }
        pipeline.with_stage(Clip)
    }

    /// Stage names in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage on `mask`.
    pub fn apply(&self, mask: &mut Mask, original: &Mask) {
        for stage in &self.stages {
            stage.apply(mask, original);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn filled(w: u32, h: u32, value: f32) -> Mask {
        Mask::from_pixel(w, h, Luma([value]))
    }

    #[test]
    fn test_invert() {
        let mut mask = filled(2, 2, 0.25);
        Invert.apply(&mut mask, &filled(2, 2, 0.0));
        assert_eq!(mask.get_pixel(1, 1).0[0], 0.75);
    }

    #[test]
    fn test_clip() {
        let mut mask = Mask::new(2, 1);
        mask.put_pixel(0, 0, Luma([-0.5]));
        mask.put_pixel(1, 0, Luma([1.5]));
        Clip.apply(&mut mask, &Mask::new(2, 1));
        assert_eq!(mask.get_pixel(0, 0).0[0], 0.0);
        assert_eq!(mask.get_pixel(1, 0).0[0], 1.0);
    }

    #[test]
    fn test_blur_preserves_constant_and_mass() {
        let mut constant = filled(9, 7, 0.6);
        GrowWithBlur::new(2.0).apply(&mut constant, &Mask::new(9, 7));
        assert!(constant.pixels().all(|p| (p.0[0] - 0.6).abs() < 1e-4));

        let mut dot = Mask::new(21, 21);
        dot.put_pixel(10, 10, Luma([1.0]));
        GrowWithBlur::new(1.5).apply(&mut dot, &Mask::new(21, 21));
        let total: f32 = dot.pixels().map(|p| p.0[0]).sum();
        assert!((total - 1.0).abs() < 1e-3);
        // Spreads outward, peak stays at the center
        assert!(dot.get_pixel(12, 10).0[0] > 0.0);
        assert!(dot.get_pixel(10, 10).0[0] > dot.get_pixel(11, 10).0[0]);
    }

    #[test]
    fn test_zero_sigma_is_noop() {
        let mut mask = Mask::new(3, 3);
        mask.put_pixel(1, 1, Luma([1.0]));
        let before = mask.clone();
        GrowWithBlur::new(0.0).apply(&mut mask, &Mask::new(3, 3));
        assert_eq!(mask, before);
    }

    #[test]
    fn test_distance_transform() {
        let mut mask = Mask::new(7, 7);
        for y in 1..6 {
            for x in 1..6 {
                mask.put_pixel(x, y, Luma([1.0]));
            }
        }
        let d = distance_transform(&mask);
        assert_eq!(d[0], 0.0);
        assert_eq!(d[7 + 1], 1.0);
        assert_eq!(d[3 * 7 + 3], 3.0);
        assert_eq!(d[2 * 7 + 3], 2.0);
        // Diagonal neighbour of background is one step away
        let mut single_hole = filled(3, 3, 1.0);
        single_hole.put_pixel(0, 0, Luma([0.0]));
        let d = distance_transform(&single_hole);
        assert!((d[2 * 3 + 2] - 8.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_subtract_original_clears_core() {
        let mut original = Mask::new(9, 9);
        for y in 1..8 {
            for x in 1..8 {
                original.put_pixel(x, y, Luma([1.0]));
            }
        }
        let mut mask = filled(9, 9, 1.0);
        SubtractOriginal::new(0.5).apply(&mut mask, &original);
        // Center depth 4 of max 4: cleared. Edge depth 1: kept.
        assert_eq!(mask.get_pixel(4, 4).0[0], 0.0);
        assert_eq!(mask.get_pixel(1, 4).0[0], 1.0);
        assert_eq!(mask.get_pixel(0, 0).0[0], 1.0);
    }

    #[test]
    fn test_subtract_original_flat_original_is_noop() {
        let mut mask = filled(4, 4, 1.0);
        SubtractOriginal::new(1.0).apply(&mut mask, &Mask::new(4, 4));
        assert!(mask.pixels().all(|p| p.0[0] == 1.0));
    }

    #[test]
    fn test_from_config() {
        let config = ParticleMaskConfig {
            invert: true,
            grow_with_blur: 1.0,
            subtract_original: 0.2,
            ..Default::default()
        };
        assert_eq!(
            Pipeline::from_config(&config).stage_names(),
            vec!["invert", "grow_with_blur", "subtract_original", "clip"]
        );
        let plain = Pipeline::from_config(&ParticleMaskConfig::default());
        assert_eq!(plain.stage_names(), vec!["clip"]);
    }
}
