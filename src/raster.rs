//! Particle rasterization into mask and color frames.
//!
//! Each live particle becomes a filled disc: full intensity in the mask, the
//! particle's RGB color in the image. Discs are drawn in particle order with
//! no blending, so later particles overwrite earlier ones. Pixels outside the
//! frame are silently clipped.

use crate::particle::Particle;
use glam::{Vec2, Vec3};
use image::{ImageBuffer, Luma, Rgb, Rgb32FImage};

/// Single-channel float mask, values in 0.0-1.0.
pub type Mask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// RGB float image, 0.0-1.0 per channel.
pub type Frame = Rgb32FImage;

/// Draws particles as filled discs.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rasterizer;

impl Rasterizer {
    /// Pixel center of a particle (rounded to the nearest pixel). Stays in
    /// float space so far-off particles never saturate an integer.
    #[inline]
    pub fn pixel_center(particle: &Particle) -> Vec2 {
        particle.position.round()
    }

    /// Whole-pixel disc radius; a radius-0 disc covers one pixel.
    #[inline]
    pub fn pixel_radius(particle: &Particle) -> f32 {
        particle.radius.max(0.0).trunc()
    }

    /// Draw one particle into `mask` and `image`.
    pub fn draw(&self, mask: &mut Mask, image: &mut Frame, particle: &Particle) {
        let center = Self::pixel_center(particle);
        let radius = Self::pixel_radius(particle);
        fill_disc(mask.width(), mask.height(), center, radius, |x, y| {
            mask.put_pixel(x, y, Luma([1.0]));
        });
        let color = rgb(particle.color);
        fill_disc(image.width(), image.height(), center, radius, |x, y| {
            image.put_pixel(x, y, color);
        });
    }

    /// Rasterize `particles` onto fresh black frames of the given size.
    pub fn render<'a>(
        &self,
        width: u32,
        height: u32,
        particles: impl IntoIterator<Item = &'a Particle>,
    ) -> (Mask, Frame) {
        let mut mask = Mask::new(width, height);
        let mut image = Frame::new(width, height);
        for particle in particles {
            self.draw(&mut mask, &mut image, particle);
        }
        (mask, image)
    }
}

#[inline]
fn rgb(color: Vec3) -> Rgb<f32> {
    let c = color.clamp(Vec3::ZERO, Vec3::ONE);
    Rgb([c.x, c.y, c.z])
}

/// Visit every in-bounds pixel with `dx² + dy² <= r²` around `center`.
///
/// `center` and `radius` are whole numbers. Discs that miss the frame,
/// including ones at non-finite positions, are skipped before any pixel
/// coordinate is formed.
fn fill_disc(width: u32, height: u32, center: Vec2, radius: f32, mut plot: impl FnMut(u32, u32)) {
    if width == 0 || height == 0 {
        return;
    }
    let (cx, cy, r) = (f64::from(center.x), f64::from(center.y), f64::from(radius));
    let (w, h) = (f64::from(width), f64::from(height));
    let touches = cx + r >= 0.0 && cy + r >= 0.0 && cx - r < w && cy - r < h;
    if !touches {
        return;
    }

    let y_min = (cy - r).max(0.0) as u32;
    let y_max = (cy + r).min(h - 1.0) as u32;
    for y in y_min..=y_max {
        let dy = f64::from(y) - cy;
        let span = r * r - dy * dy;
        if span < 0.0 {
            continue;
        }
        let dx = span.sqrt().floor();
        let x_min = (cx - dx).max(0.0);
        let x_max = (cx + dx).min(w - 1.0);
        if x_min > x_max {
            continue;
        }
        for x in x_min as u32..=x_max as u32 {
            plot(x, y);
        }
    }
}

/// Expand a mask to a gray RGB frame.
pub fn mask_to_frame(mask: &Mask) -> Frame {
    Frame::from_fn(mask.width(), mask.height(), |x, y| {
        let v = mask.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle_at(x: f32, y: f32, radius: f32, color: Vec3) -> Particle {
        Particle {
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
            radius,
            color,
            created_at: 0.0,
            lifetime: 1.0,
        }
    }

    #[test]
    fn test_disc_covers_radius() {
        let p = particle_at(10.0, 10.0, 3.0, Vec3::new(1.0, 0.0, 0.0));
        let (mask, image) = Rasterizer.render(20, 20, [&p]);

        assert_eq!(mask.get_pixel(10, 10).0[0], 1.0);
        assert_eq!(mask.get_pixel(13, 10).0[0], 1.0);
        assert_eq!(mask.get_pixel(10, 7).0[0], 1.0);
        assert_eq!(mask.get_pixel(14, 10).0[0], 0.0);
        // Corner of the bounding box is outside the disc
        assert_eq!(mask.get_pixel(13, 13).0[0], 0.0);
        assert_eq!(image.get_pixel(10, 10).0, [1.0, 0.0, 0.0]);
        assert_eq!(image.get_pixel(0, 0).0, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_radius_is_single_pixel() {
        let p = particle_at(4.4, 5.6, 0.5, Vec3::ONE);
        let (mask, _) = Rasterizer.render(10, 10, [&p]);
        let lit: Vec<_> = mask
            .enumerate_pixels()
            .filter(|(_, _, px)| px.0[0] > 0.0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(lit, vec![(4, 6)]);
    }

    #[test]
    fn test_offscreen_particles_are_clipped() {
        let inside = particle_at(-2.0, 5.0, 3.0, Vec3::ONE);
        let outside = particle_at(-50.0, -50.0, 3.0, Vec3::ONE);
        let (mask, _) = Rasterizer.render(10, 10, [&inside, &outside]);
        assert_eq!(mask.get_pixel(0, 5).0[0], 1.0);
        assert_eq!(mask.get_pixel(1, 5).0[0], 1.0);
        assert_eq!(mask.get_pixel(2, 5).0[0], 0.0);
    }

    #[test]
    fn test_far_away_particles_are_skipped() {
        let far = [
            particle_at(6_666_667_000.0, 16.0, 5.0, Vec3::ONE),
            particle_at(-3.0e38, 3.0e38, 5.0, Vec3::ONE),
            particle_at(f32::INFINITY, 2.0, 5.0, Vec3::ONE),
            particle_at(f32::NAN, 2.0, 5.0, Vec3::ONE),
        ];
        let (mask, image) = Rasterizer.render(32, 32, &far);
        assert!(mask.pixels().all(|p| p.0[0] == 0.0));
        assert!(image.pixels().all(|p| p.0 == [0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_huge_disc_fills_frame() {
        let p = particle_at(5.0, 5.0, 1.0e20, Vec3::ONE);
        let (mask, _) = Rasterizer.render(8, 8, [&p]);
        assert!(mask.pixels().all(|p| p.0[0] == 1.0));
    }

    #[test]
    fn test_later_particles_overwrite() {
        let red = particle_at(5.0, 5.0, 2.0, Vec3::new(1.0, 0.0, 0.0));
        let blue = particle_at(5.0, 5.0, 2.0, Vec3::new(0.0, 0.0, 1.0));
        let (_, image) = Rasterizer.render(10, 10, [&red, &blue]);
        assert_eq!(image.get_pixel(5, 5).0, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mask_to_frame() {
        let mut mask = Mask::new(2, 1);
        mask.put_pixel(1, 0, Luma([0.25]));
        let frame = mask_to_frame(&mask);
        assert_eq!(frame.get_pixel(1, 0).0, [0.25, 0.25, 0.25]);
        assert_eq!(frame.get_pixel(0, 0).0, [0.0, 0.0, 0.0]);
    }
}
