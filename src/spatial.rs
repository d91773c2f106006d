//! Uniform-grid spatial hashing for particle-particle collisions.
//!
//! Particles are bucketed into square cells keyed by integer cell
//! coordinates. A neighbor query only visits the cells that can contain a
//! particle within the query radius, so collision checks stay close to linear
//! for the hundreds to low thousands of particles a run typically holds.
//!
//! The grid is rebuilt from scratch every sub-step. Cell keys saturate at the
//! `i32` range, so particles that fly far off frame share edge cells instead
//! of overflowing.

use crate::particle::Particle;
use glam::Vec2;
use std::collections::HashMap;

/// Cell size as a multiple of the largest particle size.
pub const CELL_SIZE_FACTOR: f32 = 2.5;

/// Square-cell spatial hash over particle indices.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    /// Create an empty grid. `cell_size` is clamped to at least one pixel.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
        }
    }

    /// Grid sized for particles no larger than `max_particle_size` pixels.
    pub fn for_particle_size(max_particle_size: f32) -> Self {
        Self::new(max_particle_size * CELL_SIZE_FACTOR)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Drop every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Insert particle `index` at `pos`.
    pub fn insert(&mut self, index: usize, pos: Vec2) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Rebuild from a particle slice.
    pub fn rebuild(&mut self, particles: &[Particle]) {
        self.clear();
        for (i, p) in particles.iter().enumerate() {
            self.insert(i, p.position);
        }
    }

    /// Indices in every cell that may hold a particle within `radius` of
    /// `pos`. Candidates still need an exact distance check.
    pub fn query_radius(&self, pos: Vec2, radius: f32) -> Vec<usize> {
        let (cx, cy) = self.cell_of(pos);
        let range = (radius / self.cell_size).ceil() as i32;
        let mut neighbors = Vec::new();
        for dx in -range..=range {
            for dy in -range..=range {
                // Past the edge of the key space there are no cells
                let (Some(x), Some(y)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                    continue;
                };
                if let Some(indices) = self.cells.get(&(x, y)) {
                    neighbors.extend_from_slice(indices);
                }
            }
        }
        neighbors
    }
}

/// Resolve overlaps between equal-mass circular particles.
///
/// Each overlapping pair is separated along the line between their centers,
/// half the overlap each. If the pair is approaching, the normal component of
/// their relative velocity is reversed and scaled by `restitution`. Returns
/// the number of contacts resolved.
pub fn resolve_collisions(
    particles: &mut [Particle],
    grid: &mut SpatialGrid,
    restitution: f32,
) -> usize {
    grid.rebuild(particles);
    let max_radius = particles.iter().map(|p| p.radius).fold(0.0_f32, f32::max);
    let mut contacts = 0;

    for i in 0..particles.len() {
        let search = particles[i].radius + max_radius;
        let candidates = grid.query_radius(particles[i].position, search);
        for j in candidates {
            if j <= i {
                continue;
            }
            let offset = particles[j].position - particles[i].position;
            let distance = offset.length();
            let reach = particles[i].radius + particles[j].radius;
            if distance >= reach {
                continue;
            }
            // Coincident centers: pick a fixed axis so the pair still separates
            let normal = if distance > f32::EPSILON {
                offset / distance
            } else {
                Vec2::X
            };
            let correction = normal * (reach - distance) * 0.5;
            particles[i].position -= correction;
            particles[j].position += correction;

            let approach = (particles[j].velocity - particles[i].velocity).dot(normal);
            if approach < 0.0 {
                let impulse = normal * (-(1.0 + restitution) * approach * 0.5);
                particles[i].velocity -= impulse;
                particles[j].velocity += impulse;
            }
            contacts += 1;
        }
    }
    contacts
}
