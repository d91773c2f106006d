//! Boundary extraction from occupancy masks.
//!
//! Turns a binary mask into closed polygons usable for particle collision:
//!
//! 1. threshold the mask into foreground / background
//! 2. trace the outer contour of every external foreground region
//!    (Moore-neighbour tracing, 8-connected foreground)
//! 3. drop points in the middle of straight pixel runs
//! 4. simplify each closed contour with Ramer-Douglas-Peucker at a tolerance
//!    of 1% of its perimeter
//! 5. emit the polygon edges, wrapping last vertex to first
//!
//! Regions sitting inside a hole of another region are not external and
//! produce no contour. Polygons that simplify to fewer than three vertices
//! are discarded; an empty mask yields no segments.

use crate::raster::Mask;
use glam::{IVec2, Vec2};

/// Mask values at or above this count as foreground.
pub const FOREGROUND_THRESHOLD: f32 = 0.5;

/// Simplification tolerance as a fraction of each contour's closed arc length.
pub const SIMPLIFY_TOLERANCE: f32 = 0.01;

/// Clockwise neighbour ring in image coordinates (y grows downward),
/// starting east.
const RING: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, 0),
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
];

const WEST: usize = 4;

/// One edge of a simplified boundary polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Start vertex.
    pub a: Vec2,
    /// End vertex.
    pub b: Vec2,
}

impl Segment {
    /// Create a segment from `a` to `b`.
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Unit normal (the edge direction rotated +90 degrees). Zero for a
    /// degenerate segment.
    pub fn normal(&self) -> Vec2 {
        (self.b - self.a).perp().normalize_or_zero()
    }

    /// Intersect the motion `from -> to` with this segment.
    ///
    /// Returns the fraction along the motion at which the crossing happens,
    /// or `None` when the two do not cross. Parallel and zero-length motions
    /// never intersect.
    pub fn intersect(&self, from: Vec2, to: Vec2) -> Option<f32> {
        let r = to - from;
        let s = self.b - self.a;
        let denom = r.perp_dot(s);
        if denom.abs() <= f32::EPSILON {
            return None;
        }
        let offset = self.a - from;
        let t = offset.perp_dot(s) / denom;
        let u = offset.perp_dot(r) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }
}

/// Thresholded view of a mask with out-of-bounds reads as background.
struct Occupancy {
    width: i32,
    height: i32,
    cells: Vec<bool>,
}

impl Occupancy {
    fn from_mask(mask: &Mask) -> Self {
        Self {
            width: mask.width() as i32,
            height: mask.height() as i32,
            cells: mask.pixels().map(|p| p.0[0] >= FOREGROUND_THRESHOLD).collect(),
        }
    }

    #[inline]
    fn in_bounds(&self, p: IVec2) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.width && p.y < self.height
    }

    #[inline]
    fn index(&self, p: IVec2) -> usize {
        (p.y * self.width + p.x) as usize
    }

    #[inline]
    fn get(&self, p: IVec2) -> bool {
        self.in_bounds(p) && self.cells[self.index(p)]
    }

    /// Background cells 4-connected to the image border.
    fn outer_background(&self) -> Vec<bool> {
        let mut outside = vec![false; self.cells.len()];
        let mut stack = Vec::new();
        for x in 0..self.width {
            stack.push(IVec2::new(x, 0));
            stack.push(IVec2::new(x, self.height - 1));
        }
        for y in 0..self.height {
            stack.push(IVec2::new(0, y));
            stack.push(IVec2::new(self.width - 1, y));
        }
        while let Some(p) = stack.pop() {
            if !self.in_bounds(p) || self.get(p) {
                continue;
            }
            let i = self.index(p);
            if outside[i] {
                continue;
            }
            outside[i] = true;
            for d in [RING[0], RING[2], RING[4], RING[6]] {
                stack.push(p + d);
            }
        }
        outside
    }

    /// Collect the 8-connected component containing `seed`, marking it visited.
    fn component(&self, seed: IVec2, visited: &mut [bool]) -> Vec<IVec2> {
        let mut pixels = Vec::new();
        let mut stack = vec![seed];
        visited[self.index(seed)] = true;
        while let Some(p) = stack.pop() {
            pixels.push(p);
            for d in RING {
                let n = p + d;
                if self.get(n) && !visited[self.index(n)] {
                    visited[self.index(n)] = true;
                    stack.push(n);
                }
            }
        }
        pixels
    }

    /// A region is external when it touches the border or the outer background.
    fn is_external(&self, pixels: &[IVec2], outside: &[bool]) -> bool {
        pixels.iter().any(|&p| {
            [RING[0], RING[2], RING[4], RING[6]].iter().any(|&d| {
                let n = p + d;
                !self.in_bounds(n) || outside[self.index(n)]
            })
        })
    }

    /// Moore-neighbour trace starting from the region's top-left pixel.
    ///
    /// The west neighbour of the start pixel is background, so it seeds the
    /// backtrack. Tracing stops when the walk is about to leave the start
    /// pixel with the same move it made first.
    fn trace(&self, start: IVec2) -> Vec<IVec2> {
        let mut contour = Vec::new();
        let mut current = start;
        let mut back = WEST;
        let mut first_move = None;
        let limit = 4 * self.cells.len() + 8;

        for _ in 0..limit {
            let Some(step) = (1..=8)
                .map(|i| (back + i) % 8)
                .find(|&d| self.get(current + RING[d]))
            else {
                break;
            };

            if current == start {
                match first_move {
                    Some(first) if step == first => break,
                    None => first_move = Some(step),
                    Some(_) => {}
                }
            }

            contour.push(current);
            let next = current + RING[step];
            let backtrack = current + RING[(step + 7) % 8];
            back = ring_index(backtrack - next);
            current = next;
        }

        if contour.is_empty() {
            // Isolated pixel
            contour.push(start);
        }
        contour
    }
}

fn ring_index(offset: IVec2) -> usize {
    RING.iter().position(|&d| d == offset).unwrap_or(WEST)
}

/// Trace the outer contour of every external foreground region in `mask`.
///
/// Contours are returned in raster order of their top-left pixel, as
/// pixel-center coordinates walked clockwise on screen.
pub fn trace_external_contours(mask: &Mask) -> Vec<Vec<IVec2>> {
    let occ = Occupancy::from_mask(mask);
    if !occ.cells.iter().any(|&c| c) {
        return Vec::new();
    }
    let outside = occ.outer_background();
    let mut visited = vec![false; occ.cells.len()];
    let mut contours = Vec::new();

    for y in 0..occ.height {
        for x in 0..occ.width {
            let p = IVec2::new(x, y);
            let i = occ.index(p);
            if !occ.cells[i] || visited[i] {
                continue;
            }
            let pixels = occ.component(p, &mut visited);
            if occ.is_external(&pixels, &outside) {
                contours.push(occ.trace(p));
            }
        }
    }
    contours
}

/// Keep only the corners of a closed unit-step chain.
fn compress_runs(points: &[IVec2]) -> Vec<IVec2> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            points[i] - prev != next - points[i]
        })
        .map(|i| points[i])
        .collect()
}

/// Perimeter of a closed polygon.
pub fn closed_arc_length(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].distance(points[(i + 1) % n]))
        .sum()
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Ramer-Douglas-Peucker on an open polyline; keeps both endpoints.
fn simplify_open(points: &[Vec2], epsilon: f32) -> Vec<Vec2> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut ranges = vec![(0usize, points.len() - 1)];
    while let Some((first, last)) = ranges.pop() {
        if last <= first + 1 {
            continue;
        }
        let (index, dist) = (first + 1..last)
            .map(|i| (i, distance_to_segment(points[i], points[first], points[last])))
            .fold((first, -1.0f32), |best, cur| if cur.1 > best.1 { cur } else { best });
        if dist > epsilon {
            keep[index] = true;
            ranges.push((first, index));
            ranges.push((index, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Simplify a closed polygon with tolerance `epsilon`.
///
/// The ring is split at its first vertex and the vertex farthest from it;
/// both halves are simplified independently and joined.
pub fn simplify_closed(points: &[Vec2], epsilon: f32) -> Vec<Vec2> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let far = (1..n)
        .max_by(|&i, &j| {
            let di = points[i].distance_squared(points[0]);
            let dj = points[j].distance_squared(points[0]);
            di.total_cmp(&dj)
        })
        .unwrap_or(n - 1);

    let first_half = simplify_open(&points[..=far], epsilon);
    let mut second: Vec<Vec2> = points[far..].to_vec();
    second.push(points[0]);
    let second_half = simplify_open(&second, epsilon);

    let mut result = first_half;
    result.pop();
    result.extend_from_slice(&second_half[..second_half.len() - 1]);
    result
}

/// Simplified closed polygons for every external region of `mask`.
pub fn extract_polygons(mask: &Mask) -> Vec<Vec<Vec2>> {
    trace_external_contours(mask)
        .iter()
        .filter_map(|contour| {
            let corners: Vec<Vec2> = compress_runs(contour)
                .into_iter()
                .map(|p| p.as_vec2())
                .collect();
            let epsilon = SIMPLIFY_TOLERANCE * closed_arc_length(&corners);
            let polygon = simplify_closed(&corners, epsilon);
            (polygon.len() >= 3).then_some(polygon)
        })
        .collect()
}

/// Boundary segments of `mask`: the edges of every polygon from
/// [`extract_polygons`], last vertex wrapping to first.
pub fn extract_boundary(mask: &Mask) -> Vec<Segment> {
    extract_polygons(mask)
        .iter()
        .flat_map(|polygon| {
            let n = polygon.len();
            (0..n).map(move |i| Segment::new(polygon[i], polygon[(i + 1) % n]))
        })
        .collect()
}
