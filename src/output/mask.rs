//! Audience mask polygon
//!
//! The mask is an editable closed polygon describing the region of the
//! projection surface the audience is allowed to see. It is re-triangulated
//! on every edit and rendered into the mask target only when marked dirty.

use serde::{Deserialize, Serialize};

/// Smallest polygon the mask can shrink to
pub const MIN_MASK_POINTS: usize = 3;

/// A 2D point used for quad corners and mask vertices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate (normalized device space, -1.0 to 1.0)
    pub x: f32,
    /// Y coordinate (normalized device space, -1.0 to 1.0)
    pub y: f32,
}

impl Default for Point2D {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Point2D {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Distance to another point
    pub fn distance(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation to another point
    pub fn lerp(&self, other: &Point2D, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Halfway point between this point and another
    pub fn midpoint(&self, other: &Point2D) -> Self {
        self.lerp(other, 0.5)
    }

    /// Move the point in place
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// 2D cross product of two vectors stored as points
    pub fn cross(&self, other: &Point2D) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Component-wise difference `self - other`
    pub fn sub(&self, other: &Point2D) -> Point2D {
        Point2D::new(self.x - other.x, self.y - other.y)
    }

    /// Whether both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point2D {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point2D {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2D> for glam::Vec2 {
    fn from(p: Point2D) -> Self {
        glam::Vec2::new(p.x, p.y)
    }
}

/// Editable, always-triangulated mask polygon
#[derive(Debug, Clone)]
pub struct MaskPolygon {
    /// Vertices in order; the last vertex connects back to the first
    points: Vec<Point2D>,
    /// Triangle indices into `points` from the last re-triangulation
    triangles: Vec<[u32; 3]>,
    /// Set by every mutation, consumed by the compositor
    dirty: bool,
}

impl Default for MaskPolygon {
    fn default() -> Self {
        Self::full_frame()
    }
}

impl MaskPolygon {
    /// Create a mask covering the whole frame
    pub fn full_frame() -> Self {
        let mut mask = Self {
            points: vec![
                Point2D::new(-1.0, -1.0),
                Point2D::new(1.0, -1.0),
                Point2D::new(1.0, 1.0),
                Point2D::new(-1.0, 1.0),
            ],
            triangles: Vec::new(),
            dirty: true,
        };
        mask.retriangulate();
        mask
    }

    /// Create a mask from points. Returns `None` for fewer than three points.
    pub fn from_points(points: Vec<Point2D>) -> Option<Self> {
        if points.len() < MIN_MASK_POINTS {
            return None;
        }
        let mut mask = Self {
            points,
            triangles: Vec::new(),
            dirty: true,
        };
        mask.retriangulate();
        Some(mask)
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; the polygon never has fewer than three vertices
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vertices in order
    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Vertex at `index`
    pub fn point(&self, index: usize) -> Option<Point2D> {
        self.points.get(index).copied()
    }

    /// Triangles from the last re-triangulation
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Index of the vertex following `index`, wrapping around
    pub fn successor(&self, index: usize) -> usize {
        (index + 1) % self.points.len()
    }

    /// Index of the vertex preceding `index`, wrapping around
    pub fn predecessor(&self, index: usize) -> usize {
        (index + self.points.len() - 1) % self.points.len()
    }

    /// Insert `point` so it ends up at `before_index`
    ///
    /// Indices past the end append the point.
    pub fn insert(&mut self, before_index: usize, point: Point2D) {
        let index = before_index.min(self.points.len());
        self.points.insert(index, point);
        self.retriangulate();
    }

    /// Insert the midpoint of `selected` and its successor.
    ///
    /// Returns the index of the new vertex.
    pub fn insert_midpoint_after(&mut self, selected: usize) -> usize {
        let selected = selected % self.points.len();
        let next = self.successor(selected);
        let midpoint = self.points[selected].midpoint(&self.points[next]);
        // Inserting at index 0 when wrapping keeps the new vertex on the
        // closing edge between the last and first vertices.
        self.insert(next, midpoint);
        next
    }

    /// Insert the midpoint of the predecessor of `selected` and `selected`.
    ///
    /// Returns the index of the new vertex.
    pub fn insert_midpoint_before(&mut self, selected: usize) -> usize {
        let selected = selected % self.points.len();
        self.insert_midpoint_after(self.predecessor(selected))
    }

    /// Remove the vertex at `index`.
    ///
    /// Refused when the polygon would drop below three vertices.
    pub fn remove(&mut self, index: usize) -> Option<Point2D> {
        if self.points.len() <= MIN_MASK_POINTS || index >= self.points.len() {
            return None;
        }
        let removed = self.points.remove(index);
        self.retriangulate();
        Some(removed)
    }

    /// Move the vertex at `index` by a delta
    pub fn move_point(&mut self, index: usize, dx: f32, dy: f32) -> bool {
        let Some(point) = self.points.get_mut(index) else {
            return false;
        };
        point.translate(dx, dy);
        self.retriangulate();
        true
    }

    /// Rebuild the triangle list from the current vertices
    pub fn retriangulate(&mut self) {
        self.triangles = triangulate(&self.points);
        self.dirty = true;
    }

    /// Whether the mask needs to be rendered again
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Request a redraw of the mask pass without changing the geometry
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Consume the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Even-odd point-in-polygon test
    pub fn contains(&self, point: Point2D) -> bool {
        let mut inside = false;
        let mut j = self.points.len() - 1;

        for i in 0..self.points.len() {
            let pi = self.points[i];
            let pj = self.points[j];

            if ((pi.y > point.y) != (pj.y > point.y))
                && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

/// Triangulate a simple polygon.
///
/// Uses ear clipping; falls back to a fan from vertex 0 when ear clipping
/// cannot produce triangles (degenerate or self-intersecting outlines).
pub fn triangulate(points: &[Point2D]) -> Vec<[u32; 3]> {
    if points.len() < MIN_MASK_POINTS {
        return Vec::new();
    }

    let coords: Vec<f64> = points
        .iter()
        .flat_map(|p| [p.x as f64, p.y as f64])
        .collect();

    match earcutr::earcut(&coords, &[], 2) {
        Ok(indices) if indices.len() >= 3 && indices.len() % 3 == 0 => indices
            .chunks_exact(3)
            .map(|tri| [tri[0] as u32, tri[1] as u32, tri[2] as u32])
            .collect(),
        _ => {
            tracing::debug!(points = points.len(), "Ear clipping failed, using fan triangulation");
            fan_triangulate(points.len())
        }
    }
}

/// Fan triangulation from vertex 0
pub fn fan_triangulate(count: usize) -> Vec<[u32; 3]> {
    (1..count.saturating_sub(1))
        .map(|i| [0, i as u32, i as u32 + 1])
        .collect()
}
