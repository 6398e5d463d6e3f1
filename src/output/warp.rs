//! Perspective warp for a single projection quad
//!
//! Computes per-vertex homogeneous texture coordinates for a quad whose four
//! corners can be dragged anywhere on screen. Interpolating `(u·q, v·q, q)`
//! linearly across the two triangles and dividing by `q` per pixel gives a
//! projective (not affine) mapping of the source texture onto the quad.

use thiserror::Error;

use super::mask::Point2D;

/// Warp attribute for the 4 quad corners, in corner order (bl, br, tr, tl)
pub type WarpBuffer = [WarpVertex; 4];

/// Reasons a quad cannot be warped
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum WarpError {
    /// Diagonals are parallel (zero-area or collapsed quad)
    #[error("quad diagonals are parallel")]
    ParallelDiagonals,

    /// Diagonals meet outside the quad (concave or self-intersecting quad)
    #[error("quad diagonals do not intersect inside the quad (s = {s}, t = {t})")]
    DiagonalsDoNotIntersect { s: f32, t: f32 },
}

/// Homogeneous texture coordinate for one quad corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpVertex {
    /// u * q
    pub x: f32,
    /// v * q
    pub y: f32,
    /// Perspective weight q
    pub z: f32,
}

impl WarpVertex {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Texture coordinate after perspective division, bottom-left origin.
    ///
    /// This is the `uvq` of the composite rule: the y component is flipped so
    /// the first corner (bottom-left) samples `(0, 0)`.
    pub fn texcoord(&self) -> [f32; 2] {
        [self.x / self.z, 1.0 - self.y / self.z]
    }

    /// Linear interpolation, matching what the rasterizer does between vertices
    pub fn lerp(&self, other: &WarpVertex, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Identity warp: every perspective weight is 2 (diagonals cross at the centre)
pub fn identity_warp() -> WarpBuffer {
    [
        WarpVertex::new(0.0, 2.0, 2.0),
        WarpVertex::new(2.0, 2.0, 2.0),
        WarpVertex::new(2.0, 0.0, 2.0),
        WarpVertex::new(0.0, 0.0, 2.0),
    ]
}

/// Where the quad diagonals cross
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagonalIntersection {
    /// Fraction along the bottom-right → top-left diagonal
    pub s: f32,
    /// Fraction along the bottom-left → top-right diagonal
    pub t: f32,
}

/// Intersect the quad diagonals (bl→tr and br→tl).
pub fn diagonal_intersection(
    bl: Point2D,
    br: Point2D,
    tr: Point2D,
    tl: Point2D,
) -> Result<DiagonalIntersection, WarpError> {
    let a = tr.sub(&bl);
    let b = tl.sub(&br);
    let cross = a.cross(&b);

    if cross == 0.0 {
        return Err(WarpError::ParallelDiagonals);
    }

    let c = bl.sub(&br);
    let s = a.cross(&c) / cross;
    let t = b.cross(&c) / cross;

    // Negated comparisons also reject NaN
    if !(s > 0.0 && s < 1.0 && t > 0.0 && t < 1.0) {
        return Err(WarpError::DiagonalsDoNotIntersect { s, t });
    }

    Ok(DiagonalIntersection { s, t })
}

/// Compute the warp attribute for a quad given in (bl, br, tr, tl) order.
///
/// Texture corners are the unit square; the first vertex maps to texture
/// `(0, 0)` after [`WarpVertex::texcoord`].
pub fn compute_warp(
    bl: Point2D,
    br: Point2D,
    tr: Point2D,
    tl: Point2D,
) -> Result<WarpBuffer, WarpError> {
    let DiagonalIntersection { s, t } = diagonal_intersection(bl, br, tr, tl)?;

    let (u0, v0) = (0.0, 0.0);
    let (u2, v2) = (1.0, 1.0);

    let q0 = 1.0 / (1.0 - t);
    let q1 = 1.0 / (1.0 - s);
    let q2 = 1.0 / t;
    let q3 = 1.0 / s;

    let warp = [
        WarpVertex::new(u0 * q0, v2 * q0, q0),
        WarpVertex::new(u2 * q1, v2 * q1, q1),
        WarpVertex::new(u2 * q2, v0 * q2, q2),
        WarpVertex::new(u0 * q3, v0 * q3, q3),
    ];

    // s and t strictly inside (0, 1) keep every weight finite, but corners
    // very close to each other can still overflow f32.
    if warp.iter().all(WarpVertex::is_finite) {
        Ok(warp)
    } else {
        Err(WarpError::DiagonalsDoNotIntersect { s, t })
    }
}

/// [`compute_warp`] for corners stored in order
pub fn compute_warp_for(corners: &[Point2D; 4]) -> Result<WarpBuffer, WarpError> {
    compute_warp(corners[0], corners[1], corners[2], corners[3])
}
