//! Warped projection quad
//!
//! Owns the four draggable corners and the vertex buffers derived from them.

use bytemuck::{Pod, Zeroable};

use super::mask::Point2D;
use super::warp::{compute_warp_for, identity_warp, WarpBuffer, WarpError};

/// Corner order of the quad. Rotating or mirroring it breaks the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    BottomLeft = 0,
    BottomRight = 1,
    TopRight = 2,
    TopLeft = 3,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::BottomLeft,
        Corner::BottomRight,
        Corner::TopRight,
        Corner::TopLeft,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Corner::BottomLeft => "bottom-left",
            Corner::BottomRight => "bottom-right",
            Corner::TopRight => "top-right",
            Corner::TopLeft => "top-left",
        }
    }
}

/// Offscreen targets a surface can sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    /// Rendered background scene
    SceneColor,
    /// Rendered audience mask
    Mask,
}

/// Triangle indices for the quad; both triangles share the bl-tr diagonal
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Canonical texture coordinates per corner
pub const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// GPU vertex for the warped quad
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    /// Position in normalized device space
    pub position: [f32; 3],
    /// Canonical texture coordinate
    pub uv: [f32; 2],
    /// Homogeneous warp coordinate (u*q, v*q, q)
    pub warp: [f32; 3],
    /// Face normal of the first triangle
    pub normal: [f32; 3],
}

impl SurfaceVertex {
    /// Size of vertex in bytes
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Vertex buffer layout for wgpu
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x2,
            2 => Float32x3,
            3 => Float32x3
        ];
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// The projection quad and its derived geometry
#[derive(Debug, Clone)]
pub struct QuadSurface {
    corners: [Point2D; 4],
    positions: [[f32; 3]; 4],
    warp: WarpBuffer,
    normals: [[f32; 3]; 4],
    /// Set when the last rebuild could not warp the current corners
    warp_fault: Option<WarpError>,
    color_source: Option<TargetId>,
    mask_source: Option<TargetId>,
    /// Bumped on every rebuild so GPU copies know when to re-upload
    revision: u64,
}

impl Default for QuadSurface {
    fn default() -> Self {
        Self::full_frame()
    }
}

impl QuadSurface {
    /// Quad covering the whole frame
    pub fn full_frame() -> Self {
        let corners = [
            Point2D::new(-1.0, -1.0),
            Point2D::new(1.0, -1.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(-1.0, 1.0),
        ];
        let mut surface = Self {
            corners,
            positions: [[0.0; 3]; 4],
            warp: identity_warp(),
            normals: [[0.0, 0.0, 1.0]; 4],
            warp_fault: None,
            color_source: None,
            mask_source: None,
            revision: 0,
        };
        // The full frame is never degenerate
        let _ = surface.rebuild();
        surface
    }

    /// Corners in (bl, br, tr, tl) order
    pub fn corners(&self) -> &[Point2D; 4] {
        &self.corners
    }

    pub fn corner(&self, corner: Corner) -> Point2D {
        self.corners[corner as usize]
    }

    /// Replace a corner and rebuild the geometry.
    ///
    /// The corner is stored even when the result is degenerate; the warp
    /// keeps its last valid value and the fault is returned.
    pub fn set_corner(&mut self, corner: Corner, point: Point2D) -> Result<(), WarpError> {
        self.corners[corner as usize] = point;
        self.rebuild()
    }

    /// Nudge a corner and rebuild the geometry
    pub fn move_corner(&mut self, corner: Corner, dx: f32, dy: f32) -> Result<(), WarpError> {
        self.corners[corner as usize].translate(dx, dy);
        self.rebuild()
    }

    /// Re-derive positions, warp and normals from the corners
    pub fn rebuild(&mut self) -> Result<(), WarpError> {
        for (position, corner) in self.positions.iter_mut().zip(self.corners.iter()) {
            *position = [corner.x, corner.y, 0.0];
        }
        self.normals = [face_normal(&self.corners); 4];
        self.revision += 1;

        match compute_warp_for(&self.corners) {
            Ok(warp) => {
                self.warp = warp;
                self.warp_fault = None;
                Ok(())
            }
            Err(e) => {
                self.warp_fault = Some(e);
                Err(e)
            }
        }
    }

    /// Fault from the last rebuild, if the corners are degenerate
    pub fn warp_fault(&self) -> Option<WarpError> {
        self.warp_fault
    }

    /// Current warp attribute (last valid value when faulted)
    pub fn warp(&self) -> &WarpBuffer {
        &self.warp
    }

    pub fn positions(&self) -> &[[f32; 3]; 4] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]; 4] {
        &self.normals
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Interleaved vertices ready for upload
    pub fn vertices(&self) -> [SurfaceVertex; 4] {
        std::array::from_fn(|i| SurfaceVertex {
            position: self.positions[i],
            uv: QUAD_UVS[i],
            warp: self.warp[i].to_array(),
            normal: self.normals[i],
        })
    }

    /// Sample the scene colour and the mask, leaving explicit bindings alone
    pub fn with_default_sources(mut self) -> Self {
        self.color_source.get_or_insert(TargetId::SceneColor);
        self.mask_source.get_or_insert(TargetId::Mask);
        self
    }

    pub fn set_color_source(&mut self, target: TargetId) {
        self.color_source = Some(target);
    }

    pub fn set_mask_source(&mut self, target: TargetId) {
        self.mask_source = Some(target);
    }

    pub fn color_source(&self) -> Option<TargetId> {
        self.color_source
    }

    pub fn mask_source(&self) -> Option<TargetId> {
        self.mask_source
    }
}

/// Unit normal of the (bl, br, tr) triangle
fn face_normal(corners: &[Point2D; 4]) -> [f32; 3] {
    let a = glam::Vec3::new(corners[0].x, corners[0].y, 0.0);
    let b = glam::Vec3::new(corners[1].x, corners[1].y, 0.0);
    let c = glam::Vec3::new(corners[2].x, corners[2].y, 0.0);

    let normal = (c - b).cross(a - b).normalize_or_zero();
    normal.to_array()
}
