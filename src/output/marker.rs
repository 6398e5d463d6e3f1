//! Flat-colour geometry for the mask fill and the selection markers

use bytemuck::{Pod, Zeroable};

use super::composite::Rgba;
use super::mask::{MaskPolygon, Point2D};

/// Mask fill; the red channel is the mask key
pub const MASK_FILL: Rgba = [1.0, 0.0, 0.0, 1.0];
/// Selected mask vertex; the green channel is added to the output
pub const MASK_MARKER_COLOR: Rgba = [0.0, 1.0, 0.0, 1.0];
/// Selected quad corner, drawn straight onto the output
pub const QUAD_MARKER_COLOR: Rgba = [1.0, 1.0, 1.0, 1.0];

pub const MASK_MARKER_RADIUS: f32 = 0.02;
pub const QUAD_MARKER_INNER_RADIUS: f32 = 0.02;
pub const QUAD_MARKER_OUTER_RADIUS: f32 = 0.04;
pub const MARKER_SEGMENTS: u32 = 16;

/// Vertex for untextured 2D geometry in normalized device space
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SolidVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl SolidVertex {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(point: Point2D, color: Rgba) -> Self {
        Self {
            position: [point.x, point.y],
            color,
        }
    }

    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Indexed triangle list of solid vertices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolidMesh {
    pub vertices: Vec<SolidVertex>,
    pub indices: Vec<u32>,
}

impl SolidMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Filled mask polygon from its cached triangulation
    pub fn from_mask(mask: &MaskPolygon, color: Rgba) -> Self {
        Self {
            vertices: mask
                .points()
                .iter()
                .map(|p| SolidVertex::new(*p, color))
                .collect(),
            indices: mask.triangles().iter().flatten().copied().collect(),
        }
    }

    /// Append another mesh, rebasing its indices
    pub fn append(&mut self, other: &SolidMesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Filled circle as a triangle fan around the centre
    pub fn disc(center: Point2D, radius: f32, segments: u32, color: Rgba) -> Self {
        let segments = segments.max(3);
        let mut mesh = Self::new();
        mesh.vertices.push(SolidVertex::new(center, color));
        for i in 0..segments {
            mesh.vertices
                .push(SolidVertex::new(circle_point(center, radius, i, segments), color));
        }
        for i in 0..segments {
            let a = 1 + i;
            let b = 1 + (i + 1) % segments;
            mesh.indices.extend_from_slice(&[0, a, b]);
        }
        mesh
    }

    /// Annulus between two radii, two triangles per segment
    pub fn ring(center: Point2D, inner: f32, outer: f32, segments: u32, color: Rgba) -> Self {
        let segments = segments.max(3);
        let mut mesh = Self::new();
        for i in 0..segments {
            mesh.vertices
                .push(SolidVertex::new(circle_point(center, inner, i, segments), color));
            mesh.vertices
                .push(SolidVertex::new(circle_point(center, outer, i, segments), color));
        }
        for i in 0..segments {
            let inner_a = 2 * i;
            let outer_a = inner_a + 1;
            let inner_b = 2 * ((i + 1) % segments);
            let outer_b = inner_b + 1;
            mesh.indices
                .extend_from_slice(&[inner_a, outer_a, outer_b, outer_b, inner_b, inner_a]);
        }
        mesh
    }

    /// Green disc over the selected mask vertex
    pub fn mask_marker(center: Point2D) -> Self {
        Self::disc(center, MASK_MARKER_RADIUS, MARKER_SEGMENTS, MASK_MARKER_COLOR)
    }

    /// White ring around the selected quad corner
    pub fn quad_marker(center: Point2D) -> Self {
        Self::ring(
            center,
            QUAD_MARKER_INNER_RADIUS,
            QUAD_MARKER_OUTER_RADIUS,
            MARKER_SEGMENTS,
            QUAD_MARKER_COLOR,
        )
    }

    /// Each triangle as three points
    pub fn triangles(&self) -> impl Iterator<Item = [&SolidVertex; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(move |tri| {
            Some([
                self.vertices.get(tri[0] as usize)?,
                self.vertices.get(tri[1] as usize)?,
                self.vertices.get(tri[2] as usize)?,
            ])
        })
    }
}

fn circle_point(center: Point2D, radius: f32, i: u32, segments: u32) -> Point2D {
    let angle = std::f32::consts::TAU * i as f32 / segments as f32;
    Point2D::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}
