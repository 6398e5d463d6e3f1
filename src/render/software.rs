//! CPU reference renderer
//!
//! Executes the same three passes as the GPU renderer into `image` buffers.
//! Used headless by tests and as a fallback for inspecting a frame.

use std::convert::Infallible;

use glam::{Vec2, Vec3, Vec4};
use image::{Rgba, Rgba32FImage};

use crate::compositor::RenderBackend;
use crate::output::composite::{composite_pixel, CompositeParams, Rgba as Color, TextureSource};
use crate::output::surface::QUAD_INDICES;
use crate::output::{QuadSurface, SolidMesh, TargetId, WarpVertex};
use crate::scene::SceneDescriptor;

use super::mesh::{build_scene_mesh, SceneUniforms};

const BLACK: Color = [0.0, 0.0, 0.0, 1.0];

/// Offscreen target sampled with nearest filtering
pub struct SoftwareTarget {
    image: Rgba32FImage,
}

impl SoftwareTarget {
    pub fn new(width: u32, height: u32) -> Self {
        let mut target = Self {
            image: Rgba32FImage::new(width.max(1), height.max(1)),
        };
        target.clear(BLACK);
        target
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &Rgba32FImage {
        &self.image
    }

    pub fn clear(&mut self, color: Color) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba(color);
        }
    }

    /// Pixel at a row-from-top position
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.image.get_pixel(x, y).0
    }

    /// Colour at a point in normalized device space
    pub fn at_ndc(&self, x: f32, y: f32) -> Color {
        let (px, py) = ndc_to_pixel(x, y, self.width(), self.height());
        let col = (px.floor().max(0.0) as u32).min(self.width() - 1);
        let row = (py.floor().max(0.0) as u32).min(self.height() - 1);
        self.pixel(col, row)
    }

    fn put(&mut self, x: u32, y: u32, color: Color) {
        self.image.put_pixel(x, y, Rgba(color));
    }

    /// Fill a flat-coloured triangle list given in normalized device space
    pub fn fill_mesh(&mut self, mesh: &SolidMesh) {
        let (width, height) = (self.width(), self.height());
        for [a, b, c] in mesh.triangles() {
            let points = [a, b, c].map(|v| {
                let (x, y) = ndc_to_pixel(v.position[0], v.position[1], width, height);
                Vec2::new(x, y)
            });
            let color = a.color;
            rasterize(points, width, height, |x, y, _| self.put(x, y, color));
        }
    }
}

impl TextureSource for SoftwareTarget {
    /// Texture coordinates with a bottom-left origin; clamp to edge
    fn sample(&self, uv: [f32; 2]) -> Color {
        let (width, height) = (self.width(), self.height());
        let col = ((uv[0] * width as f32).floor().max(0.0) as u32).min(width - 1);
        let row_from_bottom = ((uv[1] * height as f32).floor().max(0.0) as u32).min(height - 1);
        self.pixel(col, height - 1 - row_from_bottom)
    }
}

/// Renderer writing colour, mask and output into CPU images
pub struct SoftwareRenderer {
    color: SoftwareTarget,
    mask: SoftwareTarget,
    depth: Vec<f32>,
    output: SoftwareTarget,
    /// Sampled in place of an unbound surface source
    blank: SoftwareTarget,
    clear_color: Color,
}

impl SoftwareRenderer {
    /// Square offscreen targets of `buffer_size`, output of `width`×`height`
    pub fn new(buffer_size: u32, width: u32, height: u32) -> Self {
        let color = SoftwareTarget::new(buffer_size, buffer_size);
        let depth = vec![1.0; (color.width() * color.height()) as usize];
        Self {
            color,
            mask: SoftwareTarget::new(buffer_size, buffer_size),
            depth,
            output: SoftwareTarget::new(width, height),
            blank: SoftwareTarget::new(1, 1),
            clear_color: BLACK,
        }
    }

    pub fn set_clear_color(&mut self, rgb: [f64; 3]) {
        self.clear_color = [rgb[0] as f32, rgb[1] as f32, rgb[2] as f32, 1.0];
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.output = SoftwareTarget::new(width, height);
    }

    pub fn color_target(&self) -> &SoftwareTarget {
        &self.color
    }

    /// Direct access to the colour target, e.g. to show a still image
    pub fn color_target_mut(&mut self) -> &mut SoftwareTarget {
        &mut self.color
    }

    pub fn mask_target(&self) -> &SoftwareTarget {
        &self.mask
    }

    pub fn output(&self) -> &SoftwareTarget {
        &self.output
    }
}

impl RenderBackend for SoftwareRenderer {
    type Error = Infallible;

    fn render_mask(&mut self, mesh: &SolidMesh) -> Result<(), Self::Error> {
        self.mask.clear(BLACK);
        self.mask.fill_mesh(mesh);
        Ok(())
    }

    fn render_scene(&mut self, scene: &SceneDescriptor) -> Result<(), Self::Error> {
        let (width, height) = (self.color.width(), self.color.height());
        self.color.clear(BLACK);
        self.depth.iter_mut().for_each(|d| *d = 1.0);

        let uniforms = SceneUniforms::new(scene, width as f32 / height as f32);
        let view_proj = glam::Mat4::from_cols_array_2d(&uniforms.view_proj);
        let vertices = build_scene_mesh(scene);

        for triangle in vertices.chunks_exact(3) {
            let clip = [0, 1, 2].map(|i| view_proj * Vec3::from(triangle[i].position).extend(1.0));
            // No clipping: drop triangles that reach behind the camera
            if clip.iter().any(|c| c.w <= 0.0) {
                continue;
            }
            let ndc: [Vec4; 3] = clip.map(|c| c / c.w);
            let points = ndc.map(|p| {
                let (x, y) = ndc_to_pixel(p.x, p.y, width, height);
                Vec2::new(x, y)
            });

            // Back-face culling: counter-clockwise in device space faces the camera
            let area = (ndc[1].x - ndc[0].x) * (ndc[2].y - ndc[0].y)
                - (ndc[2].x - ndc[0].x) * (ndc[1].y - ndc[0].y);
            if area <= 0.0 {
                continue;
            }

            let lit = uniforms.shade(
                Vec3::from(triangle[0].normal),
                Vec3::from(triangle[0].color),
            );
            let color = [lit.x, lit.y, lit.z, 1.0];
            let depth = &mut self.depth;
            let target = &mut self.color;

            rasterize(points, width, height, |x, y, bary| {
                let z = bary[0] * ndc[0].z + bary[1] * ndc[1].z + bary[2] * ndc[2].z;
                if !(0.0..=1.0).contains(&z) {
                    return;
                }
                let slot = &mut depth[(y * width + x) as usize];
                if z < *slot {
                    *slot = z;
                    target.put(x, y, color);
                }
            });
        }
        Ok(())
    }

    fn render_surface(
        &mut self,
        surface: &QuadSurface,
        params: CompositeParams,
        overlay: &SolidMesh,
    ) -> Result<(), Self::Error> {
        let (width, height) = (self.output.width(), self.output.height());
        let positions = surface.positions();
        let warp = surface.warp();
        let (scene, mask_target, blank) = (&self.color, &self.mask, &self.blank);
        let resolve = move |source: Option<TargetId>| match source {
            Some(TargetId::SceneColor) => scene,
            Some(TargetId::Mask) => mask_target,
            None => blank,
        };
        let color = resolve(surface.color_source());
        let mask = resolve(surface.mask_source());
        let output = &mut self.output;

        output.clear(self.clear_color);

        for tri in QUAD_INDICES.chunks_exact(3) {
            let corners = [tri[0], tri[1], tri[2]].map(|i| i as usize);
            let points = corners.map(|i| {
                let (x, y) = ndc_to_pixel(positions[i][0], positions[i][1], width, height);
                Vec2::new(x, y)
            });
            let warps = corners.map(|i| warp[i]);

            rasterize(points, width, height, |x, y, bary| {
                let interpolated = WarpVertex::new(
                    bary[0] * warps[0].x + bary[1] * warps[1].x + bary[2] * warps[2].x,
                    bary[0] * warps[0].y + bary[1] * warps[1].y + bary[2] * warps[2].y,
                    bary[0] * warps[0].z + bary[1] * warps[1].z + bary[2] * warps[2].z,
                );
                output.put(x, y, composite_pixel(interpolated, color, mask, params));
            });
        }

        output.fill_mesh(overlay);
        Ok(())
    }
}

/// Normalized device coordinates (y up) to pixel coordinates (y down)
pub fn ndc_to_pixel(x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
    ((x + 1.0) * 0.5 * width as f32, (1.0 - y) * 0.5 * height as f32)
}

/// Visit every pixel whose centre lies inside the triangle, either winding.
/// The callback receives barycentric weights of the three vertices.
fn rasterize(points: [Vec2; 3], width: u32, height: u32, mut visit: impl FnMut(u32, u32, [f32; 3])) {
    let [a, b, c] = points;
    let area = edge(a, b, c);
    if area == 0.0 || !area.is_finite() {
        return;
    }

    let min = a.min(b).min(c).max(Vec2::ZERO);
    let max = a.max(b).max(c).min(Vec2::new(width as f32, height as f32));
    if min.x >= max.x || min.y >= max.y {
        return;
    }

    let (x0, y0) = (min.x.floor() as u32, min.y.floor() as u32);
    let (x1, y1) = (
        (max.x.ceil() as u32).min(width),
        (max.y.ceil() as u32).min(height),
    );

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b, c, p) / area;
            let w1 = edge(c, a, p) / area;
            let w2 = edge(a, b, p) / area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                visit(x, y, [w0, w1, w2]);
            }
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{mask_mesh, Markers};
    use crate::output::{MaskPolygon, Point2D};
    use crate::scene::{IslandNode, Transform};

    #[test]
    fn test_full_frame_mask_covers_target() {
        let mut renderer = SoftwareRenderer::new(32, 32, 32);
        renderer.render_mask(&mask_mesh(&MaskPolygon::full_frame(), None)).unwrap();
        let mask = renderer.mask_target();
        for (x, y) in [(0, 0), (31, 0), (0, 31), (31, 31), (16, 16)] {
            assert_eq!(mask.pixel(x, y)[0], 1.0, "pixel {},{}", x, y);
        }
    }

    #[test]
    fn test_triangle_mask_leaves_corner_black() {
        let mut renderer = SoftwareRenderer::new(32, 32, 32);
        let mask = MaskPolygon::from_points(vec![
            Point2D::new(-1.0, -1.0),
            Point2D::new(1.0, -1.0),
            Point2D::new(-1.0, 1.0),
        ])
        .unwrap();
        renderer.render_mask(&mask_mesh(&mask, None)).unwrap();
        let target = renderer.mask_target();
        assert_eq!(target.at_ndc(-0.8, -0.8)[0], 1.0);
        assert_eq!(target.at_ndc(0.8, 0.8)[0], 0.0);
    }

    #[test]
    fn test_texture_sampling_uses_bottom_left_origin() {
        let mut target = SoftwareTarget::new(4, 4);
        // Bottom-left pixel is the last row
        target.put(0, 3, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(target.sample([0.1, 0.1])[0], 1.0);
        assert_eq!(target.sample([0.1, 0.9])[0], 0.0);
        assert_eq!(target.at_ndc(-0.9, -0.9)[0], 1.0);
    }

    #[test]
    fn test_identity_surface_copies_colour_target() {
        let mut renderer = SoftwareRenderer::new(16, 16, 16);
        renderer.render_mask(&mask_mesh(&MaskPolygon::full_frame(), None)).unwrap();
        renderer.color_target_mut().put(2, 13, [0.25, 0.5, 0.75, 1.0]);

        let surface = QuadSurface::full_frame().with_default_sources();
        renderer
            .render_surface(&surface, CompositeParams::default(), &SolidMesh::new())
            .unwrap();

        let out = renderer.output().pixel(2, 13);
        assert!((out[0] - 0.25).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.75).abs() < 1e-6);
        assert_eq!(renderer.output().pixel(3, 13)[0], 0.0);
    }

    #[test]
    fn test_shrunk_surface_leaves_clear_colour() {
        let mut renderer = SoftwareRenderer::new(16, 32, 32);
        renderer.set_clear_color([0.0, 0.0, 1.0]);
        renderer.color_target_mut().clear([1.0, 1.0, 1.0, 1.0]);
        renderer.render_mask(&mask_mesh(&MaskPolygon::full_frame(), None)).unwrap();

        let mut surface = QuadSurface::full_frame().with_default_sources();
        for (corner, (dx, dy)) in crate::output::Corner::ALL
            .into_iter()
            .zip([(0.5, 0.5), (-0.5, 0.5), (-0.5, -0.5), (0.5, -0.5)])
        {
            surface.move_corner(corner, dx, dy).unwrap();
        }
        renderer
            .render_surface(&surface, CompositeParams::default(), &SolidMesh::new())
            .unwrap();

        assert_eq!(renderer.output().at_ndc(0.0, 0.0), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(renderer.output().at_ndc(-0.9, 0.9), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_surface_sources_select_sampled_targets() {
        let mut renderer = SoftwareRenderer::new(16, 16, 16);
        renderer.render_mask(&mask_mesh(&MaskPolygon::full_frame(), None)).unwrap();
        renderer.color_target_mut().put(8, 8, [0.25, 0.5, 0.75, 1.0]);

        let render = |renderer: &mut SoftwareRenderer, surface: &QuadSurface| {
            renderer
                .render_surface(surface, CompositeParams::default(), &SolidMesh::new())
                .unwrap();
            renderer.output().pixel(8, 8)
        };

        let bound = render(&mut renderer, &QuadSurface::full_frame().with_default_sources());
        assert_eq!(bound, [0.25, 0.5, 0.75, 1.0]);

        // Red mask as colour, scene as mask: red scaled by 0.25 plus 0.5 overlay
        let mut swapped = QuadSurface::full_frame();
        swapped.set_color_source(TargetId::Mask);
        swapped.set_mask_source(TargetId::SceneColor);
        let out = render(&mut renderer, &swapped);
        assert!((out[0] - 0.75).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.5).abs() < 1e-6);

        let unbound = render(&mut renderer, &QuadSurface::full_frame());
        assert_eq!(&unbound[..3], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_marker_overlay_drawn_on_output() {
        let mut renderer = SoftwareRenderer::new(16, 256, 256);
        let surface = QuadSurface::full_frame();
        let overlay = SolidMesh::quad_marker(Point2D::new(0.0, 0.0));
        renderer
            .render_surface(&surface, CompositeParams::default(), &overlay)
            .unwrap();
        // Ring passes through radius 0.03 but leaves the centre open
        assert_eq!(renderer.output().at_ndc(0.03, 0.0)[0], 1.0);
        assert_eq!(renderer.output().at_ndc(0.0, 0.0)[0], 0.0);
    }

    #[test]
    fn test_mask_marker_adds_green() {
        let mut renderer = SoftwareRenderer::new(256, 16, 16);
        let markers = Markers {
            mask_vertex: Point2D::new(0.0, 0.0),
            quad_corner: Point2D::new(-1.0, -1.0),
        };
        renderer
            .render_mask(&mask_mesh(&MaskPolygon::full_frame(), Some(markers)))
            .unwrap();
        assert_eq!(renderer.mask_target().at_ndc(0.0, 0.0), [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_scene_renders_lit_box() {
        let mut renderer = SoftwareRenderer::new(64, 16, 16);
        let mut scene = SceneDescriptor::default();
        scene.island.push(IslandNode {
            transform: Transform {
                scale: glam::Vec3::new(4.0, 4.0, 1.0),
                ..Default::default()
            },
            color: [1.0, 1.0, 1.0],
            ..Default::default()
        });
        renderer.render_scene(&scene).unwrap();

        // Camera on +z looks at the box top, which faces it
        let centre = renderer.color_target().at_ndc(0.0, 0.0);
        assert!(centre[0] > scene.ambient[0]);
        // Empty space stays black
        assert_eq!(renderer.color_target().at_ndc(-0.95, 0.95), BLACK);
    }
}
