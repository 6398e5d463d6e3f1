//! Frame composition
//!
//! Orders the three passes of a frame: the audience mask into its offscreen
//! target (only when it changed), the background scene into the colour
//! target (once loaded), and the warped surface onto the visible output.

use crate::output::marker::{SolidMesh, MASK_FILL};
use crate::output::{CompositeParams, MaskPolygon, Point2D, QuadSurface};
use crate::scene::SceneDescriptor;

/// Something that can execute the three passes of a frame
pub trait RenderBackend {
    type Error;

    /// Clear the mask target and fill `mesh` into it
    fn render_mask(&mut self, mesh: &SolidMesh) -> Result<(), Self::Error>;

    /// Render the background scene into the colour target
    fn render_scene(&mut self, scene: &SceneDescriptor) -> Result<(), Self::Error>;

    /// Draw the warped surface with the composite rule, then `overlay` on top
    fn render_surface(
        &mut self,
        surface: &QuadSurface,
        params: CompositeParams,
        overlay: &SolidMesh,
    ) -> Result<(), Self::Error>;
}

/// Positions of the selection markers, when they are shown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Markers {
    pub mask_vertex: Point2D,
    pub quad_corner: Point2D,
}

/// Everything a frame reads
pub struct FrameView<'a> {
    pub mask: &'a mut MaskPolygon,
    pub surface: &'a QuadSurface,
    pub scene: Option<&'a SceneDescriptor>,
    pub params: CompositeParams,
    pub markers: Option<Markers>,
}

/// Which passes ran for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePasses {
    pub mask: bool,
    pub scene: bool,
    pub surface: bool,
}

/// Running pass counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassTotals {
    pub frames: u64,
    pub mask: u64,
    pub scene: u64,
    pub surface: u64,
}

#[derive(Debug, Default)]
pub struct SceneCompositor {
    totals: PassTotals,
    last: FramePasses,
}

impl SceneCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame against a backend.
    ///
    /// The mask's dirty flag is consumed only once the mask pass succeeded,
    /// so a failed pass is retried next frame.
    pub fn render_frame<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        frame: FrameView<'_>,
    ) -> Result<FramePasses, B::Error> {
        let mut passes = FramePasses::default();

        if frame.mask.is_dirty() {
            let mesh = mask_mesh(frame.mask, frame.markers);
            backend.render_mask(&mesh)?;
            frame.mask.take_dirty();
            passes.mask = true;
        }

        if let Some(scene) = frame.scene {
            backend.render_scene(scene)?;
            passes.scene = true;
        }

        let overlay = match frame.markers {
            Some(markers) => SolidMesh::quad_marker(markers.quad_corner),
            None => SolidMesh::new(),
        };
        backend.render_surface(frame.surface, frame.params, &overlay)?;
        passes.surface = true;

        self.record(passes);
        Ok(passes)
    }

    fn record(&mut self, passes: FramePasses) {
        self.totals.frames += 1;
        self.totals.mask += passes.mask as u64;
        self.totals.scene += passes.scene as u64;
        self.totals.surface += passes.surface as u64;
        self.last = passes;
    }

    pub fn totals(&self) -> PassTotals {
        self.totals
    }

    pub fn last_passes(&self) -> FramePasses {
        self.last
    }
}

/// Mask fill plus the green marker on the selected vertex
pub fn mask_mesh(mask: &MaskPolygon, markers: Option<Markers>) -> SolidMesh {
    let mut mesh = SolidMesh::from_mask(mask, MASK_FILL);
    if let Some(markers) = markers {
        mesh.append(&SolidMesh::mask_marker(markers.mask_vertex));
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneDescriptor;

    #[derive(Default)]
    struct CountingBackend {
        masks: Vec<usize>,
        scenes: usize,
        overlays: Vec<usize>,
        fail_mask: bool,
    }

    impl RenderBackend for CountingBackend {
        type Error = &'static str;

        fn render_mask(&mut self, mesh: &SolidMesh) -> Result<(), Self::Error> {
            if self.fail_mask {
                return Err("mask target lost");
            }
            self.masks.push(mesh.triangle_count());
            Ok(())
        }

        fn render_scene(&mut self, _scene: &SceneDescriptor) -> Result<(), Self::Error> {
            self.scenes += 1;
            Ok(())
        }

        fn render_surface(
            &mut self,
            _surface: &QuadSurface,
            _params: CompositeParams,
            overlay: &SolidMesh,
        ) -> Result<(), Self::Error> {
            self.overlays.push(overlay.triangle_count());
            Ok(())
        }
    }

    fn view<'a>(
        mask: &'a mut MaskPolygon,
        surface: &'a QuadSurface,
        scene: Option<&'a SceneDescriptor>,
    ) -> FrameView<'a> {
        FrameView {
            mask,
            surface,
            scene,
            params: CompositeParams::default(),
            markers: None,
        }
    }

    #[test]
    fn test_mask_renders_once_without_edits() {
        let mut backend = CountingBackend::default();
        let mut compositor = SceneCompositor::new();
        let mut mask = MaskPolygon::full_frame();
        let surface = QuadSurface::full_frame();

        let first = compositor
            .render_frame(&mut backend, view(&mut mask, &surface, None))
            .unwrap();
        let second = compositor
            .render_frame(&mut backend, view(&mut mask, &surface, None))
            .unwrap();

        assert!(first.mask);
        assert!(!second.mask);
        assert_eq!(backend.masks.len(), 1);
        assert_eq!(compositor.totals().surface, 2);
        assert_eq!(compositor.totals().frames, 2);
    }

    #[test]
    fn test_mask_edit_triggers_mask_pass() {
        let mut backend = CountingBackend::default();
        let mut compositor = SceneCompositor::new();
        let mut mask = MaskPolygon::full_frame();
        let surface = QuadSurface::full_frame();

        compositor
            .render_frame(&mut backend, view(&mut mask, &surface, None))
            .unwrap();
        mask.move_point(0, 0.1, 0.0);
        let passes = compositor
            .render_frame(&mut backend, view(&mut mask, &surface, None))
            .unwrap();

        assert!(passes.mask);
        assert_eq!(backend.masks.len(), 2);
    }

    #[test]
    fn test_scene_pass_waits_for_scene() {
        let mut backend = CountingBackend::default();
        let mut compositor = SceneCompositor::new();
        let mut mask = MaskPolygon::full_frame();
        let surface = QuadSurface::full_frame();
        let scene = SceneDescriptor::default();

        let without = compositor
            .render_frame(&mut backend, view(&mut mask, &surface, None))
            .unwrap();
        let with = compositor
            .render_frame(&mut backend, view(&mut mask, &surface, Some(&scene)))
            .unwrap();

        assert!(!without.scene);
        assert!(with.scene);
        assert!(with.surface);
        assert_eq!(backend.scenes, 1);
        assert_eq!(compositor.last_passes(), with);
    }

    #[test]
    fn test_markers_add_geometry() {
        let mut backend = CountingBackend::default();
        let mut compositor = SceneCompositor::new();
        let mut mask = MaskPolygon::full_frame();
        let surface = QuadSurface::full_frame();

        let mut frame = view(&mut mask, &surface, None);
        frame.markers = Some(Markers {
            mask_vertex: Point2D::new(-1.0, -1.0),
            quad_corner: Point2D::new(-1.0, -1.0),
        });
        compositor.render_frame(&mut backend, frame).unwrap();

        // Two fill triangles plus a 16-segment disc; a 16-segment ring
        assert_eq!(backend.masks, vec![2 + 16]);
        assert_eq!(backend.overlays, vec![32]);
    }

    #[test]
    fn test_failed_mask_pass_keeps_dirty_flag() {
        let mut backend = CountingBackend {
            fail_mask: true,
            ..Default::default()
        };
        let mut compositor = SceneCompositor::new();
        let mut mask = MaskPolygon::full_frame();
        let surface = QuadSurface::full_frame();

        let result = compositor.render_frame(&mut backend, view(&mut mask, &surface, None));
        assert!(result.is_err());
        assert!(mask.is_dirty());
        assert_eq!(compositor.totals().frames, 0);
    }
}
