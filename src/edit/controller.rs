//! Command state machine over the quad corners and mask vertices

use crate::compositor::{FrameView, Markers};
use crate::output::{CompositeParams, Corner, MaskPolygon, Point2D, QuadSurface, WarpError};
use crate::scene::{SceneDescriptor, ZoomAnimation};
use crate::settings::InstallationSettings;

use super::command::{Command, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Arrows and selection act on the quad corners
    #[default]
    Normal,
    /// Arrows, selection, insert and remove act on the mask vertices
    MaskEdit,
}

/// Two independent selections; the mode picks the live one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditCursor {
    pub mode: EditMode,
    pub corner: usize,
    pub mask_vertex: usize,
}

impl EditCursor {
    pub fn is_mask_edit(&self) -> bool {
        self.mode == EditMode::MaskEdit
    }

    pub fn live_index(&self) -> usize {
        match self.mode {
            EditMode::Normal => self.corner,
            EditMode::MaskEdit => self.mask_vertex,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NudgeSteps {
    pub fine: f32,
    pub coarse: f32,
}

impl Default for NudgeSteps {
    fn default() -> Self {
        Self {
            fine: 0.001,
            coarse: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewFlags {
    pub show_info: bool,
    pub paused: bool,
    pub show_markers: bool,
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self {
            show_info: true,
            paused: false,
            show_markers: true,
        }
    }
}

/// Result of one command. Every outcome still gets a redraw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditOutcome {
    Applied,
    /// Not applicable in the current mode, or refused (mask vertex floor)
    Ignored,
    /// The corner moved but the quad is degenerate; the last warp is kept
    Faulted(WarpError),
}

pub struct EditController {
    surface: QuadSurface,
    mask: MaskPolygon,
    cursor: EditCursor,
    params: CompositeParams,
    animation: ZoomAnimation,
    flags: ViewFlags,
    nudge: NudgeSteps,
}

impl Default for EditController {
    fn default() -> Self {
        Self::new(QuadSurface::full_frame(), MaskPolygon::full_frame())
    }
}

impl EditController {
    /// Unbound surface sources are bound to the scene colour and mask targets
    pub fn new(surface: QuadSurface, mask: MaskPolygon) -> Self {
        Self {
            surface: surface.with_default_sources(),
            mask,
            cursor: EditCursor::default(),
            params: CompositeParams::default(),
            animation: ZoomAnimation::default(),
            flags: ViewFlags::default(),
            nudge: NudgeSteps::default(),
        }
    }

    pub fn from_settings(settings: &InstallationSettings) -> Self {
        let mut controller = Self::default();
        controller.params = settings.composite_params();
        controller.animation = settings.zoom_animation();
        controller.flags.show_markers = settings.show_markers;
        controller.flags.show_info = settings.show_info;
        controller.nudge = NudgeSteps {
            fine: settings.nudge_step,
            coarse: settings.coarse_nudge_step,
        };
        controller
    }

    pub fn apply(&mut self, command: Command) -> EditOutcome {
        if command.requires_mask_mode() && !self.cursor.is_mask_edit() {
            tracing::debug!("{:?} ignored outside mask mode", command);
            return EditOutcome::Ignored;
        }

        let outcome = match command {
            Command::ToggleInfo => {
                self.flags.show_info = !self.flags.show_info;
                EditOutcome::Applied
            }
            Command::TogglePause => {
                self.flags.paused = !self.flags.paused;
                tracing::info!(paused = self.flags.paused, "Animation pause toggled");
                EditOutcome::Applied
            }
            Command::ToggleMaskMode => {
                self.cursor.mode = match self.cursor.mode {
                    EditMode::Normal => EditMode::MaskEdit,
                    EditMode::MaskEdit => EditMode::Normal,
                };
                self.mask.mark_dirty();
                EditOutcome::Applied
            }
            Command::ToggleMarkers => {
                self.flags.show_markers = !self.flags.show_markers;
                self.mask.mark_dirty();
                EditOutcome::Applied
            }
            Command::ToggleMaskedPreview => {
                self.params.toggle_show_masked();
                EditOutcome::Applied
            }
            Command::AnimationSpeed(step) => {
                self.animation.scale_speed(step.factor());
                EditOutcome::Applied
            }
            Command::RotationSpeed(step) => {
                self.animation.scale_angle_speed(step.factor());
                EditOutcome::Applied
            }
            Command::SpawnDistance(step) => {
                self.animation.scale_spawn_distance(step.factor());
                EditOutcome::Applied
            }
            Command::InsertAfter => {
                self.cursor.mask_vertex = self.mask.insert_midpoint_after(self.cursor.mask_vertex);
                EditOutcome::Applied
            }
            Command::InsertBefore => {
                self.cursor.mask_vertex = self.mask.insert_midpoint_before(self.cursor.mask_vertex);
                EditOutcome::Applied
            }
            Command::RemovePoint => match self.mask.remove(self.cursor.mask_vertex) {
                Some(_) => {
                    self.cursor.mask_vertex %= self.mask.len();
                    EditOutcome::Applied
                }
                None => {
                    tracing::debug!(
                        "Mask vertex removal refused at {} vertices",
                        self.mask.len()
                    );
                    EditOutcome::Ignored
                }
            },
            Command::NextPoint => {
                self.step_selection(1);
                EditOutcome::Applied
            }
            Command::PrevPoint => {
                self.step_selection(-1);
                EditOutcome::Applied
            }
            Command::Nudge { direction, coarse } => self.nudge(direction, coarse),
        };

        self.clamp_selection();
        outcome
    }

    fn step_selection(&mut self, delta: isize) {
        let (index, len) = match self.cursor.mode {
            EditMode::Normal => (&mut self.cursor.corner, Corner::ALL.len()),
            EditMode::MaskEdit => (&mut self.cursor.mask_vertex, self.mask.len()),
        };
        *index = (*index as isize + delta).rem_euclid(len as isize) as usize;

        if self.cursor.is_mask_edit() {
            self.mask.mark_dirty();
        }
    }

    fn nudge(&mut self, direction: Direction, coarse: bool) -> EditOutcome {
        let step = if coarse { self.nudge.coarse } else { self.nudge.fine };
        let (ux, uy) = direction.offset();
        let (dx, dy) = (ux * step, uy * step);

        match self.cursor.mode {
            EditMode::MaskEdit => {
                if self.mask.move_point(self.cursor.mask_vertex, dx, dy) {
                    EditOutcome::Applied
                } else {
                    EditOutcome::Ignored
                }
            }
            EditMode::Normal => {
                let Some(corner) = Corner::from_index(self.cursor.corner) else {
                    return EditOutcome::Ignored;
                };
                match self.surface.move_corner(corner, dx, dy) {
                    Ok(()) => EditOutcome::Applied,
                    Err(e) => {
                        tracing::warn!("Quad {} is degenerate, keeping last warp: {}", corner.name(), e);
                        EditOutcome::Faulted(e)
                    }
                }
            }
        }
    }

    fn clamp_selection(&mut self) {
        self.cursor.corner %= Corner::ALL.len();
        if !self.mask.is_empty() {
            self.cursor.mask_vertex %= self.mask.len();
        }
    }

    pub fn surface(&self) -> &QuadSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut QuadSurface {
        &mut self.surface
    }

    pub fn mask(&self) -> &MaskPolygon {
        &self.mask
    }

    pub fn mask_mut(&mut self) -> &mut MaskPolygon {
        &mut self.mask
    }

    pub fn cursor(&self) -> &EditCursor {
        &self.cursor
    }

    pub fn params(&self) -> CompositeParams {
        self.params
    }

    pub fn animation(&self) -> &ZoomAnimation {
        &self.animation
    }

    pub fn flags(&self) -> &ViewFlags {
        &self.flags
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused
    }

    /// Selected quad corner
    pub fn selected_corner(&self) -> Point2D {
        self.surface.corners()[self.cursor.corner % Corner::ALL.len()]
    }

    /// Selected mask vertex
    pub fn selected_mask_vertex(&self) -> Option<Point2D> {
        self.mask.point(self.cursor.mask_vertex)
    }

    /// Marker positions, or None while markers are hidden
    pub fn markers(&self) -> Option<Markers> {
        if !self.flags.show_markers {
            return None;
        }
        Some(Markers {
            mask_vertex: self.selected_mask_vertex()?,
            quad_corner: self.selected_corner(),
        })
    }

    /// Borrow what the compositor needs for one frame
    pub fn frame_view<'a>(&'a mut self, scene: Option<&'a SceneDescriptor>) -> FrameView<'a> {
        let markers = self.markers();
        FrameView {
            mask: &mut self.mask,
            surface: &self.surface,
            scene,
            params: self.params,
            markers,
        }
    }

    /// One-line state summary for the info overlay
    pub fn describe(&self) -> String {
        let selection = match self.cursor.mode {
            EditMode::Normal => format!(
                "corner {}",
                Corner::from_index(self.cursor.corner)
                    .map(|c| c.name())
                    .unwrap_or("?")
            ),
            EditMode::MaskEdit => {
                format!("mask {}/{}", self.cursor.mask_vertex + 1, self.mask.len())
            }
        };
        let fault = if self.surface.warp_fault().is_some() {
            " | DEGENERATE"
        } else {
            ""
        };
        format!(
            "{}{} | speed {:.4} | angle {:.4} | spawn {:.3}{}{}",
            selection,
            fault,
            self.animation.speed,
            self.animation.angle_speed,
            self.animation.spawn_distance,
            if self.params.show_masked { " | preview" } else { "" },
            if self.flags.paused { " | paused" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::command::Step;
    use crate::output::TargetId;

    fn nudge(direction: Direction, coarse: bool) -> Command {
        Command::Nudge { direction, coarse }
    }

    fn mask_mode() -> EditController {
        let mut controller = EditController::default();
        controller.apply(Command::ToggleMaskMode);
        controller
    }

    #[test]
    fn test_surface_sources_bound_on_construction() {
        let controller = EditController::default();
        assert_eq!(controller.surface().color_source(), Some(TargetId::SceneColor));
        assert_eq!(controller.surface().mask_source(), Some(TargetId::Mask));
    }

    #[test]
    fn test_mode_toggle() {
        let mut controller = EditController::default();
        assert_eq!(controller.cursor().mode, EditMode::Normal);
        controller.apply(Command::ToggleMaskMode);
        assert!(controller.cursor().is_mask_edit());
        controller.apply(Command::ToggleMaskMode);
        assert!(!controller.cursor().is_mask_edit());
    }

    #[test]
    fn test_insert_after_lands_on_midpoint() {
        let mut controller = mask_mode();
        assert_eq!(controller.apply(Command::InsertAfter), EditOutcome::Applied);

        assert_eq!(controller.mask().len(), 5);
        assert_eq!(controller.cursor().mask_vertex, 1);
        assert_eq!(controller.selected_mask_vertex(), Some(Point2D::new(0.0, -1.0)));
    }

    #[test]
    fn test_insert_before_lands_on_midpoint() {
        let mut controller = mask_mode();
        controller.apply(Command::InsertBefore);

        assert_eq!(controller.mask().len(), 5);
        // Between the last vertex (-1, 1) and the first (-1, -1)
        let selected = controller.selected_mask_vertex().unwrap();
        assert_eq!(selected, Point2D::new(-1.0, 0.0));
        let next = controller.mask().successor(controller.cursor().mask_vertex);
        assert_eq!(controller.mask().point(next), Some(Point2D::new(-1.0, -1.0)));
    }

    #[test]
    fn test_mask_commands_ignored_in_normal_mode() {
        let mut controller = EditController::default();
        assert_eq!(controller.apply(Command::InsertAfter), EditOutcome::Ignored);
        assert_eq!(controller.apply(Command::RemovePoint), EditOutcome::Ignored);
        assert_eq!(controller.mask().len(), 4);
    }

    #[test]
    fn test_remove_respects_floor() {
        let mut controller = mask_mode();
        assert_eq!(controller.apply(Command::RemovePoint), EditOutcome::Applied);
        assert_eq!(controller.mask().len(), 3);
        assert_eq!(controller.apply(Command::RemovePoint), EditOutcome::Ignored);
        assert_eq!(controller.mask().len(), 3);
    }

    #[test]
    fn test_remove_last_vertex_wraps_selection() {
        let mut controller = mask_mode();
        controller.apply(Command::PrevPoint);
        assert_eq!(controller.cursor().mask_vertex, 3);
        controller.apply(Command::RemovePoint);
        assert_eq!(controller.cursor().mask_vertex, 0);
    }

    #[test]
    fn test_selection_stays_in_range() {
        let mut controller = mask_mode();
        let sequence = [
            Command::PrevPoint,
            Command::InsertAfter,
            Command::NextPoint,
            Command::RemovePoint,
            Command::RemovePoint,
            Command::PrevPoint,
            Command::InsertBefore,
            Command::NextPoint,
            Command::NextPoint,
            Command::RemovePoint,
            Command::ToggleMaskMode,
            Command::PrevPoint,
            Command::PrevPoint,
            Command::NextPoint,
        ];
        for command in sequence {
            controller.apply(command);
            assert!(controller.cursor().mask_vertex < controller.mask().len());
            assert!(controller.cursor().corner < 4);
        }
    }

    #[test]
    fn test_corner_selection_wraps_by_four() {
        let mut controller = mask_mode();
        for _ in 0..3 {
            controller.apply(Command::InsertAfter);
        }
        controller.apply(Command::ToggleMaskMode);

        for _ in 0..5 {
            controller.apply(Command::NextPoint);
        }
        assert_eq!(controller.cursor().corner, 1);
        controller.apply(Command::PrevPoint);
        controller.apply(Command::PrevPoint);
        assert_eq!(controller.cursor().corner, 3);
    }

    #[test]
    fn test_nudge_moves_live_point() {
        let mut controller = EditController::default();
        controller.apply(nudge(Direction::Right, true));
        assert!((controller.surface().corner(Corner::BottomLeft).x + 0.9).abs() < 1e-6);

        controller.apply(Command::ToggleMaskMode);
        controller.mask_mut().take_dirty();
        controller.apply(nudge(Direction::Up, false));
        let vertex = controller.selected_mask_vertex().unwrap();
        assert!((vertex.y + 0.999).abs() < 1e-6);
        assert!(controller.mask().is_dirty());
        // Quad untouched by mask edits
        assert!((controller.surface().corner(Corner::BottomLeft).y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_nudge_reports_fault() {
        let mut controller = EditController::default();
        // Drag the bottom-left corner past the top-right one
        let mut outcome = EditOutcome::Applied;
        for _ in 0..25 {
            outcome = controller.apply(nudge(Direction::Right, true));
            outcome = match outcome {
                EditOutcome::Faulted(_) => outcome,
                _ => controller.apply(nudge(Direction::Up, true)),
            };
            if matches!(outcome, EditOutcome::Faulted(_)) {
                break;
            }
        }
        assert!(matches!(outcome, EditOutcome::Faulted(_)));
        assert!(controller.surface().warp_fault().is_some());
        assert!(controller
            .surface()
            .warp()
            .iter()
            .all(|w| w.x.is_finite() && w.y.is_finite() && w.z.is_finite()));
        assert!(controller.describe().contains("DEGENERATE"));
    }

    #[test]
    fn test_parameter_commands() {
        let mut controller = EditController::default();
        controller.apply(Command::AnimationSpeed(Step::UpFast));
        controller.apply(Command::RotationSpeed(Step::DownFast));
        controller.apply(Command::SpawnDistance(Step::Up));
        assert_eq!(controller.animation().speed, 0.01);
        assert_eq!(controller.animation().angle_speed, 0.0005);
        assert!((controller.animation().spawn_distance - 0.825).abs() < 1e-6);

        controller.apply(Command::TogglePause);
        assert!(controller.is_paused());
        controller.apply(Command::ToggleInfo);
        assert!(!controller.flags().show_info);
    }

    #[test]
    fn test_markers_toggle_and_dirty() {
        let mut controller = EditController::default();
        assert!(controller.markers().is_some());

        controller.mask_mut().take_dirty();
        controller.apply(Command::ToggleMarkers);
        assert!(controller.markers().is_none());
        assert!(controller.mask().is_dirty());
    }

    #[test]
    fn test_frame_view_reflects_state() {
        let mut controller = EditController::default();
        controller.apply(Command::ToggleMaskedPreview);
        controller.apply(Command::NextPoint);

        let view = controller.frame_view(None);
        assert!(view.params.show_masked);
        assert_eq!(
            view.markers.map(|m| m.quad_corner),
            Some(Point2D::new(1.0, -1.0))
        );
    }
}
