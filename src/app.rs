//! Installation state
//!
//! Ties the edit controller, the scene slot, the audio monitor and the frame
//! compositor together. Window-system code feeds it keys and asks it for
//! frames; everything here is backend independent.

use std::path::PathBuf;

use crate::audio::AudioMonitor;
use crate::compositor::{FramePasses, RenderBackend, SceneCompositor};
use crate::edit::{Command, EditController, EditOutcome, KeyBindings, KeyInput};
use crate::scene::SceneSlot;
use crate::settings::InstallationSettings;
use crate::telemetry::FrameProfiler;

/// Window title prefix
pub const APP_NAME: &str = "Immersive Installation";

pub struct Installation {
    settings: InstallationSettings,
    controller: EditController,
    scene: SceneSlot,
    audio: AudioMonitor,
    compositor: SceneCompositor,
    profiler: FrameProfiler,
    keys: KeyBindings,
}

impl Installation {
    /// Build from settings with an explicit audio monitor
    pub fn new(settings: InstallationSettings, audio: AudioMonitor) -> Self {
        let scene = match &settings.scene_path {
            Some(path) => SceneSlot::load(PathBuf::from(path)),
            None => {
                tracing::info!("No scene configured, rendering quad and mask only");
                SceneSlot::default()
            }
        };

        Self {
            controller: EditController::from_settings(&settings),
            scene,
            audio,
            compositor: SceneCompositor::new(),
            profiler: FrameProfiler::new(),
            keys: KeyBindings::default(),
            settings,
        }
    }

    /// Build from settings, opening the configured audio input when enabled
    pub fn from_settings(settings: InstallationSettings) -> Self {
        let config = settings.analyser_config();
        let audio = if settings.audio_enabled {
            AudioMonitor::open_system(settings.audio_device.as_deref(), config)
        } else {
            tracing::info!("Audio input disabled");
            AudioMonitor::silent(config)
        };
        Self::new(settings, audio)
    }

    /// Translate a key press into a command and apply it.
    ///
    /// Returns None when the key is unbound.
    pub fn handle_key(&mut self, key: KeyInput, shift: bool) -> Option<EditOutcome> {
        let command = self.keys.lookup(key, shift)?;
        let outcome = self.controller.apply(command);
        if command == Command::TogglePause {
            // Frame intervals across a pause would skew the stats
            self.profiler.reset();
        }
        tracing::debug!(?command, ?outcome, "Key {:?}", key);
        Some(outcome)
    }

    /// Per-frame update: finish scene loading, then analyse audio and animate
    /// unless paused. Returns true when the scene just became available.
    pub fn update(&mut self) -> bool {
        let scene_changed = self.scene.poll();
        if self.controller.is_paused() {
            return scene_changed;
        }

        let spectrum = self.audio.update();
        if let Some(scene) = self.scene.scene_mut() {
            self.controller.animation().animate(scene, spectrum);
        }
        scene_changed
    }

    /// Render one frame: mask if it changed, scene if loaded, then the surface
    pub fn render_with<B: RenderBackend>(&mut self, backend: &mut B) -> Result<FramePasses, B::Error> {
        self.profiler.begin_frame();
        let view = self.controller.frame_view(self.scene.scene());
        self.compositor.render_frame(backend, view)
    }

    /// Window title, with the state overlay while info is shown
    pub fn title(&self) -> String {
        if !self.controller.flags().show_info {
            return APP_NAME.to_string();
        }
        let stats = self.profiler.stats();
        format!(
            "{} | {} | scene: {} | audio: {} | {:.0} fps ({:.1} ms p95)",
            APP_NAME,
            self.controller.describe(),
            self.scene.status(),
            self.audio.source_name().unwrap_or_else(|| "silent".to_string()),
            self.profiler.fps(),
            stats.p95_ms,
        )
    }

    /// Whether frames should be requested continuously
    pub fn wants_continuous_redraw(&self) -> bool {
        !self.controller.is_paused()
    }

    pub fn settings(&self) -> &InstallationSettings {
        &self.settings
    }

    pub fn controller(&self) -> &EditController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut EditController {
        &mut self.controller
    }

    pub fn scene(&self) -> &SceneSlot {
        &self.scene
    }

    pub fn audio(&self) -> &AudioMonitor {
        &self.audio
    }

    pub fn compositor(&self) -> &SceneCompositor {
        &self.compositor
    }

    pub fn profiler(&self) -> &FrameProfiler {
        &self.profiler
    }

    pub fn key_bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.keys
    }

    /// Stop audio capture
    pub fn shutdown(&mut self) {
        self.audio.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AnalyserConfig, BufferedAudioSource};
    use crate::edit::Direction;
    use crate::render::SoftwareRenderer;
    use crate::scene::{IslandNode, SceneDescriptor};

    fn installation() -> Installation {
        Installation::new(
            InstallationSettings::default(),
            AudioMonitor::silent(AnalyserConfig::default()),
        )
    }

    fn press(app: &mut Installation, c: char) -> Option<EditOutcome> {
        app.handle_key(KeyInput::Char(c), c.is_uppercase())
    }

    fn arrow(app: &mut Installation, direction: Direction, shift: bool) -> Option<EditOutcome> {
        app.handle_key(KeyInput::Arrow(direction), shift)
    }

    #[test]
    fn test_unbound_key_is_none() {
        let mut app = installation();
        assert_eq!(press(&mut app, 'k'), None);
    }

    #[test]
    fn test_first_frame_renders_mask_then_only_surface() {
        let mut app = installation();
        let mut renderer = SoftwareRenderer::new(16, 16, 16);

        let first = app.render_with(&mut renderer).unwrap();
        assert!(first.mask);
        assert!(!first.scene);
        assert!(first.surface);

        let second = app.render_with(&mut renderer).unwrap();
        assert!(!second.mask);
        assert!(second.surface);
        assert_eq!(app.compositor().totals().frames, 2);
    }

    #[test]
    fn test_notched_mask_end_to_end() {
        let mut app = installation();
        let mut renderer = SoftwareRenderer::new(64, 64, 64);
        renderer.color_target_mut().clear([1.0, 1.0, 1.0, 1.0]);

        assert_eq!(press(&mut app, 'm'), Some(EditOutcome::Applied));
        assert_eq!(press(&mut app, 'i'), Some(EditOutcome::Applied));
        assert_eq!(app.controller().mask().len(), 5);
        assert_eq!(app.controller().cursor().mask_vertex, 1);

        arrow(&mut app, Direction::Right, true);
        for _ in 0..3 {
            arrow(&mut app, Direction::Up, true);
        }
        let vertex = app.controller().mask().point(1).unwrap();
        assert!((vertex.x - 0.1).abs() < 1e-4);
        assert!((vertex.y + 0.7).abs() < 1e-4);

        let passes = app.render_with(&mut renderer).unwrap();
        assert!(passes.mask);

        // Inside the notch between the dragged vertex and the bottom edge
        let notch = renderer.output().pixel(35, 60);
        assert_eq!(notch[0], 0.0);
        assert_eq!(renderer.output().at_ndc(0.0, 0.0)[0], 1.0);

        // Preview dims the notch instead of hiding it, without a mask pass
        press(&mut app, 'o');
        let passes = app.render_with(&mut renderer).unwrap();
        assert!(!passes.mask);
        assert_eq!(renderer.output().pixel(35, 60)[0], 0.5);
        assert_eq!(renderer.output().at_ndc(0.0, 0.0)[0], 1.0);
    }

    #[test]
    fn test_mask_commands_ignored_in_normal_mode() {
        let mut app = installation();
        assert_eq!(press(&mut app, 'i'), Some(EditOutcome::Ignored));
        assert_eq!(press(&mut app, 'r'), Some(EditOutcome::Ignored));
        assert_eq!(app.controller().mask().len(), 4);
    }

    #[test]
    fn test_pause_freezes_animation() {
        let mut app = installation();
        let mut scene = SceneDescriptor::default();
        scene.island.push(IslandNode::default());
        app.scene = SceneSlot::Ready(Box::new(scene));

        app.update();
        let moved = app.scene().scene().map(|s| s.camera_rig.transform.rotation.z);
        assert!(moved.is_some_and(|z| z < 0.0));

        app.handle_key(KeyInput::Space, false);
        assert!(!app.wants_continuous_redraw());
        app.update();
        let frozen = app.scene().scene().map(|s| s.camera_rig.transform.rotation.z);
        assert_eq!(moved, frozen);
    }

    #[test]
    fn test_audio_drives_spectrum() {
        let source = BufferedAudioSource::new("test", 256, 48000, 1);
        let state = source.state();
        let samples: Vec<f32> = (0..64)
            .map(|i| (2.0 * std::f32::consts::PI * 4.0 * i as f32 / 64.0).sin())
            .collect();
        state.push(&samples);

        let config = AnalyserConfig::default();
        let mut app = Installation::new(
            InstallationSettings::default(),
            AudioMonitor::with_source(Box::new(source), config),
        );
        app.update();
        assert!(app.audio().spectrum().iter().any(|&b| b > 0));
    }

    #[test]
    fn test_title_reflects_info_toggle() {
        let mut app = installation();
        assert!(app.title().contains("corner bottom-left"));
        assert!(app.title().contains("no scene"));

        press(&mut app, '?');
        assert_eq!(app.title(), APP_NAME);
    }
}
