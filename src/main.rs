//! Immersive Installation
//!
//! Usage: `immersive-installation [settings.xml]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use immersive_installation::edit::{Direction, EditOutcome, KeyInput};
use immersive_installation::render::GpuRenderer;
use immersive_installation::scene::SceneSlot;
use immersive_installation::settings::InstallationSettings;
use immersive_installation::telemetry::{init_logging, LogConfig};
use immersive_installation::{GpuContext, Installation};

/// Application state
enum AppState {
    /// Before the window exists
    Uninitialized { settings: InstallationSettings },
    /// Window and GPU are ready
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        renderer: GpuRenderer,
        installation: Installation,
        title: String,
    },
    /// Startup failed; the loop is exiting
    Failed,
}

struct InstallationApp {
    state: AppState,
    modifiers: ModifiersState,
}

impl InstallationApp {
    fn new(settings: InstallationSettings) -> Self {
        Self {
            state: AppState::Uninitialized { settings },
            modifiers: ModifiersState::empty(),
        }
    }

    fn start(
        event_loop: &ActiveEventLoop,
        settings: InstallationSettings,
    ) -> anyhow::Result<AppState> {
        let window_attributes = WindowAttributes::default()
            .with_title(immersive_installation::app::APP_NAME)
            .with_inner_size(LogicalSize::new(settings.window_width, settings.window_height))
            .with_fullscreen(settings.fullscreen.then_some(Fullscreen::Borderless(None)));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );
        tracing::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let gpu = pollster::block_on(GpuContext::new(window.clone()))
            .context("failed to initialize GPU")?;

        let mut renderer = GpuRenderer::new(&gpu, settings.buffer_size);
        renderer.set_clear_color(settings.clear_rgb());

        let installation = Installation::from_settings(settings);
        window.request_redraw();

        Ok(AppState::Running {
            window,
            gpu,
            renderer,
            installation,
            title: String::new(),
        })
    }
}

impl ApplicationHandler for InstallationApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, AppState::Uninitialized { .. }) {
            return;
        }
        let AppState::Uninitialized { settings } = std::mem::replace(&mut self.state, AppState::Failed)
        else {
            return;
        };

        match Self::start(event_loop, settings) {
            Ok(state) => self.state = state,
            Err(e) => {
                tracing::error!("Startup failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let AppState::Running {
            window,
            gpu,
            renderer,
            installation,
            title,
        } = &mut self.state
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, shutting down");
                installation.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.resize(new_size.width, new_size.height);
                window.request_redraw();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if logical_key == Key::Named(NamedKey::Escape) {
                    installation.shutdown();
                    event_loop.exit();
                    return;
                }
                let Some(key) = map_key(&logical_key) else {
                    return;
                };
                if let Some(EditOutcome::Faulted(e)) =
                    installation.handle_key(key, self.modifiers.shift_key())
                {
                    tracing::debug!("Edit left the quad degenerate: {}", e);
                }
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                installation.update();

                match renderer.begin_frame(gpu) {
                    Ok(mut frame) => {
                        match installation.render_with(&mut frame) {
                            Ok(_) => {}
                            Err(never) => match never {},
                        }
                        frame.present();
                    }
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        tracing::warn!("Surface lost, reconfiguring...");
                        gpu.reconfigure();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("Out of GPU memory!");
                        installation.shutdown();
                        event_loop.exit();
                        return;
                    }
                    Err(e) => {
                        tracing::warn!("Surface error: {:?}", e);
                    }
                }

                let next_title = installation.title();
                if *title != next_title {
                    window.set_title(&next_title);
                    *title = next_title;
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Running {
            window,
            installation,
            ..
        } = &self.state
        else {
            return;
        };

        let loading = matches!(installation.scene(), SceneSlot::Loading(_));
        if installation.wants_continuous_redraw() || loading {
            event_loop.set_control_flow(ControlFlow::Poll);
            window.request_redraw();
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}

/// Window-system key to installation key
fn map_key(key: &Key) -> Option<KeyInput> {
    match key {
        Key::Named(NamedKey::Space) => Some(KeyInput::Space),
        Key::Named(NamedKey::PageUp) => Some(KeyInput::PageUp),
        Key::Named(NamedKey::PageDown) => Some(KeyInput::PageDown),
        Key::Named(NamedKey::ArrowUp) => Some(KeyInput::Arrow(Direction::Up)),
        Key::Named(NamedKey::ArrowDown) => Some(KeyInput::Arrow(Direction::Down)),
        Key::Named(NamedKey::ArrowLeft) => Some(KeyInput::Arrow(Direction::Left)),
        Key::Named(NamedKey::ArrowRight) => Some(KeyInput::Arrow(Direction::Right)),
        Key::Character(text) => text.chars().next().map(KeyInput::Char),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    let settings_arg = std::env::args().nth(1).map(PathBuf::from);
    let (settings, origin) = InstallationSettings::load(settings_arg.as_deref());

    // Keep the guard alive for the program duration
    let log_config = LogConfig::with_file(settings.log_file.as_ref().map(PathBuf::from));
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("Immersive Installation v{}", env!("CARGO_PKG_VERSION"));
    origin.log();

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = InstallationApp::new(settings);
    event_loop.run_app(&mut app).context("event loop error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}
