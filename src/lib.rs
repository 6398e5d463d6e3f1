//! Immersive Installation Library
//!
//! Audio-reactive projection installation: a background scene rendered into
//! an offscreen target, shown through a perspective-warped quad whose corners
//! and audience mask are edited live from the keyboard.

pub mod app;
pub mod audio;
pub mod compositor;
pub mod edit;
pub mod gpu_context;
pub mod output;
pub mod render;
pub mod scene;
pub mod settings;
pub mod shaders;
pub mod telemetry;

pub use app::Installation;
pub use compositor::{FramePasses, FrameView, RenderBackend, SceneCompositor};
pub use edit::{Command, EditController, EditOutcome, KeyBindings, KeyInput};
pub use gpu_context::{GpuContext, GpuInitError};
pub use output::{Corner, MaskPolygon, Point2D, QuadSurface, WarpError};
pub use render::{GpuRenderer, SoftwareRenderer};
pub use scene::{SceneDescriptor, SceneSlot, ZoomAnimation};
pub use settings::InstallationSettings;
