//! Background scene: description, loading and animation

pub mod animation;
pub mod descriptor;
pub mod loader;

pub use animation::ZoomAnimation;
pub use descriptor::{CameraRig, IslandNode, LightRig, SceneDescriptor, Transform};
pub use loader::{load_scene, SceneError, SceneLoader, SceneSlot};
