//! Rendering backends
//!
//! [`GpuRenderer`] draws to the window through wgpu. [`SoftwareRenderer`]
//! runs the same passes on the CPU into images, for tests and headless use.

pub mod mesh;
pub mod pipelines;
pub mod renderer;
pub mod software;
pub mod targets;

pub use mesh::{build_scene_mesh, SceneUniforms, SceneVertex};
pub use renderer::{GpuFrame, GpuRenderer};
pub use software::{SoftwareRenderer, SoftwareTarget};
