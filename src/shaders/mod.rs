//! Embedded WGSL sources

/// Warped surface: perspective divide and mask composite
pub const COMPOSITE_SHADER: &str = include_str!("composite.wgsl");

/// Flat-coloured 2D geometry (mask fill, markers)
pub const SOLID_SHADER: &str = include_str!("solid.wgsl");

/// Lit background scene
pub const SCENE_SHADER: &str = include_str!("scene.wgsl");

/// Mip chain downsampling
pub const BLIT_SHADER: &str = include_str!("blit.wgsl");
