//! Projection output: the warped quad, the audience mask and how they combine

pub mod composite;
pub mod marker;
pub mod mask;
pub mod surface;
pub mod warp;

pub use composite::{composite, composite_pixel, CompositeParams, CompositeUniforms, Rgba, TextureSource};
pub use marker::{SolidMesh, SolidVertex};
pub use mask::{MaskPolygon, Point2D};
pub use surface::{Corner, QuadSurface, SurfaceVertex, TargetId};
pub use warp::{compute_warp, WarpBuffer, WarpError, WarpVertex};
