//! Composite rule for the warped surface
//!
//! CPU reference of `shaders/composite.wgsl`. Both must stay in sync: the
//! renderer uses the shader, the software renderer and tests use this.

use bytemuck::{Pod, Zeroable};

use super::warp::WarpVertex;

/// RGBA colour with components in 0.0-1.0
pub type Rgba = [f32; 4];

/// Lowest mask value shown while previewing the masked region
pub const MASKED_PREVIEW_FLOOR: f32 = 0.5;

/// Runtime switches for the composite pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompositeParams {
    /// Dim instead of hide the masked-out region
    pub show_masked: bool,
}

impl CompositeParams {
    pub fn toggle_show_masked(&mut self) {
        self.show_masked = !self.show_masked;
    }

    pub fn to_uniforms(&self) -> CompositeUniforms {
        CompositeUniforms {
            show_masked: self.show_masked as u32,
            _padding: [0; 3],
        }
    }
}

/// Uniform block of the composite shader
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CompositeUniforms {
    pub show_masked: u32,
    pub _padding: [u32; 3],
}

/// Texture lookup used by the CPU composite.
///
/// Coordinates use a bottom-left origin, matching [`WarpVertex::texcoord`].
pub trait TextureSource {
    fn sample(&self, uv: [f32; 2]) -> Rgba;
}

/// Apply the masked preview clamp to a mask sample
pub fn preview_mask(mut mask: Rgba, params: CompositeParams) -> Rgba {
    if params.show_masked {
        mask[0] = mask[0].clamp(MASKED_PREVIEW_FLOOR, 1.0);
    }
    mask
}

/// Combine a colour sample and a mask sample
pub fn composite(color: Rgba, mask: Rgba, params: CompositeParams) -> Rgba {
    let mask = preview_mask(mask, params);
    let key = mask[0];
    let overlay = mask[1];
    [
        color[0] * key + overlay,
        color[1] * key + overlay,
        color[2] * key + overlay,
        color[3] * key,
    ]
}

/// Full per-pixel composite: perspective divide, sample both sources, combine
pub fn composite_pixel(
    warp: WarpVertex,
    color: &impl TextureSource,
    mask: &impl TextureSource,
    params: CompositeParams,
) -> Rgba {
    let uvq = warp.texcoord();
    composite(color.sample(uvq), mask.sample(uvq), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Solid(Rgba);

    impl TextureSource for Solid {
        fn sample(&self, _uv: [f32; 2]) -> Rgba {
            self.0
        }
    }

    /// Red inside the left half, black elsewhere
    struct HalfMask;

    impl TextureSource for HalfMask {
        fn sample(&self, uv: [f32; 2]) -> Rgba {
            if uv[0] < 0.5 {
                [1.0, 0.0, 0.0, 1.0]
            } else {
                [0.0, 0.0, 0.0, 1.0]
            }
        }
    }

    #[test]
    fn test_mask_multiplies_colour() {
        let params = CompositeParams::default();
        let out = composite([0.8, 0.4, 0.2, 1.0], [0.5, 0.0, 0.0, 1.0], params);
        assert_eq!(out, [0.4, 0.2, 0.1, 0.5]);
    }

    #[test]
    fn test_masked_region_is_black_without_preview() {
        let params = CompositeParams::default();
        let out = composite([1.0, 1.0, 1.0, 1.0], [0.0, 0.0, 0.0, 1.0], params);
        assert_eq!(out, [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_preview_clamps_mask() {
        let params = CompositeParams { show_masked: true };
        assert_eq!(preview_mask([0.0, 0.0, 0.0, 1.0], params)[0], 0.5);
        assert_eq!(preview_mask([0.75, 0.0, 0.0, 1.0], params)[0], 0.75);

        let out = composite([1.0, 1.0, 1.0, 1.0], [0.0, 0.0, 0.0, 1.0], params);
        assert_eq!(out, [0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_green_overlay_is_additive() {
        let params = CompositeParams::default();
        let out = composite([0.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0], params);
        assert_eq!(out, [1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_composite_pixel_divides_by_q() {
        let params = CompositeParams::default();
        let color = Solid([1.0, 1.0, 1.0, 1.0]);

        // u = 0.25 after division; inside the red half
        let inside = composite_pixel(WarpVertex::new(0.5, 1.0, 2.0), &color, &HalfMask, params);
        assert_eq!(inside[0], 1.0);

        // u = 0.75 after division; outside
        let outside = composite_pixel(WarpVertex::new(1.5, 1.0, 2.0), &color, &HalfMask, params);
        assert_eq!(outside[0], 0.0);
    }

    #[test]
    fn test_toggle_show_masked() {
        let mut params = CompositeParams::default();
        params.toggle_show_masked();
        assert!(params.show_masked);
        assert_eq!(params.to_uniforms().show_masked, 1);
    }
}
