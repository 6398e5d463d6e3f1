//! Per-frame animation of the background scene

use serde::{Deserialize, Serialize};

use super::descriptor::SceneDescriptor;

/// Light rig angle relative to the camera rig's angular speed
pub const LIGHT_RIG_RATIO: f32 = 0.3471028;

/// Tunable zoom/rotation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoomAnimation {
    pub speed: f32,
    /// Radians per frame the camera rig turns around z
    pub angle_speed: f32,
    pub spawn_distance: f32,
}

impl Default for ZoomAnimation {
    fn default() -> Self {
        Self {
            speed: 0.005,
            angle_speed: 0.001,
            spawn_distance: 0.66,
        }
    }
}

impl ZoomAnimation {
    pub fn scale_speed(&mut self, factor: f32) {
        self.speed *= factor;
    }

    pub fn scale_angle_speed(&mut self, factor: f32) {
        self.angle_speed *= factor;
    }

    pub fn scale_spawn_distance(&mut self, factor: f32) {
        self.spawn_distance *= factor;
    }

    /// Advance the scene by one frame.
    ///
    /// Island nodes with a positive audio trigger take their z scale from the
    /// spectrum bin matching their index (wrapping). An empty spectrum leaves
    /// their scale untouched.
    pub fn animate(&self, scene: &mut SceneDescriptor, spectrum: &[u8]) {
        scene.camera_rig.transform.rotation.z -= self.angle_speed;
        scene.light_rig.transform.rotation.z = self.angle_speed * LIGHT_RIG_RATIO;

        if spectrum.is_empty() {
            return;
        }

        for (i, node) in scene.island.iter_mut().enumerate() {
            if !node.is_audio_reactive() {
                continue;
            }
            let level = spectrum[i % spectrum.len()] as f32 / 255.0;
            node.transform.scale.z = 0.5 + level * node.audio_trigger * 0.5;
        }
    }
}
