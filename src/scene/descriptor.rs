//! Typed scene description loaded from JSON

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Ambient light of 0x101010
pub const DEFAULT_AMBIENT: [f32; 3] = [16.0 / 255.0, 16.0 / 255.0, 16.0 / 255.0];

/// Position, Euler rotation (radians, XYZ order) and scale of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraNode {
    pub transform: Transform,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraNode {
    fn default() -> Self {
        Self {
            transform: Transform::at(Vec3::new(0.0, 0.0, 10.0)),
            fov_degrees: 45.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

/// Camera parented to a rig that the animation spins around z
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraRig {
    pub transform: Transform,
    pub camera: CameraNode,
}

impl CameraRig {
    /// World transform of the camera
    pub fn camera_world(&self) -> Mat4 {
        self.transform.matrix() * self.camera.transform.matrix()
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        let view = self.camera_world().inverse();
        let projection = Mat4::perspective_rh(
            self.camera.fov_degrees.to_radians(),
            aspect,
            self.camera.near,
            self.camera.far,
        );
        projection * view
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LampNode {
    pub transform: Transform,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for LampNode {
    fn default() -> Self {
        Self {
            transform: Transform::at(Vec3::new(5.0, 5.0, 10.0)),
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRig {
    pub transform: Transform,
    pub lamp: LampNode,
}

impl LightRig {
    pub fn lamp_position(&self) -> Vec3 {
        (self.transform.matrix() * self.lamp.transform.matrix()).transform_point3(Vec3::ZERO)
    }

    /// Unit direction the light travels, from the lamp towards the origin
    pub fn light_direction(&self) -> Vec3 {
        let towards_origin = -self.lamp_position();
        towards_origin.try_normalize().unwrap_or(Vec3::NEG_Z)
    }
}

/// One box of the island; `audio_trigger > 0` lets the spectrum scale it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandNode {
    pub name: String,
    pub transform: Transform,
    pub color: [f32; 3],
    pub audio_trigger: f32,
}

impl Default for IslandNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::default(),
            color: [0.8, 0.8, 0.8],
            audio_trigger: 0.0,
        }
    }
}

impl IslandNode {
    pub fn is_audio_reactive(&self) -> bool {
        self.audio_trigger > 0.0
    }
}

/// Background scene rendered into the colour target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescriptor {
    pub camera_rig: CameraRig,
    pub light_rig: LightRig,
    pub island: Vec<IslandNode>,
    pub ambient: [f32; 3],
}

impl Default for SceneDescriptor {
    fn default() -> Self {
        Self {
            camera_rig: CameraRig::default(),
            light_rig: LightRig::default(),
            island: Vec::new(),
            ambient: DEFAULT_AMBIENT,
        }
    }
}

impl SceneDescriptor {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn audio_reactive_count(&self) -> usize {
        self.island.iter().filter(|n| n.is_audio_reactive()).count()
    }
}
