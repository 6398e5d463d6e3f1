//! Scene geometry: island nodes as boxes in world space

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec3};

use crate::scene::SceneDescriptor;

/// Vertex of the background scene, already in world space
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl SceneVertex {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Uniform block for the scene shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Direction the light travels (w unused)
    pub light_dir: [f32; 4],
    /// Lamp colour times intensity (w unused)
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
}

impl SceneUniforms {
    pub fn new(scene: &SceneDescriptor, aspect: f32) -> Self {
        let lamp = &scene.light_rig.lamp;
        let light = Vec3::from(lamp.color) * lamp.intensity;
        Self {
            view_proj: scene.camera_rig.view_projection(aspect).to_cols_array_2d(),
            light_dir: scene.light_rig.light_direction().extend(0.0).to_array(),
            light_color: light.extend(0.0).to_array(),
            ambient: Vec3::from(scene.ambient).extend(1.0).to_array(),
        }
    }

    /// Lit colour of a surface, matching `scene.wgsl`
    pub fn shade(&self, normal: Vec3, color: Vec3) -> Vec3 {
        let light_dir = Vec3::from_slice(&self.light_dir[..3]);
        let light = Vec3::from_slice(&self.light_color[..3]);
        let ambient = Vec3::from_slice(&self.ambient[..3]);
        let diffuse = normal.normalize_or_zero().dot(-light_dir).max(0.0);
        (color * (ambient + light * diffuse)).min(Vec3::ONE)
    }
}

/// Unit box faces: outward normal and four corners, counter-clockwise seen
/// from outside. The box spans -0.5..0.5 in x and y and 0..1 in z so a z
/// scale grows it upwards from its base.
const BOX_FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    ([0.0, 0.0, 1.0], [[-0.5, -0.5, 1.0], [0.5, -0.5, 1.0], [0.5, 0.5, 1.0], [-0.5, 0.5, 1.0]]),
    ([0.0, 0.0, -1.0], [[-0.5, 0.5, 0.0], [0.5, 0.5, 0.0], [0.5, -0.5, 0.0], [-0.5, -0.5, 0.0]]),
    ([1.0, 0.0, 0.0], [[0.5, -0.5, 0.0], [0.5, 0.5, 0.0], [0.5, 0.5, 1.0], [0.5, -0.5, 1.0]]),
    ([-1.0, 0.0, 0.0], [[-0.5, 0.5, 0.0], [-0.5, -0.5, 0.0], [-0.5, -0.5, 1.0], [-0.5, 0.5, 1.0]]),
    ([0.0, 1.0, 0.0], [[0.5, 0.5, 0.0], [-0.5, 0.5, 0.0], [-0.5, 0.5, 1.0], [0.5, 0.5, 1.0]]),
    ([0.0, -1.0, 0.0], [[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.5, -0.5, 1.0], [-0.5, -0.5, 1.0]]),
];

pub const BOX_VERTEX_COUNT: usize = 36;

/// Triangle list of every island node, transformed to world space
pub fn build_scene_mesh(scene: &SceneDescriptor) -> Vec<SceneVertex> {
    let mut vertices = Vec::with_capacity(scene.island.len() * BOX_VERTEX_COUNT);

    for node in &scene.island {
        let model = node.transform.matrix();
        let normal_matrix = Mat3::from_mat4(model).inverse().transpose();

        for (normal, corners) in BOX_FACES.iter() {
            let normal = (normal_matrix * Vec3::from(*normal)).normalize_or_zero();
            for index in [0, 1, 2, 2, 3, 0] {
                let position = model.transform_point3(Vec3::from(corners[index]));
                vertices.push(SceneVertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    color: node.color,
                });
            }
        }
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{IslandNode, Transform};

    #[test]
    fn test_box_faces_wind_outwards() {
        for (normal, corners) in BOX_FACES.iter() {
            let a = Vec3::from(corners[0]);
            let b = Vec3::from(corners[1]);
            let c = Vec3::from(corners[2]);
            let face_normal = (b - a).cross(c - a).normalize();
            assert!((face_normal - Vec3::from(*normal)).length() < 1e-6);
        }
    }

    #[test]
    fn test_scene_mesh_applies_transform() {
        let scene = SceneDescriptor {
            island: vec![IslandNode {
                transform: Transform {
                    position: Vec3::new(2.0, 0.0, 0.0),
                    scale: Vec3::new(1.0, 1.0, 3.0),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };
        let mesh = build_scene_mesh(&scene);
        assert_eq!(mesh.len(), BOX_VERTEX_COUNT);

        let top = mesh.iter().map(|v| v.position[2]).fold(f32::MIN, f32::max);
        let min_x = mesh.iter().map(|v| v.position[0]).fold(f32::MAX, f32::min);
        assert!((top - 3.0).abs() < 1e-6);
        assert!((min_x - 1.5).abs() < 1e-6);
        // Non-uniform scale keeps unit normals
        assert!(mesh.iter().all(|v| (Vec3::from(v.normal).length() - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_shade_faces_lamp() {
        let scene = SceneDescriptor::default();
        let uniforms = SceneUniforms::new(&scene, 1.0);
        let toward_lamp = -Vec3::from_slice(&uniforms.light_dir[..3]);
        let lit = uniforms.shade(toward_lamp, Vec3::ONE);
        let unlit = uniforms.shade(-toward_lamp, Vec3::ONE);
        assert!(lit.x > 0.99);
        assert!((unlit.x - scene.ambient[0]).abs() < 1e-6);
    }
}
