use bytemuck::{NoUninit, Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::config::MaterialConfig;

#[repr(C)]
#[derive(Debug, Clone, Copy, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
}

/// Per-instance data: model matrix columns, base color and
/// `[metalness, roughness, clearcoat, clearcoat_roughness]`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub material: [f32; 4],
}

impl InstanceRaw {
    pub fn new(transform: Mat4, material: &MaterialConfig) -> Self {
        Self {
            model: transform.to_cols_array_2d(),
            color: material.color,
            material: [
                material.metalness,
                material.roughness,
                material.clearcoat,
                material.clearcoat_roughness,
            ],
        }
    }
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Cube spanning `[-1, 1]` on every axis with flat per-face normals.
/// Instances scale it to their half extents.
pub fn create_cube_mesh() -> Mesh {
    // (normal, u, v) with u x v = normal so every face winds CCW from outside
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let pos = normal + u * su + v * sv;
            vertices.push(Vertex { pos: pos.to_array(), normal: normal.to_array() });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh { vertices, indices }
}

/// Model matrix for a cube instance: rigid transform, then half extents
pub fn cuboid_transform(transform: Mat4, half_extents: Vec3) -> Mat4 {
    transform * Mat4::from_scale(half_extents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_mesh_counts() {
        let mesh = create_cube_mesh();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        for v in &mesh.vertices {
            assert!(v.pos.iter().all(|c| c.abs() == 1.0));
        }
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        let mesh = create_cube_mesh();
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.vertices[i as usize].pos));
            let face_normal = (b - a).cross(c - a).normalize();
            let vertex_normal = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(vertex_normal) > 0.99, "inward face at {a:?}");
        }
    }

    #[test]
    fn test_instance_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 96);
    }

    #[test]
    fn test_cuboid_transform_scales_before_moving() {
        let t = Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0));
        let m = cuboid_transform(t, Vec3::new(2.0, 3.0, 4.0));
        let corner = m.transform_point3(Vec3::ONE);
        assert_eq!(corner, Vec3::new(2.0, 13.0, 4.0));
    }
}
