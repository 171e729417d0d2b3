use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::asset::ObjMesh;
use crate::render::vertex::MeshVertex;

/// GPU triangle list plus the CPU-side positions colliders are fitted
/// from.
pub struct Mesh {
    positions: Vec<Vec3>,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl Mesh {
    pub fn from_vertices(device: &wgpu::Device, label: &str, vertices: &[MeshVertex]) -> Self {
        let positions = vertices.iter().map(|v| Vec3::from_array(v.pos)).collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            positions,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        }
    }

    pub fn from_obj(device: &wgpu::Device, label: &str, obj: &ObjMesh) -> Self {
        let vertices: Vec<MeshVertex> = (0..obj.vertex_count())
            .map(|i| MeshVertex {
                pos: obj.positions[i].to_array(),
                normal: obj.normals[i].to_array(),
                uv: obj.uvs[i].to_array(),
            })
            .collect();
        Self::from_vertices(device, label, &vertices)
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}
