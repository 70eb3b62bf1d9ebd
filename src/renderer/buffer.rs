use std::mem::size_of;

use bytemuck::{cast_slice, Pod, Zeroable};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    vertex_attr_array, Buffer, BufferAddress, BufferUsages, Device, IndexFormat, RenderPass,
    VertexAttribute, VertexBufferLayout, VertexStepMode,
};

pub trait Vertex: Copy + Clone + Pod + Zeroable {
    const ATTRIBS: &[VertexAttribute];

    fn desc<'a>() -> VertexBufferLayout<'a> {
        VertexBufferLayout {
            array_stride: size_of::<Self>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex for ColorVertex {
    const ATTRIBS: &[VertexAttribute] = &vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4
    ];
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TextureVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub tex_coords: [f32; 2],
}

impl Vertex for TextureVertex {
    const ATTRIBS: &[VertexAttribute] = &vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4,
        3 => Float32x2
    ];
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ColorSkinVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub joint_index: [u16; 4],
    pub joint_weight: [f32; 4],
}

impl Vertex for ColorSkinVertex {
    const ATTRIBS: &[VertexAttribute] = &vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4,
        4 => Uint16x4,
        5 => Float32x4
    ];
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TextureSkinVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub tex_coords: [f32; 2],
    pub joint_index: [u16; 4],
    pub joint_weight: [f32; 4],
}

impl Vertex for TextureSkinVertex {
    const ATTRIBS: &[VertexAttribute] = &vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4,
        3 => Float32x2,
        4 => Uint16x4,
        5 => Float32x4
    ];
}

#[derive(Debug)]
pub struct IndexBuffer {
    buffer: Buffer,
    indices: usize,
}

impl IndexBuffer {
    pub fn new(device: &Device, indices: &[u32], label: Option<&str>) -> Self {
        let buffer = device.create_buffer_init(&BufferInitDescriptor {
            label,
            contents: cast_slice(indices),
            usage: BufferUsages::INDEX,
        });
        Self {
            buffer,
            indices: indices.len(),
        }
    }

    pub fn indices(&self) -> usize {
        self.indices
    }
}

#[derive(Debug)]
pub struct VertexBuffer {
    buffer: Buffer,
    vertices: usize,
}

impl VertexBuffer {
    pub fn new<T: Vertex>(device: &Device, vertices: &[T], label: Option<&str>) -> Self {
        let buffer = device.create_buffer_init(&BufferInitDescriptor {
            label,
            contents: cast_slice(vertices),
            usage: BufferUsages::VERTEX,
        });
        Self {
            buffer,
            vertices: vertices.len(),
        }
    }

    pub fn vertices(&self) -> usize {
        self.vertices
    }

    pub fn draw(&self, render_pass: &mut RenderPass, indices: Option<&IndexBuffer>) {
        render_pass.set_vertex_buffer(0, self.buffer.slice(..));
        match indices {
            Some(indices) => {
                render_pass.set_index_buffer(indices.buffer.slice(..), IndexFormat::Uint32);
                render_pass.draw_indexed(0..indices.indices as u32, 0, 0..1);
            }
            None => render_pass.draw(0..self.vertices as u32, 0..1),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vertex_strides_match_attribute_layout() {
        assert_eq!(ColorVertex::desc().array_stride, 40);
        assert_eq!(TextureVertex::desc().array_stride, 48);
        assert_eq!(ColorSkinVertex::desc().array_stride, 64);
        assert_eq!(TextureSkinVertex::desc().array_stride, 72);
    }
}
