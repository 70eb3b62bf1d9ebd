use bytemuck::{cast_slice, Pod, Zeroable};
use glam::Mat4;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferUsages, Device, Queue,
};

use crate::renderer::camera::Camera;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, Default)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    view_pos: [f32; 3],
    aspect: f32,
}

#[derive(Debug)]
pub struct CameraUniformBuffer {
    buffer: Buffer,
    uniform: CameraUniform,
}

impl CameraUniformBuffer {
    pub fn new(device: &Device, camera: &Camera, default_aspect: f32) -> Self {
        let mut uniform = CameraUniform::default();
        Self::write_view(&mut uniform, camera, default_aspect);
        let buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: cast_slice(&[uniform]),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        Self { buffer, uniform }
    }

    fn write_view(uniform: &mut CameraUniform, camera: &Camera, default_aspect: f32) {
        let view_proj: Mat4 = camera.matrix(default_aspect);
        uniform.view_proj = view_proj.to_cols_array_2d();
        uniform.view_pos = camera.eye.to_array();
        uniform.aspect = camera.aspect.unwrap_or(default_aspect);
    }

    pub fn update_view(&mut self, camera: &Camera, default_aspect: f32) {
        Self::write_view(&mut self.uniform, camera, default_aspect);
    }

    pub fn update(&self, queue: &Queue) {
        queue.write_buffer(&self.buffer, 0, cast_slice(&[self.uniform]));
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}
