use std::iter;

use bytemuck::cast_slice;
use glam::Mat4;
use log::warn;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferUsages, Device, Queue,
};

use super::transform::InstanceUniform;

pub const MAX_JOINTS: usize = 256;

#[derive(Debug)]
pub struct SkinUniformBuffer {
    buffer: Buffer,
    pub items: Vec<Mat4>,
}

impl SkinUniformBuffer {
    fn pack(items: &[Mat4]) -> Vec<InstanceUniform> {
        items
            .iter()
            .take(MAX_JOINTS)
            .map(InstanceUniform::from)
            .chain(iter::repeat(InstanceUniform::from(&Mat4::IDENTITY)))
            .take(MAX_JOINTS)
            .collect()
    }

    pub fn new(device: &Device, items: Vec<Mat4>) -> Self {
        if items.len() > MAX_JOINTS {
            warn!(
                "Skin has {} joints, only the first {} are uploaded",
                items.len(),
                MAX_JOINTS
            );
        }
        let buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Skin Uniform Buffer"),
            contents: cast_slice(&Self::pack(&items)),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        Self { buffer, items }
    }

    pub fn update(&self, queue: &Queue) {
        queue.write_buffer(&self.buffer, 0, cast_slice(&Self::pack(&self.items)));
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}
