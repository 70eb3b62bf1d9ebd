use bytemuck::{cast_slice, Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferUsages, Device, Queue,
};

fn pad_vec3(vec: &Vec3) -> [f32; 4] {
    [vec.x, vec.y, vec.z, 0.0]
}

/// Inverse transpose of the upper 3x3, with each column padded for std140.
pub(super) fn normal_matrix(matrix: &Mat4) -> [[f32; 4]; 3] {
    let result = Mat3::from_mat4(*matrix).inverse().transpose();
    if !result.is_finite() {
        return [
            pad_vec3(&Vec3::X),
            pad_vec3(&Vec3::Y),
            pad_vec3(&Vec3::Z),
        ];
    }
    [
        pad_vec3(&result.x_axis),
        pad_vec3(&result.y_axis),
        pad_vec3(&result.z_axis),
    ]
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct InstanceUniform {
    pub transform: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
}

impl From<&Mat4> for InstanceUniform {
    fn from(matrix: &Mat4) -> Self {
        Self {
            transform: matrix.to_cols_array_2d(),
            normal: normal_matrix(matrix),
        }
    }
}

#[derive(Debug)]
pub struct InstanceUniformBuffer {
    buffer: Buffer,
    pub transform: Mat4,
}

impl InstanceUniformBuffer {
    pub fn new(device: &Device, transform: Mat4) -> Self {
        let uniform = InstanceUniform::from(&transform);
        let buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Instance Uniform Buffer"),
            contents: cast_slice(&[uniform]),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        Self { buffer, transform }
    }

    pub fn update(&self, queue: &Queue) {
        let uniform = InstanceUniform::from(&self.transform);
        queue.write_buffer(&self.buffer, 0, cast_slice(&[uniform]));
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod test {
    use std::mem::size_of;

    use glam::Quat;

    use super::*;

    #[test]
    fn instance_uniform_is_16_byte_aligned() {
        assert_eq!(size_of::<InstanceUniform>(), 112);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let matrix = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let normal = normal_matrix(&matrix);
        assert_eq!(normal[0], [0.5, 0.0, 0.0, 0.0]);
        assert_eq!(normal[1], [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn normal_matrix_of_rotation_is_the_rotation() {
        let rotation = Quat::from_rotation_y(1.0);
        let normal = normal_matrix(&Mat4::from_quat(rotation));
        let x = Vec3::new(normal[0][0], normal[0][1], normal[0][2]);
        assert!((x - rotation * Vec3::X).length() < 1e-5);
    }

    #[test]
    fn degenerate_matrix_falls_back_to_identity() {
        let normal = normal_matrix(&Mat4::from_scale(Vec3::ZERO));
        assert_eq!(normal[2], [0.0, 0.0, 1.0, 0.0]);
    }
}
