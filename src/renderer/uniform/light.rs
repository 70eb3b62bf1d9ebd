use bytemuck::{cast_slice, Pod, Zeroable};
use glam::Vec3;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferUsages, Device, Queue,
};

use crate::renderer::node::light::LightData;

pub const MAX_PARALLEL_LIGHTS: usize = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, Default)]
struct ParallelLightItem {
    direction: [f32; 3],
    strength: f32,
    color: [f32; 3],
    padding: f32,
}

/// Exponential squared fog, matching the look of a distance haze.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParam {
    pub color: Vec3,
    pub density: f32,
}

impl Default for FogParam {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            density: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct LightUniform {
    fog_color: [f32; 3],      // 12 12
    fog_density: f32,         // 4  16
    ambient: [f32; 3],        // 12 28
    parallel_length: u32,     // 4  32
    parallel: [ParallelLightItem; MAX_PARALLEL_LIGHTS],
}

#[derive(Debug)]
pub struct LightUniformBuffer {
    buffer: Buffer,
    uniform: LightUniform,
    fog: FogParam,
}

impl LightUniformBuffer {
    pub fn new(device: &Device, fog: FogParam) -> Self {
        let uniform = LightUniform {
            fog_color: fog.color.to_array(),
            fog_density: fog.density,
            ambient: [0.0; 3],
            parallel_length: 0,
            parallel: [ParallelLightItem::default(); MAX_PARALLEL_LIGHTS],
        };
        let buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Light Uniform Buffer"),
            contents: cast_slice(&[uniform]),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        Self {
            buffer,
            uniform,
            fog,
        }
    }

    pub fn fog(&self) -> &FogParam {
        &self.fog
    }

    pub fn set_fog(&mut self, fog: FogParam) {
        self.fog = fog;
        self.uniform.fog_color = fog.color.to_array();
        self.uniform.fog_density = fog.density;
    }

    /// Folds the lights collected in one update pass into the uniform.
    /// Ambient colors add up, parallel lights past the limit are ignored.
    pub fn set_lights(&mut self, items: &[LightData]) {
        let mut ambient = Vec3::ZERO;
        let mut parallel_length = 0;
        for item in items {
            match item {
                LightData::Ambient { color } => ambient += *color,
                LightData::Parallel {
                    direction,
                    color,
                    strength,
                } => {
                    if parallel_length >= MAX_PARALLEL_LIGHTS {
                        continue;
                    }
                    self.uniform.parallel[parallel_length] = ParallelLightItem {
                        direction: direction.normalize_or_zero().to_array(),
                        strength: *strength,
                        color: color.to_array(),
                        padding: 0.0,
                    };
                    parallel_length += 1;
                }
            }
        }
        self.uniform.ambient = ambient.to_array();
        self.uniform.parallel_length = parallel_length as u32;
    }

    pub fn update(&self, queue: &Queue) {
        queue.write_buffer(&self.buffer, 0, cast_slice(&[self.uniform]));
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod test {
    use std::mem::size_of;

    use super::*;

    #[test]
    fn light_uniform_layout_is_16_byte_aligned() {
        assert_eq!(size_of::<ParallelLightItem>(), 32);
        assert_eq!(size_of::<LightUniform>() % 16, 0);
    }
}
