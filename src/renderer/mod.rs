use std::{collections::HashMap, iter};

use animation::{AnimationGroupNode, AnimationState};
use camera::Camera;
use context::{GlobalContext, DEFAULT_LOCAL_CONTEXT};
use depth_texture::{DepthTexture, MultisampleTexture};
use glam::{Mat4, Vec3};
use node::{group::GroupNode, RenderNode, RenderNodeItem};
use texture::TextureItem;
use uniform::{
    camera::CameraUniformBuffer,
    light::{FogParam, LightUniformBuffer},
    transform::InstanceUniformBuffer,
};
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, BufferBindingType, Color, CommandEncoder,
    CommandEncoderDescriptor, Device, LoadOp, Operations, Queue, RenderPass,
    RenderPassColorAttachment, RenderPassDepthStencilAttachment, RenderPassDescriptor,
    SamplerBindingType, ShaderStages, StoreOp, TextureFormat, TextureSampleType, TextureView,
    TextureViewDimension,
};

pub mod animation;
pub(crate) mod buffer;
pub mod camera;
pub mod context;
pub mod controls;
mod depth_texture;
pub mod loader;
pub mod node;
pub mod pipeline;
pub(crate) mod texture;
pub mod uniform;

pub use depth_texture::DEPTH_TEXTURE_FORMAT;

pub enum RenderBindGroups<'a> {
    Color,
    Texture { texture: &'a BindGroup },
}

pub struct OngoingRenderState<'a> {
    pub encoder: CommandEncoder,
    pub render_pass: RenderPass<'static>,
    instance_bind_group: &'a BindGroup,
    joint_bind_group: Option<&'a BindGroup>,
    empty_texture_bind_group: &'a BindGroup,
}

impl<'a> OngoingRenderState<'a> {
    pub fn new(device: &Device, texture_view: &'a TextureView, renderer: &'a RendererState) -> Self {
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        let (view, resolve_target) = match &renderer.multisample_texture {
            Some(multisample) => (multisample.texture_view(), Some(texture_view)),
            None => (texture_view, None),
        };
        let background = renderer.background_color();
        let mut render_pass = encoder
            .begin_render_pass(&RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: background.x as f64,
                            g: background.y as f64,
                            b: background.z as f64,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: renderer.depth_texture.texture_view(),
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            })
            .forget_lifetime();

        let default_instance_bind_group = &renderer.global_defaults.instance_bind_group;
        render_pass.set_bind_group(0, &renderer.global_bind_group, &[]);
        render_pass.set_bind_group(1, default_instance_bind_group, &[]);

        Self {
            encoder,
            render_pass,
            instance_bind_group: default_instance_bind_group,
            joint_bind_group: None,
            empty_texture_bind_group: &renderer.global_defaults.empty_texture_group,
        }
    }

    pub fn set_instance(&mut self, bind_group: &'a BindGroup) -> &'a BindGroup {
        let orig_bind_group = self.instance_bind_group;
        self.instance_bind_group = bind_group;
        self.render_pass.set_bind_group(1, bind_group, &[]);
        orig_bind_group
    }

    pub fn set_joint(&mut self, bind_group: Option<&'a BindGroup>) {
        self.joint_bind_group = bind_group;
    }

    pub fn is_joint_bound(&self) -> bool {
        self.joint_bind_group.is_some()
    }

    pub fn bind_groups(&mut self, groups: RenderBindGroups) {
        match (groups, self.joint_bind_group) {
            (RenderBindGroups::Color, None) => (),
            (RenderBindGroups::Color, Some(joint_bind_group)) => {
                self.render_pass
                    .set_bind_group(2, self.empty_texture_bind_group, &[]);
                self.render_pass.set_bind_group(3, joint_bind_group, &[]);
            }
            (RenderBindGroups::Texture { texture }, None) => {
                self.render_pass.set_bind_group(2, texture, &[]);
            }
            (RenderBindGroups::Texture { texture }, Some(joint_bind_group)) => {
                self.render_pass.set_bind_group(2, texture, &[]);
                self.render_pass.set_bind_group(3, joint_bind_group, &[]);
            }
        }
    }

    pub fn finish(self, queue: &Queue) {
        drop(self.render_pass);
        queue.submit(iter::once(self.encoder.finish()));
    }
}

fn uniform_layout_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub struct RendererBindGroupLayout {
    global_uniform_layout: BindGroupLayout,
    instance_uniform_layout: BindGroupLayout,
    texture_layout: BindGroupLayout,
    joint_layout: BindGroupLayout,
}

impl RendererBindGroupLayout {
    pub fn new(device: &Device) -> Self {
        let texture_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        multisampled: false,
                        view_dimension: TextureViewDimension::D2,
                        sample_type: TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("Texture Bind Group Layout"),
        });
        let global_uniform_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            entries: &[
                uniform_layout_entry(0, ShaderStages::VERTEX_FRAGMENT),
                uniform_layout_entry(1, ShaderStages::FRAGMENT),
            ],
            label: Some("Global Uniform Bind Group Layout"),
        });
        let instance_uniform_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            entries: &[uniform_layout_entry(0, ShaderStages::VERTEX)],
            label: Some("Instance Uniform Bind Group Layout"),
        });
        let joint_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            entries: &[uniform_layout_entry(0, ShaderStages::VERTEX)],
            label: Some("Joint Uniform Bind Group Layout"),
        });
        Self {
            global_uniform_layout,
            instance_uniform_layout,
            texture_layout,
            joint_layout,
        }
    }

    pub fn instance_uniform_layout(&self) -> &BindGroupLayout {
        &self.instance_uniform_layout
    }

    pub fn texture_bind_layout(&self) -> &BindGroupLayout {
        &self.texture_layout
    }

    pub fn joint_layout(&self) -> &BindGroupLayout {
        &self.joint_layout
    }
}

struct RendererGlobalDefaults {
    instance_bind_group: BindGroup,
    empty_texture_group: BindGroup,
}

impl RendererGlobalDefaults {
    fn new(device: &Device, queue: &Queue, bind_group_layout: &RendererBindGroupLayout) -> Self {
        let default_instance_buffer = InstanceUniformBuffer::new(device, Mat4::IDENTITY);
        let instance_bind_group = device.create_bind_group(&BindGroupDescriptor {
            layout: &bind_group_layout.instance_uniform_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: default_instance_buffer.buffer().as_entire_binding(),
            }],
            label: Some("Default Instance Uniform Bind Group"),
        });
        let empty_texture = TextureItem::empty(device, queue);
        let empty_texture_group =
            empty_texture.create_bind_group(device, &bind_group_layout.texture_layout);
        Self {
            instance_bind_group,
            empty_texture_group,
        }
    }
}

/// GPU state shared by every node: layouts, global uniforms and render targets.
pub struct RendererState {
    size: (u32, u32),
    surface_format: TextureFormat,
    sample_count: u32,

    camera: Camera,
    camera_updated: bool,
    lights_updated: bool,

    depth_texture: DepthTexture,
    multisample_texture: Option<MultisampleTexture>,

    global_bind_group: BindGroup,
    global_defaults: RendererGlobalDefaults,
    bind_group_layout: RendererBindGroupLayout,
    camera_uniform: CameraUniformBuffer,
    light_uniform: LightUniformBuffer,
}

impl RendererState {
    fn new(
        device: &Device,
        queue: &Queue,
        size: (u32, u32),
        surface_format: TextureFormat,
        sample_count: u32,
    ) -> Self {
        let camera = Camera::default();
        let view_aspect = size.0 as f32 / size.1.max(1) as f32;
        let camera_uniform = CameraUniformBuffer::new(device, &camera, view_aspect);
        let light_uniform = LightUniformBuffer::new(device, FogParam::default());

        let bind_group_layout = RendererBindGroupLayout::new(device);
        let global_bind_group = device.create_bind_group(&BindGroupDescriptor {
            layout: &bind_group_layout.global_uniform_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: camera_uniform.buffer().as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: light_uniform.buffer().as_entire_binding(),
                },
            ],
            label: Some("Global Uniform Bind Group"),
        });
        let global_defaults = RendererGlobalDefaults::new(device, queue, &bind_group_layout);

        let depth_texture = DepthTexture::new(device, size, sample_count);
        let multisample_texture = (sample_count > 1)
            .then(|| MultisampleTexture::new(device, size, surface_format, sample_count));

        Self {
            size,
            surface_format,
            sample_count,
            camera,
            camera_updated: true,
            lights_updated: true,
            depth_texture,
            multisample_texture,
            global_bind_group,
            global_defaults,
            bind_group_layout,
            camera_uniform,
            light_uniform,
        }
    }

    pub fn bind_group_layout(&self) -> &RendererBindGroupLayout {
        &self.bind_group_layout
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn update_camera(&mut self, func: impl FnOnce(&mut Camera)) {
        func(&mut self.camera);
        self.camera_updated = true;
    }

    pub fn view_aspect(&self) -> f32 {
        self.size.0 as f32 / self.size.1.max(1) as f32
    }

    pub fn fog(&self) -> &FogParam {
        self.light_uniform.fog()
    }

    pub fn set_fog(&mut self, fog: FogParam) {
        self.light_uniform.set_fog(fog);
        self.lights_updated = true;
    }

    /// The scene is cleared to the fog color so distant geometry fades into it.
    pub fn background_color(&self) -> Vec3 {
        self.light_uniform.fog().color
    }

    pub fn resize(&mut self, device: &Device, size: (u32, u32)) {
        self.size = size;
        self.camera_updated = true;
        self.depth_texture = DepthTexture::new(device, size, self.sample_count);
        if self.sample_count > 1 {
            self.multisample_texture = Some(MultisampleTexture::new(
                device,
                size,
                self.surface_format,
                self.sample_count,
            ));
        }
    }

    fn prepare(&mut self, queue: &Queue) {
        if self.camera_updated {
            self.camera_updated = false;
            let aspect = self.view_aspect();
            self.camera_uniform.update_view(&self.camera, aspect);
            self.camera_uniform.update(queue);
        }
        if self.lights_updated {
            self.lights_updated = false;
            self.light_uniform.update(queue);
        }
    }
}

pub struct Renderer {
    root_node: GroupNode,
    animation_groups: HashMap<usize, AnimationGroupNode>,
    pub state: RendererState,
}

impl Renderer {
    pub fn new(
        device: &Device,
        queue: &Queue,
        size: (u32, u32),
        surface_format: TextureFormat,
        sample_count: u32,
    ) -> Self {
        let state = RendererState::new(device, queue, size, surface_format, sample_count);
        Self {
            root_node: GroupNode::new(Some("Root Node".to_string())),
            animation_groups: HashMap::new(),
            state,
        }
    }

    pub fn add_node(&mut self, node: RenderNodeItem) {
        self.root_node.push(node);
    }

    pub fn root_node(&self) -> &GroupNode {
        &self.root_node
    }

    pub fn add_animation_group(&mut self, group: AnimationGroupNode) -> usize {
        let id = group.id();
        self.animation_groups.insert(id, group);
        id
    }

    pub fn set_animation_state(&mut self, id: usize, state: AnimationState) -> bool {
        let Some(group) = self.animation_groups.get_mut(&id) else {
            return false;
        };
        group.set_state(state);
        true
    }

    pub fn animation_groups(&self) -> &HashMap<usize, AnimationGroupNode> {
        &self.animation_groups
    }

    /// Advances every playing clip by `delta` seconds.
    pub fn advance_animations(&mut self, delta: f32) {
        for group in self.animation_groups.values_mut() {
            group.advance(&mut self.root_node, delta);
        }
    }

    pub fn prepare(&mut self, device: &Device, queue: &Queue) {
        let mut global_context = GlobalContext::default();
        self.root_node
            .update(&DEFAULT_LOCAL_CONTEXT, &mut global_context, false);
        let lights = global_context.finish();
        self.state.light_uniform.set_lights(&lights);
        self.state.lights_updated = true;
        self.state.prepare(queue);
        self.root_node.prepare(device, queue, &mut self.state);
    }

    pub fn render<'a>(&'a self, ongoing_state: &mut OngoingRenderState<'a>) {
        self.root_node.draw(&self.state, ongoing_state);
    }
}
