use std::{collections::HashMap, fmt::Debug, sync::Arc};

use wgpu::{
    include_wgsl, BlendState, ColorTargetState, ColorWrites, CompareFunction, DepthBiasState,
    DepthStencilState, Device, Face, FragmentState, FrontFace, IndexFormat, MultisampleState,
    PipelineLayout, PipelineLayoutDescriptor, PolygonMode, PrimitiveState, PrimitiveTopology,
    RenderPipeline, RenderPipelineDescriptor, ShaderModule, StencilState, TextureFormat,
    VertexState,
};

use super::{
    buffer::{ColorSkinVertex, ColorVertex, TextureSkinVertex, TextureVertex, Vertex},
    RendererBindGroupLayout, DEPTH_TEXTURE_FORMAT,
};

#[derive(Debug)]
pub struct RenderPipelineItem {
    render_pipeline: RenderPipeline,
    identifier: PipelineIdentifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineIdentifier {
    pub shader: ShaderType,
    pub primitive_topology: PrimitiveTopology,
    pub alpha_mode: ShaderAlphaMode,
    pub double_sided: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    Color,
    Texture,
    ColorSkin,
    TextureSkin,
}

impl ShaderType {
    fn entry_points(&self) -> (&'static str, &'static str) {
        match self {
            ShaderType::Color => ("color_vs_main", "color_fs_main"),
            ShaderType::Texture => ("texture_vs_main", "texture_fs_main"),
            ShaderType::ColorSkin => ("color_skin_vs_main", "color_fs_main"),
            ShaderType::TextureSkin => ("texture_skin_vs_main", "texture_fs_main"),
        }
    }

    pub fn is_skinned(&self) -> bool {
        matches!(self, ShaderType::ColorSkin | ShaderType::TextureSkin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderAlphaMode {
    #[default]
    Opaque,
    Blend,
}

impl RenderPipelineItem {
    fn create_pipeline_layout(
        device: &Device,
        bind_group_layouts: &RendererBindGroupLayout,
        identifier: &PipelineIdentifier,
        label: &str,
    ) -> PipelineLayout {
        let bind_group_layouts: &[_] = match identifier.shader {
            ShaderType::Color => &[
                &bind_group_layouts.global_uniform_layout,
                &bind_group_layouts.instance_uniform_layout,
            ],
            ShaderType::Texture => &[
                &bind_group_layouts.global_uniform_layout,
                &bind_group_layouts.instance_uniform_layout,
                &bind_group_layouts.texture_layout,
            ],
            ShaderType::ColorSkin | ShaderType::TextureSkin => &[
                &bind_group_layouts.global_uniform_layout,
                &bind_group_layouts.instance_uniform_layout,
                &bind_group_layouts.texture_layout,
                &bind_group_layouts.joint_layout,
            ],
        };
        device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts,
            push_constant_ranges: &[],
        })
    }

    fn new(
        device: &Device,
        bind_group_layouts: &RendererBindGroupLayout,
        shader_module: &ShaderModule,
        target_texture_format: TextureFormat,
        sample_count: u32,
        identifier: PipelineIdentifier,
    ) -> Self {
        let label = format!("{:?}", identifier);
        let pipeline_layout =
            Self::create_pipeline_layout(device, bind_group_layouts, &identifier, &label);
        let vertex_descriptor = match identifier.shader {
            ShaderType::Color => ColorVertex::desc(),
            ShaderType::Texture => TextureVertex::desc(),
            ShaderType::ColorSkin => ColorSkinVertex::desc(),
            ShaderType::TextureSkin => TextureSkinVertex::desc(),
        };
        let (vertex_entry_name, fragment_entry_name) = identifier.shader.entry_points();
        let (blend_state, depth_write_enabled) = match identifier.alpha_mode {
            ShaderAlphaMode::Opaque => (BlendState::REPLACE, true),
            ShaderAlphaMode::Blend => (BlendState::ALPHA_BLENDING, false),
        };
        let strip_index_format = match identifier.primitive_topology {
            PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip => {
                Some(IndexFormat::Uint32)
            }
            _ => None,
        };
        let render_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: shader_module,
                entry_point: vertex_entry_name,
                compilation_options: Default::default(),
                buffers: &[vertex_descriptor],
            },
            fragment: Some(FragmentState {
                module: shader_module,
                entry_point: fragment_entry_name,
                compilation_options: Default::default(),
                targets: &[Some(ColorTargetState {
                    format: target_texture_format,
                    blend: Some(blend_state),
                    write_mask: ColorWrites::all(),
                })],
            }),
            primitive: PrimitiveState {
                topology: identifier.primitive_topology,
                strip_index_format,
                front_face: FrontFace::Ccw,
                cull_mode: if identifier.double_sided {
                    None
                } else {
                    Some(Face::Back)
                },
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_TEXTURE_FORMAT,
                depth_write_enabled,
                depth_compare: CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });
        Self {
            render_pipeline,
            identifier,
        }
    }

    pub fn shader_type(&self) -> ShaderType {
        self.identifier.shader
    }

    pub fn render_pipeline(&self) -> &RenderPipeline {
        &self.render_pipeline
    }
}

/// Render pipelines created on demand and shared between primitives.
#[derive(Debug)]
pub struct Pipelines {
    shader_module: ShaderModule,
    target_texture_format: TextureFormat,
    sample_count: u32,
    items: HashMap<PipelineIdentifier, Arc<RenderPipelineItem>>,
}

impl Pipelines {
    pub fn new(device: &Device, target_texture_format: TextureFormat, sample_count: u32) -> Self {
        let shader_module = device.create_shader_module(include_wgsl!("../shader/shader.wgsl"));
        Self {
            shader_module,
            target_texture_format,
            sample_count,
            items: HashMap::new(),
        }
    }

    pub fn get(
        &mut self,
        device: &Device,
        bind_group_layouts: &RendererBindGroupLayout,
        identifier: PipelineIdentifier,
    ) -> Arc<RenderPipelineItem> {
        if let Some(item) = self.items.get(&identifier) {
            return item.clone();
        }
        let item = Arc::new(RenderPipelineItem::new(
            device,
            bind_group_layouts,
            &self.shader_module,
            self.target_texture_format,
            self.sample_count,
            identifier,
        ));
        self.items.insert(identifier, item.clone());
        item
    }
}
