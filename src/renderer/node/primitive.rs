use std::{fmt::Debug, sync::Arc};

use log::warn;
use wgpu::BindGroup;

use crate::renderer::{
    buffer::{IndexBuffer, VertexBuffer},
    pipeline::{RenderPipelineItem, ShaderType},
    OngoingRenderState, RenderBindGroups, RendererState,
};

use super::{new_node_id, RenderNode};

#[derive(Debug)]
pub enum PrimitiveNodeContent {
    Color {
        buffer: VertexBuffer,
    },
    Texture {
        buffer: VertexBuffer,
        bind_group: Arc<BindGroup>,
    },
    ColorSkin {
        buffer: VertexBuffer,
    },
    TextureSkin {
        buffer: VertexBuffer,
        bind_group: Arc<BindGroup>,
    },
}

impl PrimitiveNodeContent {
    pub fn shader_type(&self) -> ShaderType {
        match self {
            PrimitiveNodeContent::Color { .. } => ShaderType::Color,
            PrimitiveNodeContent::Texture { .. } => ShaderType::Texture,
            PrimitiveNodeContent::ColorSkin { .. } => ShaderType::ColorSkin,
            PrimitiveNodeContent::TextureSkin { .. } => ShaderType::TextureSkin,
        }
    }
}

#[derive(Debug)]
pub struct PrimitiveNode {
    id: usize,
    indices: Option<IndexBuffer>,
    content: PrimitiveNodeContent,
    pipeline: Arc<RenderPipelineItem>,
}

impl PrimitiveNode {
    pub fn new(
        indices: Option<IndexBuffer>,
        content: PrimitiveNodeContent,
        pipeline: Arc<RenderPipelineItem>,
    ) -> Self {
        Self {
            id: new_node_id(),
            indices,
            content,
            pipeline,
        }
    }

    pub fn content(&self) -> &PrimitiveNodeContent {
        &self.content
    }
}

impl RenderNode for PrimitiveNode {
    fn id(&self) -> usize {
        self.id
    }

    fn draw<'a>(
        &'a self,
        _renderer_state: &'a RendererState,
        ongoing_state: &mut OngoingRenderState<'a>,
    ) {
        if self.pipeline.shader_type() != self.content.shader_type() {
            warn!(
                "Pipeline of primitive node #{} does not match its vertices, skip drawing.",
                self.id
            );
            return;
        }
        if self.content.shader_type().is_skinned() && !ongoing_state.is_joint_bound() {
            warn!(
                "Trying to draw skinned primitive node #{} without joints bound.",
                self.id
            );
            return;
        }
        let vertex = match &self.content {
            PrimitiveNodeContent::Color { buffer } | PrimitiveNodeContent::ColorSkin { buffer } => {
                ongoing_state.bind_groups(RenderBindGroups::Color);
                buffer
            }
            PrimitiveNodeContent::Texture { buffer, bind_group }
            | PrimitiveNodeContent::TextureSkin { buffer, bind_group } => {
                ongoing_state.bind_groups(RenderBindGroups::Texture {
                    texture: bind_group,
                });
                buffer
            }
        };

        ongoing_state
            .render_pass
            .set_pipeline(self.pipeline.render_pipeline());
        vertex.draw(&mut ongoing_state.render_pass, self.indices.as_ref());
    }
}
