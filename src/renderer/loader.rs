use std::{
    collections::{BTreeSet, HashMap},
    iter,
    sync::Arc,
};

use log::{debug, warn};
use wgpu::{BindGroup, Device, PrimitiveTopology, Queue};

use crate::asset::{
    animation::{AnimationAsset, AnimationChannelAsset},
    index::AssetIndex,
    material::{MaterialAlphaMode, MaterialAsset},
    mesh::MeshAsset,
    node::NodeAsset,
    primitive::{PrimitiveAsset, PrimitiveAssetMode},
    scene::SceneAsset,
    skin::SkinAsset,
    texture::{TextureAsset, TextureAssetId},
};

use super::{
    animation::{AnimationGroupNode, AnimationNode},
    buffer::{
        ColorSkinVertex, ColorVertex, IndexBuffer, TextureSkinVertex, TextureVertex, VertexBuffer,
    },
    node::{
        group::GroupNode,
        joint::JointNode,
        primitive::{PrimitiveNode, PrimitiveNodeContent},
        skin::{SkinData, SkinNode},
        transform::TransformNode,
        RenderNode, RenderNodeItem,
    },
    pipeline::{PipelineIdentifier, Pipelines, ShaderAlphaMode},
    texture::TextureItem,
    RendererBindGroupLayout,
};

fn multiply_color(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]]
}

fn primitive_topology(mode: PrimitiveAssetMode) -> PrimitiveTopology {
    match mode {
        PrimitiveAssetMode::Points => PrimitiveTopology::PointList,
        PrimitiveAssetMode::LineList => PrimitiveTopology::LineList,
        PrimitiveAssetMode::LineStrip => PrimitiveTopology::LineStrip,
        PrimitiveAssetMode::TriangleList => PrimitiveTopology::TriangleList,
        PrimitiveAssetMode::TriangleStrip => PrimitiveTopology::TriangleStrip,
    }
}

/// Turns CPU side assets into render nodes, uploading buffers and textures.
///
/// Nodes must be loaded before the animations targeting them: channels are
/// resolved through the transform nodes recorded while loading.
pub struct RendererAssetLoader<'a> {
    bind_group_layouts: &'a RendererBindGroupLayout,
    pipelines: &'a mut Pipelines,
    texture_cache: HashMap<TextureAssetId, Arc<BindGroup>>,
    animate_nodes: HashMap<AssetIndex, usize>,
    skins: HashMap<AssetIndex, Arc<SkinData>>,
}

impl<'a> RendererAssetLoader<'a> {
    pub fn new(
        bind_group_layouts: &'a RendererBindGroupLayout,
        pipelines: &'a mut Pipelines,
    ) -> Self {
        Self {
            bind_group_layouts,
            pipelines,
            texture_cache: HashMap::new(),
            animate_nodes: HashMap::new(),
            skins: HashMap::new(),
        }
    }

    pub fn load_texture(
        &mut self,
        device: &Device,
        queue: &Queue,
        asset: &TextureAsset,
    ) -> Arc<BindGroup> {
        if let Some(texture) = self.texture_cache.get(&asset.id) {
            return texture.clone();
        }
        let texture = TextureItem::from_asset(device, queue, asset);
        let bind_group = Arc::new(
            texture.create_bind_group(device, self.bind_group_layouts.texture_bind_layout()),
        );
        self.texture_cache
            .insert(asset.id.clone(), bind_group.clone());
        bind_group
    }

    pub fn load_primitive(
        &mut self,
        device: &Device,
        queue: &Queue,
        primitive: PrimitiveAsset,
    ) -> PrimitiveNode {
        let material = primitive
            .material
            .clone()
            .unwrap_or_else(|| Arc::new(MaterialAsset::default()));
        let normals = primitive.normals_or_calculated();
        let label = primitive.name.as_deref();
        let indices = primitive
            .indices
            .as_ref()
            .map(|indices| IndexBuffer::new(device, indices, label));

        let base_color = material.diffuse_color;
        let colors: Vec<[f32; 4]> = match &primitive.vertex_color {
            Some(colors) => colors
                .iter()
                .chain(iter::repeat(&[1.0, 1.0, 1.0, 1.0]))
                .take(primitive.positions.len())
                .map(|color| multiply_color(*color, base_color))
                .collect(),
            None => vec![base_color; primitive.positions.len()],
        };

        let skin = primitive
            .skin
            .as_ref()
            .filter(|_| material.skinning)
            .filter(|skin| {
                let complete = skin.joints.len() == primitive.positions.len()
                    && skin.weights.len() == primitive.positions.len();
                if !complete {
                    warn!("Skin attributes do not cover every vertex, drawing unskinned");
                }
                complete
            });
        let texture = match (&primitive.tex_coords, &material.diffuse_texture) {
            (Some(tex_coords), Some(texture)) if tex_coords.len() == primitive.positions.len() => {
                Some((tex_coords, texture))
            }
            _ => None,
        };

        let positions = primitive.positions.iter().copied();
        let content = match (texture, skin) {
            (Some((tex_coords, texture)), Some(skin)) => {
                let vertices: Vec<_> = positions
                    .zip(normals)
                    .zip(colors)
                    .zip(tex_coords)
                    .zip(skin.joints.iter().zip(&skin.weights))
                    .map(
                        |((((position, normal), color), tex_coords), (joint_index, joint_weight))| {
                            TextureSkinVertex {
                                position,
                                normal,
                                color,
                                tex_coords: *tex_coords,
                                joint_index: *joint_index,
                                joint_weight: *joint_weight,
                            }
                        },
                    )
                    .collect();
                let bind_group = self.load_texture(device, queue, texture);
                PrimitiveNodeContent::TextureSkin {
                    buffer: VertexBuffer::new(device, &vertices, label),
                    bind_group,
                }
            }
            (None, Some(skin)) => {
                let vertices: Vec<_> = positions
                    .zip(normals)
                    .zip(colors)
                    .zip(skin.joints.iter().zip(&skin.weights))
                    .map(
                        |(((position, normal), color), (joint_index, joint_weight))| {
                            ColorSkinVertex {
                                position,
                                normal,
                                color,
                                joint_index: *joint_index,
                                joint_weight: *joint_weight,
                            }
                        },
                    )
                    .collect();
                PrimitiveNodeContent::ColorSkin {
                    buffer: VertexBuffer::new(device, &vertices, label),
                }
            }
            (Some((tex_coords, texture)), None) => {
                let vertices: Vec<_> = positions
                    .zip(normals)
                    .zip(colors)
                    .zip(tex_coords)
                    .map(|(((position, normal), color), tex_coords)| TextureVertex {
                        position,
                        normal,
                        color,
                        tex_coords: *tex_coords,
                    })
                    .collect();
                let bind_group = self.load_texture(device, queue, texture);
                PrimitiveNodeContent::Texture {
                    buffer: VertexBuffer::new(device, &vertices, label),
                    bind_group,
                }
            }
            (None, None) => {
                let vertices: Vec<_> = positions
                    .zip(normals)
                    .zip(colors)
                    .map(|((position, normal), color)| ColorVertex {
                        position,
                        normal,
                        color,
                    })
                    .collect();
                PrimitiveNodeContent::Color {
                    buffer: VertexBuffer::new(device, &vertices, label),
                }
            }
        };

        let pipeline_identifier = PipelineIdentifier {
            shader: content.shader_type(),
            primitive_topology: primitive_topology(primitive.mode),
            alpha_mode: match material.alpha_mode {
                MaterialAlphaMode::Opaque => ShaderAlphaMode::Opaque,
                MaterialAlphaMode::Blend => ShaderAlphaMode::Blend,
            },
            double_sided: material.double_sided,
        };
        let pipeline = self
            .pipelines
            .get(device, self.bind_group_layouts, pipeline_identifier);
        PrimitiveNode::new(indices, content, pipeline)
    }

    pub fn load_mesh(&mut self, device: &Device, queue: &Queue, mesh: MeshAsset) -> RenderNodeItem {
        let mut target_node = GroupNode::new(mesh.name);
        for primitive in mesh.primitives {
            let primitive = self.load_primitive(device, queue, primitive);
            target_node.push(RenderNodeItem::Primitive(Box::new(primitive)));
        }
        RenderNodeItem::Group(Box::new(target_node))
    }

    pub fn load_skin(&self, skin: &SkinAsset) -> Arc<SkinData> {
        Arc::new(SkinData::new(skin.inverse_bind_matrices.clone()))
    }

    pub fn load_node(
        &mut self,
        device: &Device,
        queue: &Queue,
        node: NodeAsset,
        skins: &HashMap<AssetIndex, Arc<SkinAsset>>,
        joint_nodes: &HashMap<AssetIndex, BTreeSet<AssetIndex>>,
    ) -> RenderNodeItem {
        let mut target_node = GroupNode::new(node.name);

        if let Some(mesh) = node.mesh {
            let mesh = self.load_mesh(device, queue, mesh);
            target_node.push(mesh);
        }

        for child in node.children {
            let child = self.load_node(device, queue, child, skins, joint_nodes);
            target_node.push(child);
        }

        let mut target_node = RenderNodeItem::Group(Box::new(target_node));

        if let Some(joint_skins) = joint_nodes.get(&node.id) {
            let skin_indexes: Vec<(usize, usize)> = joint_skins
                .iter()
                .filter_map(|skin_id| {
                    let skin_data = self.skins.get(skin_id)?;
                    let skin = skins.get(skin_id)?;
                    let joint_index = skin.joint_ids.iter().position(|id| *id == node.id)?;
                    Some((skin_data.id, joint_index))
                })
                .collect();
            if skin_indexes.is_empty() {
                warn!("Joint {} belongs to no loaded skin", node.id);
            } else {
                target_node = RenderNodeItem::Joint(Box::new(JointNode::new(
                    skin_indexes,
                    target_node,
                )));
            }
        }

        match (node.has_animation, node.transform) {
            (true, transform) => {
                let transform =
                    TransformNode::from_transform(transform.unwrap_or_default(), target_node);
                self.animate_nodes.insert(node.id, transform.id());
                RenderNodeItem::Transform(Box::new(transform))
            }
            (false, Some(transform)) => {
                let transform = TransformNode::from_transform(transform, target_node);
                RenderNodeItem::Transform(Box::new(transform))
            }
            (false, None) => target_node,
        }
    }

    /// Skinned nodes are appended after the rest of the scene so their joints
    /// are updated first in every frame.
    pub fn load_scene(
        &mut self,
        device: &Device,
        queue: &Queue,
        scene: SceneAsset,
    ) -> RenderNodeItem {
        for (id, skin) in &scene.skins {
            let data = self.load_skin(skin);
            self.skins.insert(id.clone(), data);
        }
        let mut target_node = GroupNode::new(scene.name);
        for node in scene.nodes {
            let node = self.load_node(device, queue, node, &scene.skins, &scene.joint_nodes);
            target_node.push(node);
        }
        for node in scene.skinned_nodes {
            let skin = node
                .skin
                .as_ref()
                .and_then(|skin| self.skins.get(&skin.id))
                .cloned();
            let node = self.load_node(device, queue, node, &scene.skins, &scene.joint_nodes);
            match skin {
                Some(skin) => {
                    let skin_node = SkinNode::new(skin, node);
                    target_node.push(RenderNodeItem::Skin(Box::new(skin_node)));
                }
                None => {
                    warn!("Skinned node #{} has no loaded skin", node.id());
                    target_node.push(node);
                }
            }
        }
        RenderNodeItem::Group(Box::new(target_node))
    }

    pub fn load_scenes(
        &mut self,
        device: &Device,
        queue: &Queue,
        scenes: Vec<SceneAsset>,
        label: Option<String>,
    ) -> RenderNodeItem {
        let mut target_node = GroupNode::new(label);
        for scene in scenes {
            let scene = self.load_scene(device, queue, scene);
            target_node.push(scene);
        }
        RenderNodeItem::Group(Box::new(target_node))
    }

    pub fn load_animation_channel(&self, channel: AnimationChannelAsset) -> Option<AnimationNode> {
        let Some(target_node) = self.animate_nodes.get(&channel.target_id) else {
            warn!(
                "Node not found when creating animation: {}",
                channel.target_id
            );
            return None;
        };
        Some(AnimationNode::new(
            *target_node,
            channel.sampler,
            channel.length,
        ))
    }

    pub fn load_animation(&self, animation: AnimationAsset) -> AnimationGroupNode {
        let nodes: Vec<AnimationNode> = animation
            .channels
            .into_iter()
            .filter_map(|channel| self.load_animation_channel(channel))
            .collect();
        let length = nodes.iter().map(AnimationNode::length).fold(0.0, f32::max);
        debug!(
            "Animation {:?}: {} channels, {:.2}s",
            animation.name,
            nodes.len(),
            length
        );
        AnimationGroupNode::new(nodes, length, animation.name)
    }

    pub fn load_animations(&self, animations: Vec<AnimationAsset>) -> Vec<AnimationGroupNode> {
        animations
            .into_iter()
            .map(|item| self.load_animation(item))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vertex_color_is_tinted_by_material() {
        let color = multiply_color([0.5, 1.0, 1.0, 1.0], [1.0, 0.5, 1.0, 0.25]);
        assert_eq!(color, [0.5, 0.5, 1.0, 0.25]);
    }

    #[test]
    fn modes_map_to_topologies() {
        assert_eq!(
            primitive_topology(PrimitiveAssetMode::TriangleList),
            PrimitiveTopology::TriangleList
        );
        assert_eq!(
            primitive_topology(PrimitiveAssetMode::LineStrip),
            PrimitiveTopology::LineStrip
        );
    }
}
