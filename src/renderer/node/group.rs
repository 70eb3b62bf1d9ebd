use core::slice;

use wgpu::{Device, Queue};

use crate::renderer::context::{GlobalContext, LocalContext};

use super::{
    new_node_id, transform::TransformNode, OngoingRenderState, RenderNode, RenderNodeItem,
    RendererState,
};

#[derive(Default, Debug)]
pub struct GroupNode {
    id: usize,
    label: Option<String>,
    nodes: Vec<RenderNodeItem>,
}

impl RenderNode for GroupNode {
    fn id(&self) -> usize {
        self.id
    }

    fn update(
        &mut self,
        local_context: &LocalContext,
        global_context: &mut GlobalContext,
        invalid: bool,
    ) {
        for item in &mut self.nodes {
            item.update(local_context, global_context, invalid);
        }
    }

    fn prepare(&mut self, device: &Device, queue: &Queue, renderer_state: &mut RendererState) {
        for item in &mut self.nodes {
            item.prepare(device, queue, renderer_state)
        }
    }

    fn draw<'a>(
        &'a self,
        renderer_state: &'a RendererState,
        ongoing_state: &mut OngoingRenderState<'a>,
    ) {
        for item in &self.nodes {
            item.draw(renderer_state, ongoing_state)
        }
    }
}

impl GroupNode {
    pub fn new(label: Option<String>) -> Self {
        Self {
            id: new_node_id(),
            label,
            nodes: Vec::new(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn push(&mut self, node: RenderNodeItem) {
        self.nodes.push(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, RenderNodeItem> {
        self.nodes.iter()
    }

    pub fn find_transform_node_mut(&mut self, id: usize) -> Option<&mut TransformNode> {
        fn find_node(item: &mut RenderNodeItem, id: usize) -> Option<&mut TransformNode> {
            match item {
                RenderNodeItem::Group(group) => group.find_transform_node_mut(id),
                RenderNodeItem::Transform(transform) => {
                    if transform.id() == id {
                        Some(transform)
                    } else {
                        find_node(&mut transform.node, id)
                    }
                }
                RenderNodeItem::Joint(joint) => find_node(&mut joint.node, id),
                RenderNodeItem::Skin(skin) => find_node(&mut skin.node, id),
                RenderNodeItem::Primitive(_) | RenderNodeItem::Light(_) => None,
            }
        }

        self.nodes.iter_mut().find_map(|item| find_node(item, id))
    }
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use crate::{
        asset::node::DecomposedTransform,
        renderer::node::light::{LightNode, LightParam},
    };

    use super::*;

    #[test]
    fn find_transform_node_searches_nested_nodes() {
        let inner = TransformNode::new(RenderNodeItem::Group(Box::default()));
        let inner_id = inner.id();
        let outer = TransformNode::new(RenderNodeItem::Transform(Box::new(inner)));
        let mut root = GroupNode::new(None);
        root.push(RenderNodeItem::Transform(Box::new(outer)));

        let found = root.find_transform_node_mut(inner_id).unwrap();
        found.set_transform(DecomposedTransform {
            translation: Vec3::X,
            ..Default::default()
        });
        assert_eq!(
            root.find_transform_node_mut(inner_id)
                .unwrap()
                .transform()
                .translation,
            Vec3::X
        );
        assert!(root.find_transform_node_mut(usize::MAX).is_none());
    }

    #[test]
    fn count_includes_all_descendants() {
        let mut group = GroupNode::new(None);
        group.push(RenderNodeItem::Group(Box::default()));
        let transform = TransformNode::new(RenderNodeItem::Group(Box::new(group)));
        let item = RenderNodeItem::Transform(Box::new(transform));
        assert_eq!(item.count(), 3);
    }

    #[test]
    fn placed_model_adds_one_root_child() {
        let mut root = GroupNode::new(Some("Root Node".to_string()));
        root.push(RenderNodeItem::Light(Box::new(LightNode::new(
            LightParam::Ambient { color: Vec3::ONE },
        ))));
        let before = root.len();

        let mut model = GroupNode::new(Some("girl.json".to_string()));
        model.push(RenderNodeItem::Group(Box::default()));
        model.push(RenderNodeItem::Group(Box::default()));
        let placement = TransformNode::from_decomposed_transform(
            DecomposedTransform::from_translation_scale(Vec3::new(0.0, -20.0, 0.0), 40.0),
            RenderNodeItem::Group(Box::new(model)),
        );
        root.push(RenderNodeItem::Transform(Box::new(placement)));
        assert_eq!(root.len(), before + 1);
    }
}
