use wgpu::{Device, Queue};

use crate::renderer::{
    context::{GlobalContext, LocalContext},
    OngoingRenderState, RendererState,
};

use super::{new_node_id, RenderNode, RenderNodeItem};

/// Marks a subtree as a joint of one or more skins. Its world matrix is
/// published to the global context whenever it changes.
#[derive(Debug)]
pub struct JointNode {
    id: usize,
    // (skin id, joint index)
    skin_indexes: Vec<(usize, usize)>,
    published: bool,
    pub node: RenderNodeItem,
}

impl JointNode {
    pub fn new(skin_indexes: Vec<(usize, usize)>, node: RenderNodeItem) -> Self {
        Self {
            id: new_node_id(),
            skin_indexes,
            published: false,
            node,
        }
    }

    pub fn skin_indexes(&self) -> &[(usize, usize)] {
        &self.skin_indexes
    }
}

impl RenderNode for JointNode {
    fn id(&self) -> usize {
        self.id
    }

    fn update(
        &mut self,
        local_context: &LocalContext,
        global_context: &mut GlobalContext,
        invalid: bool,
    ) {
        if invalid || !self.published {
            for (skin_id, joint_index) in &self.skin_indexes {
                global_context.update_joint(*skin_id, *joint_index, *local_context.transform());
            }
            self.published = true;
        }
        self.node.update(local_context, global_context, invalid);
    }

    fn prepare(&mut self, device: &Device, queue: &Queue, renderer_state: &mut RendererState) {
        self.node.prepare(device, queue, renderer_state);
    }

    fn draw<'a>(
        &'a self,
        renderer_state: &'a RendererState,
        ongoing_state: &mut OngoingRenderState<'a>,
    ) {
        self.node.draw(renderer_state, ongoing_state);
    }
}
