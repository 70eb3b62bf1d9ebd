use std::{
    mem,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use glam::Mat4;
use log::warn;
use wgpu::{BindGroup, BindGroupDescriptor, BindGroupEntry, Device, Queue};

use crate::renderer::{
    context::{GlobalContext, LocalContext},
    uniform::skin::{SkinUniformBuffer, MAX_JOINTS},
    OngoingRenderState, RendererState,
};

use super::{new_node_id, RenderNode, RenderNodeItem};

static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn new_skin_id() -> usize {
    ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
struct SkinBuffer {
    buffer: SkinUniformBuffer,
    bind_group: BindGroup,
}

#[derive(Debug, Clone)]
pub struct SkinData {
    pub id: usize,
    pub inverse_bind_matrices: Vec<Mat4>,
}

impl SkinData {
    pub fn new(inverse_bind_matrices: Vec<Mat4>) -> Self {
        if inverse_bind_matrices.len() > MAX_JOINTS {
            warn!(
                "Skin has {} joints, more than the supported {}",
                inverse_bind_matrices.len(),
                MAX_JOINTS
            );
        }
        Self {
            id: new_skin_id(),
            inverse_bind_matrices,
        }
    }
}

/// Draws its subtree deformed by the joints of one skin.
///
/// Joint matrices are picked up from the global context, so a skin node must
/// be updated after every joint node referring to it.
#[derive(Debug)]
pub struct SkinNode {
    id: usize,
    data: Arc<SkinData>,
    items: Vec<Mat4>,
    buffer: Option<SkinBuffer>,
    invalid: bool,
    pub node: RenderNodeItem,
}

impl SkinNode {
    pub fn new(data: Arc<SkinData>, node: RenderNodeItem) -> Self {
        let items = vec![Mat4::IDENTITY; data.inverse_bind_matrices.len()];
        Self {
            id: new_node_id(),
            data,
            items,
            buffer: None,
            invalid: true,
            node,
        }
    }

    pub fn skin_id(&self) -> usize {
        self.data.id
    }

    /// Current `joint world * inverse bind` matrices.
    pub fn joint_matrices(&self) -> &[Mat4] {
        match &self.buffer {
            Some(buffer) => &buffer.buffer.items,
            None => &self.items,
        }
    }
}

impl RenderNode for SkinNode {
    fn id(&self) -> usize {
        self.id
    }

    fn update(
        &mut self,
        local_context: &LocalContext,
        global_context: &mut GlobalContext,
        invalid: bool,
    ) {
        if let Some(joints) = global_context.updated_joints().get(&self.data.id) {
            let items = match &mut self.buffer {
                Some(buffer) => &mut buffer.buffer.items,
                None => &mut self.items,
            };
            for (index, matrix) in joints {
                let Some(inverse_bind) = self.data.inverse_bind_matrices.get(*index) else {
                    warn!("Joint #{} out of range for skin #{}", index, self.data.id);
                    continue;
                };
                if items.len() <= *index {
                    items.resize(*index + 1, Mat4::IDENTITY);
                }
                items[*index] = *matrix * *inverse_bind;
            }
            self.invalid = true;
        }
        self.node.update(local_context, global_context, invalid);
    }

    fn prepare(&mut self, device: &Device, queue: &Queue, renderer_state: &mut RendererState) {
        if let Some(buffer) = &mut self.buffer {
            if self.invalid {
                buffer.buffer.update(queue);
            }
        } else {
            let items = mem::take(&mut self.items);
            let buffer = SkinUniformBuffer::new(device, items);
            let bind_group = device.create_bind_group(&BindGroupDescriptor {
                label: Some("Skin Bind Group"),
                layout: renderer_state.bind_group_layout().joint_layout(),
                entries: &[BindGroupEntry {
                    binding: 0,
                    resource: buffer.buffer().as_entire_binding(),
                }],
            });
            self.buffer = Some(SkinBuffer { buffer, bind_group });
        }
        self.invalid = false;
        self.node.prepare(device, queue, renderer_state);
    }

    fn draw<'a>(
        &'a self,
        renderer_state: &'a RendererState,
        ongoing_state: &mut OngoingRenderState<'a>,
    ) {
        if let Some(buffer) = &self.buffer {
            ongoing_state.set_joint(Some(&buffer.bind_group));
            self.node.draw(renderer_state, ongoing_state);
            ongoing_state.set_joint(None);
        } else {
            warn!("No bind group for SkinNode #{}, skip drawing.", self.id);
            warn!("Did you call prepare() before drawing skin node?");
        }
    }
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use crate::renderer::{
        context::DEFAULT_LOCAL_CONTEXT,
        node::{group::GroupNode, joint::JointNode, transform::TransformNode},
    };
    use crate::asset::node::DecomposedTransform;

    use super::*;

    #[test]
    fn joint_world_times_inverse_bind_reaches_skin() {
        let bind = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let data = Arc::new(SkinData::new(vec![bind.inverse()]));

        let joint = JointNode::new(
            vec![(data.id, 0)],
            RenderNodeItem::Group(Box::new(GroupNode::new(None))),
        );
        let joint_transform = TransformNode::from_decomposed_transform(
            DecomposedTransform {
                translation: Vec3::new(1.0, 2.0, 0.0),
                ..Default::default()
            },
            RenderNodeItem::Joint(Box::new(joint)),
        );
        let skin = SkinNode::new(
            data.clone(),
            RenderNodeItem::Group(Box::new(GroupNode::new(None))),
        );
        let skin_id = skin.id();

        // Joints are placed before skinned nodes, the way the asset loader lays them out
        let mut root = GroupNode::new(None);
        root.push(RenderNodeItem::Transform(Box::new(joint_transform)));
        root.push(RenderNodeItem::Skin(Box::new(skin)));

        let mut global_context = GlobalContext::default();
        root.update(&DEFAULT_LOCAL_CONTEXT, &mut global_context, false);

        let skin = root
            .iter()
            .find_map(|item| match item {
                RenderNodeItem::Skin(skin) if skin.id() == skin_id => Some(skin),
                _ => None,
            })
            .unwrap();
        let moved = skin.joint_matrices()[0].transform_point3(Vec3::new(0.0, 2.0, 0.0));
        // The bind pose point follows the joint's extra X offset
        assert!((moved - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn skin_starts_with_identity_matrices() {
        let data = Arc::new(SkinData::new(vec![Mat4::IDENTITY; 3]));
        let skin = SkinNode::new(data, RenderNodeItem::Group(Box::default()));
        assert_eq!(skin.joint_matrices(), &[Mat4::IDENTITY; 3]);
    }
}
