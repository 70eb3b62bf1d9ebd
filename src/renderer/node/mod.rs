use std::{
    fmt::Debug,
    sync::atomic::{AtomicUsize, Ordering},
};

use group::GroupNode;
use joint::JointNode;
use light::LightNode;
use primitive::PrimitiveNode;
use skin::SkinNode;
use transform::TransformNode;
use wgpu::{Device, Queue};

use super::{
    context::{GlobalContext, LocalContext},
    OngoingRenderState, RendererState,
};

pub mod group;
pub mod joint;
pub mod light;
pub mod primitive;
pub mod skin;
pub mod transform;

static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn new_node_id() -> usize {
    ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

// A frame: update -> prepare -> draw
// Update: update node properties (such as transform)
// Prepare: calculate the final properties and send then to uniform
// Draw: do actual drawing
pub trait RenderNode {
    fn id(&self) -> usize;
    fn update(
        &mut self,
        _local_context: &LocalContext,
        _global_context: &mut GlobalContext,
        _invalid: bool,
    ) {
    }
    fn prepare(&mut self, _device: &Device, _queue: &Queue, _renderer_state: &mut RendererState) {}
    fn draw<'a>(
        &'a self,
        _renderer_state: &'a RendererState,
        _ongoing_state: &mut OngoingRenderState<'a>,
    ) {
    }
}

pub enum RenderNodeItem {
    Group(Box<GroupNode>),
    Primitive(Box<PrimitiveNode>),
    Transform(Box<TransformNode>),
    Joint(Box<JointNode>),
    Skin(Box<SkinNode>),
    Light(Box<LightNode>),
}

// Manually implement Debug to reduce a level of elements in debug tree
impl Debug for RenderNodeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderNodeItem::Group(group) => group.fmt(f),
            RenderNodeItem::Primitive(primitive) => primitive.fmt(f),
            RenderNodeItem::Transform(transform) => transform.fmt(f),
            RenderNodeItem::Joint(joint) => joint.fmt(f),
            RenderNodeItem::Skin(skin) => skin.fmt(f),
            RenderNodeItem::Light(light) => light.fmt(f),
        }
    }
}

impl RenderNodeItem {
    /// Number of nodes in this subtree, this node included.
    pub fn count(&self) -> usize {
        1 + match self {
            RenderNodeItem::Group(group) => group.iter().map(RenderNodeItem::count).sum(),
            RenderNodeItem::Transform(transform) => transform.node.count(),
            RenderNodeItem::Joint(joint) => joint.node.count(),
            RenderNodeItem::Skin(skin) => skin.node.count(),
            RenderNodeItem::Primitive(_) | RenderNodeItem::Light(_) => 0,
        }
    }
}

impl RenderNode for RenderNodeItem {
    fn id(&self) -> usize {
        match self {
            RenderNodeItem::Group(group) => group.id(),
            RenderNodeItem::Primitive(primitive) => primitive.id(),
            RenderNodeItem::Transform(transform) => transform.id(),
            RenderNodeItem::Joint(joint) => joint.id(),
            RenderNodeItem::Skin(skin) => skin.id(),
            RenderNodeItem::Light(light) => light.id(),
        }
    }

    fn update(
        &mut self,
        local_context: &LocalContext,
        global_context: &mut GlobalContext,
        invalid: bool,
    ) {
        match self {
            RenderNodeItem::Group(group) => group.update(local_context, global_context, invalid),
            RenderNodeItem::Primitive(primitive) => {
                primitive.update(local_context, global_context, invalid)
            }
            RenderNodeItem::Transform(transform) => {
                transform.update(local_context, global_context, invalid)
            }
            RenderNodeItem::Joint(joint) => joint.update(local_context, global_context, invalid),
            RenderNodeItem::Skin(skin) => skin.update(local_context, global_context, invalid),
            RenderNodeItem::Light(light) => light.update(local_context, global_context, invalid),
        }
    }

    fn prepare(&mut self, device: &Device, queue: &Queue, renderer_state: &mut RendererState) {
        match self {
            RenderNodeItem::Group(group) => group.prepare(device, queue, renderer_state),
            RenderNodeItem::Primitive(primitive) => {
                primitive.prepare(device, queue, renderer_state)
            }
            RenderNodeItem::Transform(transform) => {
                transform.prepare(device, queue, renderer_state)
            }
            RenderNodeItem::Joint(joint) => joint.prepare(device, queue, renderer_state),
            RenderNodeItem::Skin(skin) => skin.prepare(device, queue, renderer_state),
            RenderNodeItem::Light(light) => light.prepare(device, queue, renderer_state),
        }
    }

    fn draw<'a>(
        &'a self,
        renderer_state: &'a RendererState,
        ongoing_state: &mut OngoingRenderState<'a>,
    ) {
        match self {
            RenderNodeItem::Group(group) => group.draw(renderer_state, ongoing_state),
            RenderNodeItem::Primitive(primitive) => primitive.draw(renderer_state, ongoing_state),
            RenderNodeItem::Transform(transform) => transform.draw(renderer_state, ongoing_state),
            RenderNodeItem::Joint(joint) => joint.draw(renderer_state, ongoing_state),
            RenderNodeItem::Skin(skin) => skin.draw(renderer_state, ongoing_state),
            RenderNodeItem::Light(light) => light.draw(renderer_state, ongoing_state),
        }
    }
}
