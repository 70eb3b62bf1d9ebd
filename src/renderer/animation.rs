use std::fmt::{self, Display, Formatter};

use log::{trace, warn};

use crate::asset::animation::AnimationSampler;

use super::node::{group::GroupNode, new_node_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    Once,
    #[default]
    Repeat,
    // Forward then backward
    PingPong,
}

impl Display for PlaybackMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Once => write!(f, "Once"),
            PlaybackMode::Repeat => write!(f, "Repeat"),
            PlaybackMode::PingPong => write!(f, "Ping-pong"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AnimationState {
    #[default]
    Stopped,
    Playing {
        mode: PlaybackMode,
        // Seconds since the clip started
        time: f32,
    },
}

impl AnimationState {
    pub fn play(mode: PlaybackMode) -> Self {
        AnimationState::Playing { mode, time: 0.0 }
    }
}

/// Maps time since start to a position inside a clip of `length` seconds.
/// Returns `None` once a non-repeating clip has run past its end.
pub fn sample_time(mode: PlaybackMode, time: f32, length: f32) -> Option<f32> {
    if length <= 0.0 {
        return match mode {
            PlaybackMode::Once if time > 0.0 => None,
            _ => Some(0.0),
        };
    }
    let time = time.max(0.0);
    match mode {
        PlaybackMode::Once => (time <= length).then_some(time),
        PlaybackMode::Repeat => Some(time % length),
        PlaybackMode::PingPong => {
            let progress = time % (2.0 * length);
            Some(if progress > length {
                2.0 * length - progress
            } else {
                progress
            })
        }
    }
}

#[derive(Debug)]
pub struct AnimationNode {
    id: usize,
    target_node: usize,
    sampler: AnimationSampler,
    length: f32,
}

impl AnimationNode {
    pub fn new(target_node: usize, sampler: AnimationSampler, length: f32) -> Self {
        Self {
            id: new_node_id(),
            target_node,
            sampler,
            length,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn target_node(&self) -> usize {
        self.target_node
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn sampler(&self) -> &AnimationSampler {
        &self.sampler
    }

    pub fn update(&self, node_tree: &mut GroupNode, time: f32) {
        let Some(node) = node_tree.find_transform_node_mut(self.target_node) else {
            warn!("Target node to be animated not found: #{}", self.target_node);
            return;
        };

        let mut transform = *node.transform();
        match &self.sampler {
            AnimationSampler::Rotation(keyframes) => match keyframes.sample(time) {
                Some(rotation) => transform.rotation = rotation.normalize(),
                None => return,
            },
            AnimationSampler::Translation(keyframes) => match keyframes.sample(time) {
                Some(translation) => transform.translation = translation,
                None => return,
            },
            AnimationSampler::Scale(keyframes) => match keyframes.sample(time) {
                Some(scale) => transform.scale = scale,
                None => return,
            },
        }
        node.set_transform(transform);
    }
}

/// One clip: channels advanced together by the frame delta.
#[derive(Debug)]
pub struct AnimationGroupNode {
    id: usize,
    nodes: Vec<AnimationNode>,
    length: f32,
    state: AnimationState,
    label: Option<String>,
}

impl AnimationGroupNode {
    pub fn new(nodes: Vec<AnimationNode>, length: f32, label: Option<String>) -> Self {
        Self {
            id: new_node_id(),
            nodes,
            length,
            state: AnimationState::Stopped,
            label,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_state(&mut self, state: AnimationState) {
        self.state = state;
    }

    pub fn nodes(&self) -> &[AnimationNode] {
        &self.nodes
    }

    /// Moves playback forward by `delta` seconds and poses the target nodes.
    pub fn advance(&mut self, node_tree: &mut GroupNode, delta: f32) {
        let AnimationState::Playing { mode, time } = self.state else {
            return;
        };
        let time = time + delta.max(0.0);
        let sample = match sample_time(mode, time, self.length) {
            Some(sample) => {
                self.state = AnimationState::Playing { mode, time };
                sample
            }
            None => {
                // Leave the clip on its last pose
                self.state = AnimationState::Stopped;
                self.length
            }
        };
        trace!("Animate #{} time: {:#.03}s", self.id, sample);
        self.nodes
            .iter()
            .for_each(|node| node.update(node_tree, sample));
    }
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use crate::{
        asset::animation::{AnimationKeyFrame, AnimationKeyFrames},
        renderer::node::{transform::TransformNode, RenderNode, RenderNodeItem},
    };

    use super::*;

    #[test]
    fn once_stops_after_length() {
        assert_eq!(sample_time(PlaybackMode::Once, 0.5, 2.0), Some(0.5));
        assert_eq!(sample_time(PlaybackMode::Once, 2.0, 2.0), Some(2.0));
        assert_eq!(sample_time(PlaybackMode::Once, 2.1, 2.0), None);
    }

    #[test]
    fn repeat_wraps_around() {
        let sample = sample_time(PlaybackMode::Repeat, 5.5, 2.0).unwrap();
        assert!((sample - 1.5).abs() < 1e-6);
    }

    #[test]
    fn ping_pong_plays_backward() {
        let forward = sample_time(PlaybackMode::PingPong, 1.5, 2.0).unwrap();
        assert!((forward - 1.5).abs() < 1e-6);
        let backward = sample_time(PlaybackMode::PingPong, 2.5, 2.0).unwrap();
        assert!((backward - 1.5).abs() < 1e-6);
        let again = sample_time(PlaybackMode::PingPong, 4.5, 2.0).unwrap();
        assert!((again - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_length_samples_start() {
        assert_eq!(sample_time(PlaybackMode::Repeat, 3.0, 0.0), Some(0.0));
        assert_eq!(sample_time(PlaybackMode::PingPong, 3.0, 0.0), Some(0.0));
        assert_eq!(sample_time(PlaybackMode::Once, 0.0, 0.0), Some(0.0));
        assert_eq!(sample_time(PlaybackMode::Once, 0.1, 0.0), None);
    }

    fn translation_group(target: usize) -> AnimationGroupNode {
        let sampler = AnimationSampler::Translation(AnimationKeyFrames::Linear(vec![
            AnimationKeyFrame {
                time: 0.0,
                value: Vec3::ZERO,
            },
            AnimationKeyFrame {
                time: 1.0,
                value: Vec3::new(10.0, 0.0, 0.0),
            },
        ]));
        AnimationGroupNode::new(
            vec![AnimationNode::new(target, sampler, 1.0)],
            1.0,
            Some("move".to_string()),
        )
    }

    #[test]
    fn advance_poses_target_by_accumulated_delta() {
        let transform = TransformNode::new(RenderNodeItem::Group(Box::default()));
        let target = transform.id();
        let mut root = GroupNode::new(None);
        root.push(RenderNodeItem::Transform(Box::new(transform)));

        let mut group = translation_group(target);
        group.advance(&mut root, 0.5);
        let node = root.find_transform_node_mut(target).unwrap();
        assert_eq!(node.transform().translation, Vec3::ZERO);

        group.set_state(AnimationState::play(PlaybackMode::Repeat));
        group.advance(&mut root, 0.25);
        group.advance(&mut root, 0.25);
        let node = root.find_transform_node_mut(target).unwrap();
        assert!((node.transform().translation.x - 5.0).abs() < 1e-5);
    }

    #[test]
    fn once_ends_on_last_pose() {
        let transform = TransformNode::new(RenderNodeItem::Group(Box::default()));
        let target = transform.id();
        let mut root = GroupNode::new(None);
        root.push(RenderNodeItem::Transform(Box::new(transform)));

        let mut group = translation_group(target);
        group.set_state(AnimationState::play(PlaybackMode::Once));
        group.advance(&mut root, 3.0);
        assert_eq!(*group.state(), AnimationState::Stopped);
        let node = root.find_transform_node_mut(target).unwrap();
        assert!((node.transform().translation.x - 10.0).abs() < 1e-5);
    }
}
