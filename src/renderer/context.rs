use std::collections::BTreeMap;

use glam::Mat4;
use log::warn;

use super::node::light::LightData;

pub static DEFAULT_LOCAL_CONTEXT: LocalContext = LocalContext {
    transform: Mat4::IDENTITY,
};

#[derive(Debug, Clone)]
pub struct LocalContext {
    transform: Mat4,
}

impl Default for LocalContext {
    fn default() -> Self {
        DEFAULT_LOCAL_CONTEXT.clone()
    }
}

impl LocalContext {
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn add_transform(&self, transform: &Mat4) -> Self {
        Self {
            transform: self.transform * (*transform),
        }
    }
}

/// Data collected from the whole tree during one update pass.
#[derive(Debug, Default)]
pub struct GlobalContext {
    // skin id -> joint index -> joint world matrix
    updated_joints: BTreeMap<usize, BTreeMap<usize, Mat4>>,
    lights: Vec<LightData>,
}

impl GlobalContext {
    pub fn update_joint(&mut self, skin: usize, joint_index: usize, matrix: Mat4) {
        let skin_map = self.updated_joints.entry(skin).or_default();
        if skin_map.insert(joint_index, matrix).is_some() {
            warn!(
                "Joint #{} of skin #{} is already set in global context",
                joint_index, skin
            );
        }
    }

    pub fn updated_joints(&self) -> &BTreeMap<usize, BTreeMap<usize, Mat4>> {
        &self.updated_joints
    }

    pub fn add_light(&mut self, data: LightData) {
        self.lights.push(data);
    }

    pub fn lights(&self) -> &[LightData] {
        &self.lights
    }

    pub fn finish(self) -> Vec<LightData> {
        self.lights
    }
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use super::*;

    #[test]
    fn add_transform_composes_parent_first() {
        let parent = LocalContext::default()
            .add_transform(&Mat4::from_translation(Vec3::new(0.0, -20.0, 0.0)));
        let child = parent.add_transform(&Mat4::from_scale(Vec3::splat(40.0)));
        let point = child.transform().transform_point3(Vec3::ONE);
        assert!((point - Vec3::new(40.0, 20.0, 40.0)).length() < 1e-5);
    }

    #[test]
    fn update_joint_keeps_latest_value() {
        let mut context = GlobalContext::default();
        context.update_joint(3, 1, Mat4::IDENTITY);
        context.update_joint(3, 1, Mat4::from_scale(Vec3::splat(2.0)));
        let joints = &context.updated_joints()[&3];
        assert_eq!(joints.len(), 1);
        assert_eq!(joints[&1], Mat4::from_scale(Vec3::splat(2.0)));
    }
}
