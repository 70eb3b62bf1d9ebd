use glam::Vec3;

use crate::renderer::context::{GlobalContext, LocalContext};

use super::{new_node_id, RenderNode};

/// Light contribution collected into the global context each update.
#[derive(Debug, Clone, PartialEq)]
pub enum LightData {
    Ambient {
        color: Vec3,
    },
    Parallel {
        // Direction the light travels in world space
        direction: Vec3,
        color: Vec3,
        strength: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightParam {
    Ambient {
        color: Vec3,
    },
    // Direction is taken from the node's rotation applied to -Z
    Parallel {
        color: Vec3,
        strength: f32,
    },
}

#[derive(Debug)]
pub struct LightNode {
    id: usize,
    param: LightParam,
}

impl LightNode {
    pub fn new(param: LightParam) -> Self {
        Self {
            id: new_node_id(),
            param,
        }
    }

    pub fn param(&self) -> &LightParam {
        &self.param
    }
}

impl RenderNode for LightNode {
    fn id(&self) -> usize {
        self.id
    }

    fn update(
        &mut self,
        local_context: &LocalContext,
        global_context: &mut GlobalContext,
        _invalid: bool,
    ) {
        let light_data = match self.param {
            LightParam::Ambient { color } => LightData::Ambient { color },
            LightParam::Parallel { color, strength } => LightData::Parallel {
                direction: local_context
                    .transform()
                    .transform_vector3(Vec3::NEG_Z)
                    .normalize_or_zero(),
                color,
                strength,
            },
        };
        global_context.add_light(light_data);
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Quat};

    use crate::renderer::context::DEFAULT_LOCAL_CONTEXT;

    use super::*;

    #[test]
    fn parallel_light_direction_follows_rotation() {
        let mut node = LightNode::new(LightParam::Parallel {
            color: Vec3::ONE,
            strength: 0.5,
        });
        let context = DEFAULT_LOCAL_CONTEXT.add_transform(&Mat4::from_quat(
            Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
        ));
        let mut global_context = GlobalContext::default();
        node.update(&context, &mut global_context, false);
        let LightData::Parallel { direction, .. } = &global_context.lights()[0] else {
            panic!("expected a parallel light");
        };
        // -Z rotated -90 degrees about X points down
        assert!((*direction - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn ambient_light_is_collected_every_update() {
        let mut node = LightNode::new(LightParam::Ambient { color: Vec3::ONE });
        let mut global_context = GlobalContext::default();
        node.update(&DEFAULT_LOCAL_CONTEXT, &mut global_context, false);
        node.update(&DEFAULT_LOCAL_CONTEXT, &mut global_context, false);
        assert_eq!(global_context.finish().len(), 2);
    }
}
