use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use super::{index::AssetIndex, mesh::MeshAsset, skin::SkinAsset};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl DecomposedTransform {
    pub fn from_translation_scale(translation: Vec3, scale: f32) -> Self {
        Self {
            translation,
            scale: Vec3::splat(scale),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Matrix(Mat4),
    Decomposed(DecomposedTransform),
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Decomposed(DecomposedTransform::default())
    }
}

impl From<DecomposedTransform> for Mat4 {
    fn from(value: DecomposedTransform) -> Self {
        Mat4::from_scale_rotation_translation(value.scale, value.rotation, value.translation)
    }
}

impl From<NodeTransform> for Mat4 {
    fn from(value: NodeTransform) -> Self {
        match value {
            NodeTransform::Matrix(matrix) => matrix,
            NodeTransform::Decomposed(decomposed) => decomposed.into(),
        }
    }
}

impl From<NodeTransform> for DecomposedTransform {
    fn from(value: NodeTransform) -> Self {
        match value {
            NodeTransform::Matrix(matrix) => {
                let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
                DecomposedTransform {
                    translation,
                    rotation,
                    scale,
                }
            }
            NodeTransform::Decomposed(decomposed) => decomposed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeAsset {
    pub id: AssetIndex,
    pub name: Option<String>,
    pub children: Vec<NodeAsset>,
    pub skin: Option<Arc<SkinAsset>>,
    pub transform: Option<NodeTransform>,
    pub mesh: Option<MeshAsset>,
    /// Targeted by an animation channel, so it must stay a separate
    /// transform node at render time.
    pub has_animation: bool,
}

impl NodeAsset {
    pub fn new(id: AssetIndex) -> Self {
        Self {
            id,
            name: None,
            children: Vec::new(),
            skin: None,
            transform: None,
            mesh: None,
            has_animation: false,
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeAsset::count).sum::<usize>()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decomposed_to_matrix_applies_scale_then_rotation_then_translation() {
        let transform = DecomposedTransform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let matrix: Mat4 = transform.into();
        let point = matrix.transform_point3(Vec3::X);
        assert!((point - Vec3::new(1.0, 4.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn matrix_transform_decomposes_back() {
        let original = DecomposedTransform {
            translation: Vec3::new(0.0, -20.0, 0.0),
            rotation: Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(40.0),
        };
        let decomposed: DecomposedTransform =
            NodeTransform::Matrix(Mat4::from(original)).into();
        assert!((decomposed.translation - original.translation).length() < 1e-4);
        assert!((decomposed.scale - original.scale).length() < 1e-4);
        assert!(decomposed.rotation.angle_between(original.rotation) < 1e-4);
    }
}
