use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use image::ImageError;

use super::{animation::AnimationAsset, scene::SceneAsset};

pub mod dae;
pub mod gltf;
pub mod json;
pub mod texture;

#[derive(Debug)]
pub enum ModelLoadError {
    Io(io::Error),
    Json(serde_json::Error),
    Gltf(::gltf::Error),
    Collada(String),
    Texture(ImageError),
    // The file parsed but its content is malformed
    Format(String),
    Panicked(String),
}

impl Display for ModelLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ModelLoadError::Io(err) => write!(f, "I/O error: {}", err),
            ModelLoadError::Json(err) => write!(f, "Bad JSON model: {}", err),
            ModelLoadError::Gltf(err) => write!(f, "Bad glTF model: {}", err),
            ModelLoadError::Collada(err) => write!(f, "Bad Collada document: {}", err),
            ModelLoadError::Texture(err) => write!(f, "Bad texture: {}", err),
            ModelLoadError::Format(err) => write!(f, "Malformed model: {}", err),
            ModelLoadError::Panicked(err) => write!(f, "Loader crashed: {}", err),
        }
    }
}

impl Error for ModelLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModelLoadError::Io(err) => Some(err),
            ModelLoadError::Json(err) => Some(err),
            ModelLoadError::Gltf(err) => Some(err),
            ModelLoadError::Texture(err) => Some(err),
            ModelLoadError::Collada(_)
            | ModelLoadError::Format(_)
            | ModelLoadError::Panicked(_) => None,
        }
    }
}

impl From<io::Error> for ModelLoadError {
    fn from(value: io::Error) -> Self {
        ModelLoadError::Io(value)
    }
}

impl From<serde_json::Error> for ModelLoadError {
    fn from(value: serde_json::Error) -> Self {
        ModelLoadError::Json(value)
    }
}

impl From<::gltf::Error> for ModelLoadError {
    fn from(value: ::gltf::Error) -> Self {
        ModelLoadError::Gltf(value)
    }
}

impl From<ImageError> for ModelLoadError {
    fn from(value: ImageError) -> Self {
        ModelLoadError::Texture(value)
    }
}

/// Everything read from one model file.
#[derive(Debug, Clone, Default)]
pub struct LoadedModel {
    pub path: PathBuf,
    pub scenes: Vec<SceneAsset>,
    pub animations: Vec<AnimationAsset>,
}

impl LoadedModel {
    pub fn new(path: &Path, scenes: Vec<SceneAsset>, animations: Vec<AnimationAsset>) -> Self {
        Self {
            path: path.to_path_buf(),
            scenes,
            animations,
        }
    }

    pub fn node_count(&self) -> usize {
        self.scenes.iter().map(SceneAsset::node_count).sum()
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Marks every material as deformed by joints.
    pub fn set_skinning(&mut self) {
        for scene in &mut self.scenes {
            scene.for_each_node_mut(|node| {
                let Some(mesh) = &mut node.mesh else {
                    return;
                };
                for primitive in &mut mesh.primitives {
                    if let Some(material) = &mut primitive.material {
                        Arc::make_mut(material).skinning = true;
                    }
                }
            });
        }
    }

    /// Number of primitives carrying joint weights.
    pub fn skinned_primitive_count(&self) -> usize {
        self.scenes
            .iter()
            .flat_map(|scene| scene.skinned_nodes.iter())
            .filter_map(|node| node.mesh.as_ref())
            .flat_map(|mesh| mesh.primitives.iter())
            .filter(|primitive| primitive.skin.is_some())
            .count()
    }
}

fn pad_color_vec3_to_vec4(color: [f32; 3]) -> [f32; 4] {
    [color[0], color[1], color[2], 1.0]
}

pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Colors in model files are authored in sRGB, shading happens in linear space.
fn srgb_color_to_linear(color: [f32; 3]) -> [f32; 3] {
    color.map(srgb_to_linear)
}

#[cfg(test)]
mod test {
    use crate::asset::{
        material::MaterialAsset,
        mesh::MeshAsset,
        node::NodeAsset,
        index::AssetIndex,
        primitive::{PrimitiveAsset, PrimitiveAssetMode},
    };

    use super::*;

    #[test]
    fn srgb_endpoints_are_kept() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((srgb_to_linear(0.5) - 0.214).abs() < 1e-3);
    }

    #[test]
    fn set_skinning_marks_shared_materials() {
        let material = Arc::new(MaterialAsset::default());
        let primitive = PrimitiveAsset {
            name: None,
            positions: vec![[0.0; 3]; 3],
            normals: None,
            tex_coords: None,
            vertex_color: None,
            skin: None,
            indices: None,
            material: Some(material.clone()),
            mode: PrimitiveAssetMode::TriangleList,
        };
        let mut node = NodeAsset::new(AssetIndex::from_index("girl.json", 0));
        node.mesh = Some(MeshAsset {
            name: None,
            primitives: vec![primitive],
        });
        let mut model = LoadedModel::new(
            Path::new("girl.json"),
            vec![SceneAsset {
                nodes: vec![node],
                ..Default::default()
            }],
            Vec::new(),
        );
        model.set_skinning();

        let node = &model.scenes[0].nodes[0];
        let primitive = &node.mesh.as_ref().unwrap().primitives[0];
        assert!(primitive.material.as_ref().unwrap().skinning);
        assert!(!material.skinning);
        assert_eq!(model.name(), "girl.json");
    }
}
