use std::sync::Arc;

use super::texture::TextureAsset;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaterialAlphaMode {
    #[default]
    Opaque,
    Blend,
}

#[derive(Debug, Clone)]
pub struct MaterialAsset {
    pub name: Option<String>,
    pub diffuse_color: [f32; 4],
    pub diffuse_texture: Option<Arc<TextureAsset>>,
    pub alpha_mode: MaterialAlphaMode,
    pub double_sided: bool,
    /// Vertices are deformed by joints only when this is set, even if the
    /// primitive carries joint and weight attributes.
    pub skinning: bool,
}

impl Default for MaterialAsset {
    fn default() -> Self {
        Self {
            name: None,
            diffuse_color: [1.0, 1.0, 1.0, 1.0],
            diffuse_texture: None,
            alpha_mode: MaterialAlphaMode::Opaque,
            double_sided: false,
            skinning: false,
        }
    }
}
