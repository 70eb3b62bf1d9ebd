use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureAssetId {
    // Image embedded in or referenced by a glTF document
    PathIndex(PathBuf, usize),
    Path(PathBuf),
}

impl Display for TextureAssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureAssetId::PathIndex(path, id) => write!(f, "{} #{}", path.to_string_lossy(), id),
            TextureAssetId::Path(path) => path.to_string_lossy().fmt(f),
        }
    }
}

impl From<&Path> for TextureAssetId {
    fn from(value: &Path) -> Self {
        TextureAssetId::Path(value.to_path_buf())
    }
}

/// Pixel layouts kept after decoding. Everything else is widened to one of
/// these since the GPU has no three-channel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureAssetFormat {
    Rgbau8,
    Rgbau16,
}

impl TextureAssetFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureAssetFormat::Rgbau8 => 4,
            TextureAssetFormat::Rgbau16 => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextureAsset {
    pub id: TextureAssetId,
    pub size: (u32, u32),
    pub format: TextureAssetFormat,
    pub data: Vec<u8>,
    pub sampler: SamplerAsset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureWrappingMode {
    #[default]
    ClampToEdge,
    MirroredRepeat,
    Repeat,
}

#[derive(Debug, Clone, Default)]
pub struct SamplerAsset {
    pub mag_filter: TextureFilter,
    pub min_filter: TextureFilter,
    pub mipmap_filter: TextureFilter,
    pub wrap_x: TextureWrappingMode,
    pub wrap_y: TextureWrappingMode,
}

impl SamplerAsset {
    pub fn repeat() -> Self {
        Self {
            wrap_x: TextureWrappingMode::Repeat,
            wrap_y: TextureWrappingMode::Repeat,
            ..Default::default()
        }
    }
}
