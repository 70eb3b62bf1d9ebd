use std::{collections::HashMap, path::Path, sync::Arc};

use image::{DynamicImage, GenericImageView, ImageReader};
use log::debug;

use crate::asset::texture::{SamplerAsset, TextureAsset, TextureAssetFormat, TextureAssetId};

use super::ModelLoadError;

fn u16_to_bytes(data: Vec<u16>) -> Vec<u8> {
    data.into_iter().flat_map(|item| item.to_le_bytes()).collect()
}

/// Decodes images into one of the two layouts the renderer uploads, caching
/// by id so materials sharing an image share the asset.
#[derive(Default)]
pub struct TextureLoader {
    texture_cache: HashMap<TextureAssetId, Arc<TextureAsset>>,
}

impl TextureLoader {
    pub fn load_image(
        &mut self,
        id: TextureAssetId,
        image: DynamicImage,
        sampler: SamplerAsset,
    ) -> Arc<TextureAsset> {
        if let Some(texture) = self.texture_cache.get(&id) {
            return texture.clone();
        }

        let dimensions = image.dimensions();
        let (data, format) = match image {
            DynamicImage::ImageRgba8(image) => (image.into_vec(), TextureAssetFormat::Rgbau8),
            DynamicImage::ImageRgba16(image) => {
                (u16_to_bytes(image.into_vec()), TextureAssetFormat::Rgbau16)
            }
            DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb32F(_)
            | DynamicImage::ImageRgba32F(_) => (
                u16_to_bytes(image.into_rgba16().into_vec()),
                TextureAssetFormat::Rgbau16,
            ),
            _ => (image.into_rgba8().into_vec(), TextureAssetFormat::Rgbau8),
        };

        let texture = Arc::new(TextureAsset {
            id: id.clone(),
            size: dimensions,
            format,
            data,
            sampler,
        });
        self.texture_cache.insert(id, texture.clone());
        texture
    }

    pub fn load_from_path(
        &mut self,
        path: &Path,
        sampler: SamplerAsset,
    ) -> Result<Arc<TextureAsset>, ModelLoadError> {
        let id = TextureAssetId::from(path);
        if let Some(texture) = self.texture_cache.get(&id) {
            return Ok(texture.clone());
        }
        debug!("Loading texture {}", path.display());
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(self.load_image(id, image, sampler))
    }
}

#[cfg(test)]
mod test {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn rgb_is_widened_to_rgba() {
        let mut loader = TextureLoader::default();
        let image = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        let texture = loader.load_image(
            TextureAssetId::Path("a.png".into()),
            DynamicImage::ImageRgb8(image),
            SamplerAsset::default(),
        );
        assert_eq!(texture.size, (2, 1));
        assert_eq!(texture.format, TextureAssetFormat::Rgbau8);
        assert_eq!(texture.data, vec![10, 20, 30, 255, 10, 20, 30, 255]);
    }

    #[test]
    fn same_id_is_cached() {
        let mut loader = TextureLoader::default();
        let id = TextureAssetId::Path("a.png".into());
        let first = loader.load_image(
            id.clone(),
            DynamicImage::ImageRgb8(RgbImage::new(1, 1)),
            SamplerAsset::default(),
        );
        let second = loader.load_image(
            id,
            DynamicImage::ImageRgb8(RgbImage::new(4, 4)),
            SamplerAsset::default(),
        );
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut loader = TextureLoader::default();
        let result = loader.load_from_path(
            Path::new("/nonexistent/texture.png"),
            SamplerAsset::default(),
        );
        assert!(matches!(result, Err(ModelLoadError::Io(_))));
    }
}
