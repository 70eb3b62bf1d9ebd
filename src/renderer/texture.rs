use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindingResource, Device, Extent3d, FilterMode, ImageCopyTexture, ImageDataLayout, Origin3d,
    Queue, Sampler, SamplerDescriptor, TextureAspect, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, TextureView, TextureViewDescriptor,
};

use crate::asset::texture::{TextureAsset, TextureAssetFormat, TextureFilter, TextureWrappingMode};

fn wrap_mode(wrap_mode: TextureWrappingMode) -> AddressMode {
    match wrap_mode {
        TextureWrappingMode::ClampToEdge => AddressMode::ClampToEdge,
        TextureWrappingMode::MirroredRepeat => AddressMode::MirrorRepeat,
        TextureWrappingMode::Repeat => AddressMode::Repeat,
    }
}

fn filter_mode(filter: TextureFilter) -> FilterMode {
    match filter {
        TextureFilter::Nearest => FilterMode::Nearest,
        TextureFilter::Linear => FilterMode::Linear,
    }
}

#[derive(Debug)]
pub struct TextureItem {
    id: String,
    texture_view: TextureView,
    sampler: Sampler,
}

impl TextureItem {
    fn upload(
        device: &Device,
        queue: &Queue,
        label: Option<&str>,
        size: (u32, u32),
        format: TextureFormat,
        bytes_per_pixel: u32,
        data: &[u8],
    ) -> TextureView {
        let size = Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_pixel * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );
        texture.create_view(&TextureViewDescriptor::default())
    }

    pub fn from_asset(device: &Device, queue: &Queue, asset: &TextureAsset) -> Self {
        let id = asset.id.to_string();
        let format = match asset.format {
            TextureAssetFormat::Rgbau8 => TextureFormat::Rgba8UnormSrgb,
            TextureAssetFormat::Rgbau16 => TextureFormat::Rgba16Unorm,
        };
        let texture_view = Self::upload(
            device,
            queue,
            Some(&id),
            asset.size,
            format,
            asset.format.bytes_per_pixel() as u32,
            &asset.data,
        );
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(&id),
            address_mode_u: wrap_mode(asset.sampler.wrap_x),
            address_mode_v: wrap_mode(asset.sampler.wrap_y),
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: filter_mode(asset.sampler.mag_filter),
            min_filter: filter_mode(asset.sampler.min_filter),
            mipmap_filter: filter_mode(asset.sampler.mipmap_filter),
            ..Default::default()
        });
        Self {
            id,
            texture_view,
            sampler,
        }
    }

    /// A single white pixel, bound where a pipeline layout expects a texture
    /// but the material has none.
    pub fn empty(device: &Device, queue: &Queue) -> Self {
        let id = "Empty Texture".to_string();
        let texture_view = Self::upload(
            device,
            queue,
            Some(&id),
            (1, 1),
            TextureFormat::Rgba8UnormSrgb,
            4,
            &[u8::MAX; 4],
        );
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(&id),
            ..Default::default()
        });
        Self {
            id,
            texture_view,
            sampler,
        }
    }

    pub fn create_bind_group(
        &self,
        device: &Device,
        bind_group_layout: &BindGroupLayout,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            layout: bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&self.texture_view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some(&self.id),
        })
    }
}
