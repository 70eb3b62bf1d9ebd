use wgpu::{
    Device, Extent3d, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
    TextureView, TextureViewDescriptor,
};

pub const DEPTH_TEXTURE_FORMAT: TextureFormat = TextureFormat::Depth32Float;

fn create_attachment(
    device: &Device,
    label: &str,
    size: (u32, u32),
    format: TextureFormat,
    sample_count: u32,
) -> TextureView {
    let size = Extent3d {
        width: size.0.max(1),
        height: size.1.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&TextureViewDescriptor::default())
}

#[derive(Debug)]
pub struct DepthTexture {
    texture_view: TextureView,
}

impl DepthTexture {
    pub fn new(device: &Device, size: (u32, u32), sample_count: u32) -> Self {
        let texture_view = create_attachment(
            device,
            "Depth Texture",
            size,
            DEPTH_TEXTURE_FORMAT,
            sample_count,
        );
        Self { texture_view }
    }

    pub fn texture_view(&self) -> &TextureView {
        &self.texture_view
    }
}

/// Multisampled color target resolved into the surface texture.
#[derive(Debug)]
pub struct MultisampleTexture {
    texture_view: TextureView,
}

impl MultisampleTexture {
    pub fn new(device: &Device, size: (u32, u32), format: TextureFormat, sample_count: u32) -> Self {
        let texture_view =
            create_attachment(device, "Multisample Texture", size, format, sample_count);
        Self { texture_view }
    }

    pub fn texture_view(&self) -> &TextureView {
        &self.texture_view
    }
}
