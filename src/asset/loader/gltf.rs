use std::{
    collections::BTreeSet,
    fmt::Debug,
    iter,
    path::{Path, PathBuf},
    sync::Arc,
};

use glam::{Mat4, Quat, Vec3};
use gltf::{
    animation::{util::ReadOutputs, Interpolation},
    image::Format,
    material::AlphaMode,
    mesh::Mode,
    scene::Transform,
    texture::{MagFilter, MinFilter, WrappingMode},
    Animation, Document, Material, Mesh, Node, Primitive, Scene, Skin, Texture,
};
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, Luma, LumaA, Rgb, Rgb32FImage, RgbImage,
    Rgba, Rgba32FImage, RgbaImage,
};
use log::{info, warn};

use crate::asset::{
    animation::{
        AnimationAsset, AnimationChannelAsset, AnimationKeyFrame, AnimationKeyFrames,
        AnimationSampler,
    },
    index::AssetIndex,
    material::{MaterialAlphaMode, MaterialAsset},
    mesh::MeshAsset,
    node::{DecomposedTransform, NodeAsset, NodeTransform},
    primitive::{PrimitiveAsset, PrimitiveAssetMode, PrimitiveSkin},
    scene::SceneAsset,
    skin::SkinAsset,
    texture::{SamplerAsset, TextureAsset, TextureAssetId, TextureFilter, TextureWrappingMode},
};

use super::{texture::TextureLoader, LoadedModel, ModelLoadError};

fn load_texture_sampler(sampler: gltf::texture::Sampler) -> SamplerAsset {
    let (min_filter, mipmap_filter) = match sampler.min_filter() {
        Some(MinFilter::Nearest) => (TextureFilter::Nearest, TextureFilter::default()),
        Some(MinFilter::Linear) | None => (TextureFilter::Linear, TextureFilter::default()),
        Some(MinFilter::NearestMipmapNearest) => (TextureFilter::Nearest, TextureFilter::Nearest),
        Some(MinFilter::LinearMipmapNearest) => (TextureFilter::Linear, TextureFilter::Nearest),
        Some(MinFilter::NearestMipmapLinear) => (TextureFilter::Nearest, TextureFilter::Linear),
        Some(MinFilter::LinearMipmapLinear) => (TextureFilter::Linear, TextureFilter::Linear),
    };

    fn wrapping_mode(mode: WrappingMode) -> TextureWrappingMode {
        match mode {
            WrappingMode::ClampToEdge => TextureWrappingMode::ClampToEdge,
            WrappingMode::MirroredRepeat => TextureWrappingMode::MirroredRepeat,
            WrappingMode::Repeat => TextureWrappingMode::Repeat,
        }
    }

    SamplerAsset {
        mag_filter: match sampler.mag_filter() {
            Some(MagFilter::Nearest) => TextureFilter::Nearest,
            Some(MagFilter::Linear) | None => TextureFilter::Linear,
        },
        min_filter,
        mipmap_filter,
        wrap_x: wrapping_mode(sampler.wrap_s()),
        wrap_y: wrapping_mode(sampler.wrap_t()),
    }
}

fn u16_pixels(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect()
}

fn f32_pixels(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn decode_image(data: &gltf::image::Data) -> Option<DynamicImage> {
    let (width, height) = (data.width, data.height);
    let pixels = data.pixels.clone();
    let image = match data.format {
        Format::R8 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, pixels)?),
        Format::R8G8 => {
            DynamicImage::ImageLumaA8(GrayAlphaImage::from_raw(width, height, pixels)?)
        }
        Format::R8G8B8 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels)?),
        Format::R8G8B8A8 => DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, pixels)?),
        Format::R16 => DynamicImage::ImageLuma16(ImageBuffer::<Luma<u16>, _>::from_raw(
            width,
            height,
            u16_pixels(&pixels),
        )?),
        Format::R16G16 => DynamicImage::ImageLumaA16(ImageBuffer::<LumaA<u16>, _>::from_raw(
            width,
            height,
            u16_pixels(&pixels),
        )?),
        Format::R16G16B16 => DynamicImage::ImageRgb16(ImageBuffer::<Rgb<u16>, _>::from_raw(
            width,
            height,
            u16_pixels(&pixels),
        )?),
        Format::R16G16B16A16 => DynamicImage::ImageRgba16(
            ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, u16_pixels(&pixels))?,
        ),
        Format::R32G32B32FLOAT => {
            DynamicImage::ImageRgb32F(Rgb32FImage::from_raw(width, height, f32_pixels(&pixels))?)
        }
        Format::R32G32B32A32FLOAT => DynamicImage::ImageRgba32F(Rgba32FImage::from_raw(
            width,
            height,
            f32_pixels(&pixels),
        )?),
    };
    Some(image)
}

struct GltfDocumentLoader<'a> {
    path: PathBuf,
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    texture_loader: TextureLoader,
    animated_nodes: BTreeSet<usize>,
}

impl<'a> GltfDocumentLoader<'a> {
    fn new(
        path: &Path,
        buffers: &'a [gltf::buffer::Data],
        images: &'a [gltf::image::Data],
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            buffers,
            images,
            texture_loader: TextureLoader::default(),
            animated_nodes: BTreeSet::new(),
        }
    }

    fn node_id(&self, index: usize) -> AssetIndex {
        AssetIndex::from_index(&self.path, index)
    }

    fn load_texture(&mut self, texture: Texture) -> Option<Arc<TextureAsset>> {
        let sampler = load_texture_sampler(texture.sampler());
        let index = texture.source().index();
        let id = TextureAssetId::PathIndex(self.path.clone(), index);
        let Some(image) = self.images.get(index).and_then(decode_image) else {
            warn!("Image {} is missing or has a bad size, skipped.", id);
            return None;
        };
        Some(self.texture_loader.load_image(id, image, sampler))
    }

    fn load_material(&mut self, material: Material, skinning: bool) -> MaterialAsset {
        let pbr = material.pbr_metallic_roughness();
        let diffuse_texture = pbr
            .base_color_texture()
            .and_then(|info| self.load_texture(info.texture()));
        let alpha_mode = match material.alpha_mode() {
            AlphaMode::Opaque => MaterialAlphaMode::Opaque,
            // Masked materials are drawn blended
            AlphaMode::Mask | AlphaMode::Blend => MaterialAlphaMode::Blend,
        };
        MaterialAsset {
            name: material.name().map(str::to_string),
            diffuse_color: pbr.base_color_factor(),
            diffuse_texture,
            alpha_mode,
            double_sided: material.double_sided(),
            skinning,
        }
    }

    fn load_primitive(&mut self, primitive: Primitive) -> Result<PrimitiveAsset, ModelLoadError> {
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| ModelLoadError::Format("primitive without positions".to_string()))?
            .collect();
        let normals = reader.read_normals().map(|normals| normals.collect());
        let tex_coords = reader
            .read_tex_coords(0)
            .map(|coords| coords.into_f32().collect());
        let vertex_color = reader
            .read_colors(0)
            .map(|colors| colors.into_rgba_f32().collect());
        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect());
        let skin = match (reader.read_joints(0), reader.read_weights(0)) {
            (Some(joints), Some(weights)) => Some(PrimitiveSkin {
                joints: joints.into_u16().collect(),
                weights: weights.into_f32().collect(),
            }),
            _ => None,
        };

        let mode = match primitive.mode() {
            Mode::Points => PrimitiveAssetMode::Points,
            Mode::Lines => PrimitiveAssetMode::LineList,
            Mode::LineStrip => PrimitiveAssetMode::LineStrip,
            Mode::Triangles => PrimitiveAssetMode::TriangleList,
            Mode::TriangleStrip => PrimitiveAssetMode::TriangleStrip,
            mode => {
                return Err(ModelLoadError::Format(format!(
                    "unsupported primitive mode {:?}",
                    mode
                )))
            }
        };
        let material = self.load_material(primitive.material(), skin.is_some());

        Ok(PrimitiveAsset {
            name: None,
            positions,
            normals,
            tex_coords,
            vertex_color,
            skin,
            indices,
            material: Some(Arc::new(material)),
            mode,
        })
    }

    fn load_mesh(&mut self, mesh: Mesh) -> Result<MeshAsset, ModelLoadError> {
        let primitives = mesh
            .primitives()
            .map(|primitive| self.load_primitive(primitive))
            .collect::<Result<_, _>>()?;
        Ok(MeshAsset {
            name: mesh.name().map(str::to_string),
            primitives,
        })
    }

    fn load_skin(&self, skin: Skin) -> SkinAsset {
        let buffers = self.buffers;
        let joint_ids: Vec<AssetIndex> = skin
            .joints()
            .map(|joint| self.node_id(joint.index()))
            .collect();
        let inverse_bind_matrices = skin
            .reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]))
            .read_inverse_bind_matrices()
            .map(|matrices| {
                matrices
                    .map(|matrix| Mat4::from_cols_array_2d(&matrix))
                    .collect()
            })
            .unwrap_or_else(|| vec![Mat4::IDENTITY; joint_ids.len()]);
        SkinAsset {
            id: AssetIndex::from_name(&self.path, format!("skin {}", skin.index())),
            inverse_bind_matrices,
            joint_ids,
        }
    }

    fn load_node(
        &mut self,
        node: Node,
        scene: &mut SceneAsset,
    ) -> Result<NodeAsset, ModelLoadError> {
        let transform = match node.transform() {
            Transform::Matrix { matrix } => {
                NodeTransform::Matrix(Mat4::from_cols_array_2d(&matrix))
            }
            Transform::Decomposed {
                translation,
                rotation,
                scale,
            } => NodeTransform::Decomposed(DecomposedTransform {
                translation: Vec3::from_array(translation),
                rotation: Quat::from_array(rotation),
                scale: Vec3::from_array(scale),
            }),
        };

        let mut asset = NodeAsset::new(self.node_id(node.index()));
        asset.name = node.name().map(str::to_string);
        asset.transform = Some(transform);
        asset.has_animation = self.animated_nodes.contains(&node.index());
        asset.mesh = node.mesh().map(|mesh| self.load_mesh(mesh)).transpose()?;
        if let Some(skin) = node.skin() {
            let skin = Arc::new(self.load_skin(skin));
            scene.add_skin(skin.clone());
            asset.skin = Some(skin);
        }
        for child in node.children() {
            let child = self.load_node(child, scene)?;
            asset.children.push(child);
        }
        Ok(asset)
    }

    fn load_scene(&mut self, scene: Scene) -> Result<SceneAsset, ModelLoadError> {
        let mut asset = SceneAsset {
            name: scene.name().map(str::to_string),
            ..Default::default()
        };
        for node in scene.nodes() {
            let node = self.load_node(node, &mut asset)?;
            asset.nodes.push(node);
        }
        asset.split_skinned_nodes();
        Ok(asset)
    }

    fn load_animation(&mut self, animation: Animation) -> AnimationAsset {
        let buffers = self.buffers;
        let mut channels = Vec::new();
        for channel in animation.channels() {
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs())
            else {
                warn!("Animation channel without data, skipped.");
                continue;
            };
            let times: Vec<f32> = inputs.collect();
            let interpolation = channel.sampler().interpolation();
            let sampler = match outputs {
                ReadOutputs::Translations(values) => AnimationSampler::Translation(
                    keyframes(&times, values.map(Vec3::from_array).collect(), interpolation),
                ),
                ReadOutputs::Rotations(values) => AnimationSampler::Rotation(keyframes(
                    &times,
                    values.into_f32().map(Quat::from_array).collect(),
                    interpolation,
                )),
                ReadOutputs::Scales(values) => AnimationSampler::Scale(keyframes(
                    &times,
                    values.map(Vec3::from_array).collect(),
                    interpolation,
                )),
                ReadOutputs::MorphTargetWeights(_) => {
                    warn!("Morph target animation is not supported, skipped.");
                    continue;
                }
            };
            let target = channel.target().node().index();
            self.animated_nodes.insert(target);
            channels.push(AnimationChannelAsset {
                length: sampler.length(),
                sampler,
                target_id: self.node_id(target),
            });
        }
        AnimationAsset {
            name: animation.name().map(str::to_string),
            channels,
        }
    }

    fn load(&mut self, document: Document) -> Result<LoadedModel, ModelLoadError> {
        // Animations first, so nodes know whether they are animated
        let animations = document
            .animations()
            .map(|animation| self.load_animation(animation))
            .collect();
        let scenes = match document.default_scene() {
            Some(scene) => vec![self.load_scene(scene)?],
            None => document
                .scenes()
                .map(|scene| self.load_scene(scene))
                .collect::<Result<_, _>>()?,
        };
        Ok(LoadedModel::new(&self.path, scenes, animations))
    }
}

fn keyframes<T: Debug + Clone>(
    times: &[f32],
    values: Vec<T>,
    interpolation: Interpolation,
) -> AnimationKeyFrames<T> {
    match interpolation {
        Interpolation::Linear => AnimationKeyFrames::Linear(zip_keyframes(times, values)),
        Interpolation::Step => AnimationKeyFrames::Step(zip_keyframes(times, values)),
        Interpolation::CubicSpline => {
            let triples = values
                .chunks_exact(3)
                .map(|chunk| (chunk[0].clone(), chunk[1].clone(), chunk[2].clone()))
                .collect();
            AnimationKeyFrames::CubicSpline(zip_keyframes(times, triples))
        }
    }
}

fn zip_keyframes<T: Debug + Clone>(times: &[f32], values: Vec<T>) -> Vec<AnimationKeyFrame<T>> {
    iter::zip(times.iter().copied(), values)
        .map(|(time, value)| AnimationKeyFrame { time, value })
        .collect()
}

pub fn load_from_slice(path: &Path, data: &[u8]) -> Result<LoadedModel, ModelLoadError> {
    let (document, buffers, images) = gltf::import_slice(data)?;
    GltfDocumentLoader::new(path, &buffers, &images).load(document)
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<LoadedModel, ModelLoadError> {
    let path = path.as_ref();
    let (document, buffers, images) = gltf::import(path)?;
    let model = GltfDocumentLoader::new(path, &buffers, &images).load(document)?;
    info!(
        "Loaded glTF {}: {} nodes, {} animations",
        path.display(),
        model.node_count(),
        model.animations.len()
    );
    Ok(model)
}

#[cfg(test)]
mod test {
    use super::*;

    const TRIANGLE: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "translation": [0.0, 1.0, 0.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;

    #[test]
    fn load_embedded_triangle() {
        let model = load_from_slice(Path::new("triangle.gltf"), TRIANGLE.as_bytes()).unwrap();
        assert_eq!(model.scenes.len(), 1);
        assert!(model.animations.is_empty());

        let scene = &model.scenes[0];
        assert_eq!(scene.nodes.len(), 1);
        assert!(scene.skinned_nodes.is_empty());

        let node = &scene.nodes[0];
        assert_eq!(node.id, AssetIndex::from_index("triangle.gltf", 0));
        let transform: DecomposedTransform = node.transform.unwrap().into();
        assert_eq!(transform.translation, Vec3::new(0.0, 1.0, 0.0));

        let primitive = &node.mesh.as_ref().unwrap().primitives[0];
        assert_eq!(
            primitive.positions,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        );
        assert_eq!(primitive.mode, PrimitiveAssetMode::TriangleList);
        assert!(primitive.indices.is_none());
        let material = primitive.material.as_ref().unwrap();
        assert_eq!(material.diffuse_color, [1.0, 1.0, 1.0, 1.0]);
        assert!(!material.skinning);
    }

    #[test]
    fn cubic_spline_groups_tangents() {
        let values: Vec<Vec3> = (0..6).map(|i| Vec3::splat(i as f32)).collect();
        let frames = keyframes(&[0.0, 1.0], values, Interpolation::CubicSpline);
        let AnimationKeyFrames::CubicSpline(frames) = frames else {
            panic!("expected cubic spline keyframes");
        };
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].time, 1.0);
        assert_eq!(frames[1].value.1, Vec3::splat(4.0));
    }

    #[test]
    fn bad_document_is_gltf_error() {
        let result = load_from_slice(Path::new("bad.gltf"), b"{ not json");
        assert!(matches!(result, Err(ModelLoadError::Gltf(_))));
    }
}
