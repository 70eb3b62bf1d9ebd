use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use glam::{Mat4, Quat, Vec3};
use log::{info, warn};
use serde::Deserialize;

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
    texture::{SamplerAsset, TextureWrappingMode},
};

use super::{
    pad_color_vec3_to_vec4, srgb_color_to_linear, texture::TextureLoader, LoadedModel,
    ModelLoadError,
};

const FACE_QUAD: u32 = 1 << 0;
const FACE_MATERIAL: u32 = 1 << 1;
const FACE_UV: u32 = 1 << 2;
const FACE_VERTEX_UV: u32 = 1 << 3;
const FACE_NORMAL: u32 = 1 << 4;
const FACE_VERTEX_NORMAL: u32 = 1 << 5;
const FACE_COLOR: u32 = 1 << 6;
const FACE_VERTEX_COLOR: u32 = 1 << 7;

const DEFAULT_INFLUENCES_PER_VERTEX: usize = 2;
const MAX_INFLUENCES_PER_VERTEX: usize = 16;

/// How bone keys are interpolated. The legacy format carries no curve type,
/// the player picks one when starting a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyInterpolation {
    Step,
    #[default]
    Linear,
    CatmullRom,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata {
    format_version: Option<f32>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(untagged)]
enum JsonScale {
    Uniform(f32),
    Vector([f32; 3]),
}

impl From<JsonScale> for Vec3 {
    fn from(value: JsonScale) -> Self {
        match value {
            JsonScale::Uniform(scale) => Vec3::splat(scale),
            JsonScale::Vector(scale) => Vec3::from_array(scale),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonBone {
    #[serde(default = "no_parent")]
    parent: i64,
    name: Option<String>,
    pos: Option<[f32; 3]>,
    rotq: Option<[f32; 4]>,
    scl: Option<JsonScale>,
}

fn no_parent() -> i64 {
    -1
}

impl JsonBone {
    fn transform(&self) -> DecomposedTransform {
        DecomposedTransform {
            translation: self.pos.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
            rotation: self
                .rotq
                .map(|rotation| Quat::from_array(rotation).normalize())
                .unwrap_or(Quat::IDENTITY),
            scale: self.scl.map(Vec3::from).unwrap_or(Vec3::ONE),
        }
    }

    fn parent(&self, bone_count: usize) -> Option<usize> {
        usize::try_from(self.parent)
            .ok()
            .filter(|parent| *parent < bone_count)
    }
}

#[derive(Debug, Deserialize)]
struct JsonKey {
    time: f32,
    pos: Option<[f32; 3]>,
    rot: Option<[f32; 4]>,
    scl: Option<JsonScale>,
}

#[derive(Debug, Deserialize)]
struct JsonTrack {
    #[serde(default)]
    keys: Vec<JsonKey>,
}

#[derive(Debug, Deserialize)]
struct JsonAnimation {
    name: Option<String>,
    length: Option<f32>,
    #[serde(default)]
    hierarchy: Vec<JsonTrack>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JsonMaterial {
    #[serde(rename = "DbgName")]
    dbg_name: Option<String>,
    color_diffuse: Option<[f32; 3]>,
    map_diffuse: Option<String>,
    map_diffuse_wrap: Option<[String; 2]>,
    #[serde(default)]
    transparent: bool,
    opacity: Option<f32>,
    #[serde(default)]
    double_sided: bool,
    #[serde(default)]
    skinning: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonModel {
    #[serde(default)]
    metadata: JsonMetadata,
    scale: Option<f32>,
    #[serde(default)]
    vertices: Vec<f32>,
    #[serde(default)]
    normals: Vec<f32>,
    #[serde(default)]
    colors: Vec<u32>,
    #[serde(default)]
    uvs: Vec<Vec<f32>>,
    #[serde(default)]
    faces: Vec<u32>,
    #[serde(default)]
    materials: Vec<JsonMaterial>,
    #[serde(default)]
    skin_indices: Vec<u32>,
    #[serde(default)]
    skin_weights: Vec<f32>,
    influences_per_vertex: Option<usize>,
    #[serde(default)]
    bones: Vec<JsonBone>,
    animation: Option<JsonAnimation>,
    #[serde(default)]
    animations: Vec<JsonAnimation>,
}

/// One corner of a decoded face. Corners with equal attribute indices become
/// one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FaceVertex {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
    color: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
struct FaceTriangle {
    material: usize,
    corners: [FaceVertex; 3],
}

struct FaceReader<'a> {
    data: &'a [u32],
    offset: usize,
}

impl FaceReader<'_> {
    fn has_next(&self) -> bool {
        self.offset < self.data.len()
    }

    fn next(&mut self) -> Result<usize, ModelLoadError> {
        let value = self.data.get(self.offset).ok_or_else(|| {
            ModelLoadError::Format(format!("face stream truncated at {}", self.offset))
        })?;
        self.offset += 1;
        Ok(*value as usize)
    }

    fn next_corners(&mut self, count: usize) -> Result<[usize; 4], ModelLoadError> {
        let mut corners = [0; 4];
        for corner in corners.iter_mut().take(count) {
            *corner = self.next()?;
        }
        Ok(corners)
    }
}

/// Decodes the packed face stream. Every face starts with a bitmask telling
/// which index groups follow; quads are split into two triangles.
fn decode_faces(faces: &[u32], uv_layers: usize) -> Result<Vec<FaceTriangle>, ModelLoadError> {
    let mut reader = FaceReader {
        data: faces,
        offset: 0,
    };
    let mut triangles = Vec::new();
    while reader.has_next() {
        let kind = reader.next()? as u32;
        let count = if kind & FACE_QUAD != 0 { 4 } else { 3 };

        let positions = reader.next_corners(count)?;
        let material = if kind & FACE_MATERIAL != 0 {
            reader.next()?
        } else {
            0
        };
        if kind & FACE_UV != 0 {
            for _ in 0..uv_layers {
                reader.next()?;
            }
        }
        let mut uvs = None;
        if kind & FACE_VERTEX_UV != 0 {
            for layer in 0..uv_layers {
                let corners = reader.next_corners(count)?;
                if layer == 0 {
                    uvs = Some(corners);
                }
            }
        }
        let mut normals = None;
        if kind & FACE_NORMAL != 0 {
            normals = Some([reader.next()?; 4]);
        }
        if kind & FACE_VERTEX_NORMAL != 0 {
            normals = Some(reader.next_corners(count)?);
        }
        let mut colors = None;
        if kind & FACE_COLOR != 0 {
            colors = Some([reader.next()?; 4]);
        }
        if kind & FACE_VERTEX_COLOR != 0 {
            colors = Some(reader.next_corners(count)?);
        }

        let corner = |index: usize| FaceVertex {
            position: positions[index],
            uv: uvs.map(|uvs| uvs[index]),
            normal: normals.map(|normals| normals[index]),
            color: colors.map(|colors| colors[index]),
        };
        let splits: &[[usize; 3]] = if count == 4 {
            &[[0, 1, 3], [1, 2, 3]]
        } else {
            &[[0, 1, 2]]
        };
        for split in splits {
            triangles.push(FaceTriangle {
                material,
                corners: split.map(corner),
            });
        }
    }
    Ok(triangles)
}

fn hex_to_color(hex: u32) -> [f32; 4] {
    let rgb = [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ];
    pad_color_vec3_to_vec4(srgb_color_to_linear(rgb))
}

fn read_vec3(data: &[f32], index: usize, what: &str) -> Result<[f32; 3], ModelLoadError> {
    data.get(index * 3..index * 3 + 3)
        .map(|item| [item[0], item[1], item[2]])
        .ok_or_else(|| ModelLoadError::Format(format!("{} index {} out of range", what, index)))
}

/// Reads the influences of one vertex, padded with zeros (or truncated) to four.
fn pad_influences<T: Copy + Default>(data: &[T], influences: usize, vertex: usize) -> [T; 4] {
    let mut result = [T::default(); 4];
    let Some(start) = vertex.checked_mul(influences) else {
        return result;
    };
    for (index, item) in result.iter_mut().take(influences).enumerate() {
        if let Some(value) = start.checked_add(index).and_then(|index| data.get(index)) {
            *item = *value;
        }
    }
    result
}

/// Model space bind pose of every bone.
fn bind_matrices(bones: &[JsonBone]) -> Vec<Mat4> {
    let locals: Vec<Mat4> = bones
        .iter()
        .map(|bone| Mat4::from(bone.transform()))
        .collect();
    (0..bones.len())
        .map(|index| {
            let mut matrix = locals[index];
            let mut current = bones[index].parent(bones.len());
            let mut depth = 0;
            while let Some(parent) = current {
                depth += 1;
                if depth > bones.len() {
                    warn!("Bone #{} has a cyclic parent chain", index);
                    break;
                }
                matrix = locals[parent] * matrix;
                current = bones[parent].parent(bones.len());
            }
            matrix
        })
        .collect()
}

struct JsonModelLoader {
    path: PathBuf,
    interpolation: KeyInterpolation,
    texture_loader: TextureLoader,
}

impl JsonModelLoader {
    fn bone_id(&self, index: usize) -> AssetIndex {
        AssetIndex::from_index(&self.path, index)
    }

    fn load_material(&mut self, material: &JsonMaterial) -> MaterialAsset {
        let color = material.color_diffuse.unwrap_or([1.0, 1.0, 1.0]);
        let mut diffuse_color = pad_color_vec3_to_vec4(srgb_color_to_linear(color));
        let mut alpha_mode = MaterialAlphaMode::Opaque;
        if material.transparent {
            diffuse_color[3] = material.opacity.unwrap_or(1.0).clamp(0.0, 1.0);
            alpha_mode = MaterialAlphaMode::Blend;
        }

        let diffuse_texture = material.map_diffuse.as_ref().and_then(|name| {
            let wrap = |mode: Option<&String>| match mode.map(String::as_str) {
                Some("repeat") => TextureWrappingMode::Repeat,
                Some("mirror") => TextureWrappingMode::MirroredRepeat,
                _ => TextureWrappingMode::ClampToEdge,
            };
            let wraps = material.map_diffuse_wrap.as_ref();
            let sampler = SamplerAsset {
                wrap_x: wrap(wraps.map(|wraps| &wraps[0])),
                wrap_y: wrap(wraps.map(|wraps| &wraps[1])),
                ..Default::default()
            };
            let path = match self.path.parent() {
                Some(parent) => parent.join(name),
                None => PathBuf::from(name),
            };
            match self.texture_loader.load_from_path(&path, sampler) {
                Ok(texture) => Some(texture),
                Err(err) => {
                    warn!("Texture {} not loaded: {}", path.display(), err);
                    None
                }
            }
        });

        MaterialAsset {
            name: material.dbg_name.clone(),
            diffuse_color,
            diffuse_texture,
            alpha_mode,
            double_sided: material.double_sided,
            skinning: material.skinning,
        }
    }

    fn load_primitives(
        &mut self,
        model: &JsonModel,
        skinned: bool,
    ) -> Result<Vec<PrimitiveAsset>, ModelLoadError> {
        let uv_layers = model.uvs.iter().filter(|layer| !layer.is_empty()).count();
        let triangles = decode_faces(&model.faces, uv_layers)?;
        let scale = match model.scale {
            Some(scale) if scale != 0.0 => scale,
            _ => 1.0,
        };
        let influences = model
            .influences_per_vertex
            .unwrap_or(DEFAULT_INFLUENCES_PER_VERTEX);
        if skinned && !(1..=MAX_INFLUENCES_PER_VERTEX).contains(&influences) {
            return Err(ModelLoadError::Format(format!(
                "{} influences per vertex, expected 1 to {}",
                influences, MAX_INFLUENCES_PER_VERTEX
            )));
        }
        if influences > 4 {
            warn!(
                "{} influences per vertex, only the first 4 are kept",
                influences
            );
        }
        let uv_layer = model.uvs.first().map(Vec::as_slice).unwrap_or(&[]);

        let materials: Vec<Arc<MaterialAsset>> = model
            .materials
            .iter()
            .map(|material| Arc::new(self.load_material(material)))
            .collect();

        let mut groups: Vec<(usize, Vec<&FaceTriangle>)> = Vec::new();
        for triangle in &triangles {
            match groups.iter_mut().find(|(id, _)| *id == triangle.material) {
                Some((_, group)) => group.push(triangle),
                None => groups.push((triangle.material, vec![triangle])),
            }
        }

        let mut primitives = Vec::with_capacity(groups.len());
        for (material_index, group) in groups {
            let has_uv = group.iter().any(|triangle| triangle.corners[0].uv.is_some());
            let has_normal = group
                .iter()
                .any(|triangle| triangle.corners[0].normal.is_some());
            let has_color = group
                .iter()
                .any(|triangle| triangle.corners[0].color.is_some());

            let mut vertex_map: HashMap<FaceVertex, u32> = HashMap::new();
            let mut positions = Vec::new();
            let mut normals = Vec::new();
            let mut tex_coords = Vec::new();
            let mut colors = Vec::new();
            let mut joints = Vec::new();
            let mut weights = Vec::new();
            let mut indices = Vec::with_capacity(group.len() * 3);

            for corner in group.iter().flat_map(|triangle| triangle.corners.iter()) {
                if let Some(index) = vertex_map.get(corner) {
                    indices.push(*index);
                    continue;
                }
                let index = positions.len() as u32;
                let position = read_vec3(&model.vertices, corner.position, "vertex")?;
                positions.push(position.map(|value| value / scale));
                if has_normal {
                    normals.push(match corner.normal {
                        Some(normal) => read_vec3(&model.normals, normal, "normal")?,
                        None => [0.0, 1.0, 0.0],
                    });
                }
                if has_uv {
                    tex_coords.push(match corner.uv {
                        Some(uv) => {
                            let uv = uv_layer.get(uv * 2..uv * 2 + 2).ok_or_else(|| {
                                ModelLoadError::Format(format!("uv index {} out of range", uv))
                            })?;
                            // Images are stored top row first
                            [uv[0], 1.0 - uv[1]]
                        }
                        None => [0.0, 0.0],
                    });
                }
                if has_color {
                    colors.push(match corner.color {
                        Some(color) => {
                            let hex = model.colors.get(color).ok_or_else(|| {
                                ModelLoadError::Format(format!(
                                    "color index {} out of range",
                                    color
                                ))
                            })?;
                            hex_to_color(*hex)
                        }
                        None => [1.0, 1.0, 1.0, 1.0],
                    });
                }
                if skinned {
                    let mut joint = [0u16; 4];
                    let source = pad_influences(&model.skin_indices, influences, corner.position);
                    for (target, source) in joint.iter_mut().zip(source) {
                        *target = u16::try_from(source).map_err(|_| {
                            ModelLoadError::Format(format!("skin index {} too large", source))
                        })?;
                    }
                    joints.push(joint);
                    weights.push(pad_influences(
                        &model.skin_weights,
                        influences,
                        corner.position,
                    ));
                }
                vertex_map.insert(*corner, index);
                indices.push(index);
            }

            let material = match materials.get(material_index) {
                Some(material) => material.clone(),
                None => {
                    if !materials.is_empty() {
                        warn!("Material #{} not found, using default", material_index);
                    }
                    Arc::new(MaterialAsset::default())
                }
            };
            primitives.push(PrimitiveAsset {
                name: material.name.clone(),
                positions,
                normals: has_normal.then_some(normals),
                tex_coords: has_uv.then_some(tex_coords),
                vertex_color: has_color.then_some(colors),
                skin: skinned.then_some(PrimitiveSkin { joints, weights }),
                indices: Some(indices),
                material: Some(material),
                mode: PrimitiveAssetMode::TriangleList,
            });
        }
        Ok(primitives)
    }

    fn load_bones(&self, bones: &[JsonBone], animated: &[bool]) -> Vec<NodeAsset> {
        fn build(
            loader: &JsonModelLoader,
            bones: &[JsonBone],
            animated: &[bool],
            index: usize,
            depth: usize,
        ) -> NodeAsset {
            let bone = &bones[index];
            let mut node = NodeAsset::new(loader.bone_id(index));
            node.name = bone.name.clone();
            node.transform = Some(NodeTransform::Decomposed(bone.transform()));
            node.has_animation = animated.get(index).copied().unwrap_or(false);
            if depth < bones.len() {
                for (child, _) in bones
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| item.parent(bones.len()) == Some(index))
                {
                    if child != index {
                        node.children
                            .push(build(loader, bones, animated, child, depth + 1));
                    }
                }
            }
            node
        }

        bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent(bones.len()).is_none())
            .map(|(index, _)| build(self, bones, animated, index, 0))
            .collect()
    }

    fn load_animation(
        &self,
        animation: &JsonAnimation,
        bones: &[JsonBone],
        index: usize,
    ) -> AnimationAsset {
        let mut channels = Vec::new();
        for (bone_index, track) in animation.hierarchy.iter().enumerate() {
            let Some(bone) = bones.get(bone_index) else {
                warn!("Animation track #{} has no bone, skipped", bone_index);
                continue;
            };
            if track.keys.is_empty() {
                continue;
            }
            let target_id = self.bone_id(bone_index);
            let bind = bone.transform();
            let (translations, rotations, scales) = inherit_keys(&track.keys, bind);

            let mut samplers = vec![
                AnimationSampler::Translation(self.keyframes(translations)),
                AnimationSampler::Rotation(self.keyframes(rotations)),
            ];
            if track.keys.iter().any(|key| key.scl.is_some()) {
                samplers.push(AnimationSampler::Scale(self.keyframes(scales)));
            }
            for sampler in samplers {
                channels.push(AnimationChannelAsset {
                    length: animation.length.unwrap_or(0.0).max(sampler.length()),
                    sampler,
                    target_id: target_id.clone(),
                });
            }
        }
        AnimationAsset {
            name: Some(
                animation
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("animation {}", index)),
            ),
            channels,
        }
    }

    fn keyframes<T: std::fmt::Debug + Clone>(
        &self,
        frames: Vec<AnimationKeyFrame<T>>,
    ) -> AnimationKeyFrames<T> {
        match self.interpolation {
            KeyInterpolation::Step => AnimationKeyFrames::Step(frames),
            KeyInterpolation::Linear => AnimationKeyFrames::Linear(frames),
            KeyInterpolation::CatmullRom => AnimationKeyFrames::CatmullRom(frames),
        }
    }

    fn load(&mut self, model: JsonModel) -> Result<LoadedModel, ModelLoadError> {
        if let Some(version) = model.metadata.format_version {
            if !(3.0..4.0).contains(&version) {
                warn!("Unexpected JSON model format version {}", version);
            }
        }

        let animations: Vec<&JsonAnimation> = model
            .animation
            .iter()
            .chain(model.animations.iter())
            .collect();
        let mut animated = vec![false; model.bones.len()];
        for animation in &animations {
            for (index, track) in animation.hierarchy.iter().enumerate() {
                if let Some(flag) = animated.get_mut(index) {
                    *flag |= !track.keys.is_empty();
                }
            }
        }

        let skinned = !model.bones.is_empty() && !model.skin_indices.is_empty();
        let primitives = self.load_primitives(&model, skinned)?;

        let mut scene = SceneAsset::default();
        let mut root = NodeAsset::new(AssetIndex::from_name(&self.path, "root"));
        root.name = self
            .path
            .file_stem()
            .map(|name| name.to_string_lossy().into_owned());
        root.children = self.load_bones(&model.bones, &animated);

        let mut mesh_node = NodeAsset::new(AssetIndex::from_name(&self.path, "mesh"));
        mesh_node.mesh = Some(MeshAsset {
            name: root.name.clone(),
            primitives,
        });
        if skinned {
            let inverse_bind_matrices = bind_matrices(&model.bones)
                .into_iter()
                .map(|matrix| matrix.inverse())
                .collect();
            let skin = Arc::new(SkinAsset {
                id: AssetIndex::from_name(&self.path, "skin"),
                inverse_bind_matrices,
                joint_ids: (0..model.bones.len())
                    .map(|index| self.bone_id(index))
                    .collect(),
            });
            scene.add_skin(skin.clone());
            mesh_node.skin = Some(skin);
        }
        root.children.push(mesh_node);
        scene.nodes.push(root);
        scene.split_skinned_nodes();

        let animations = animations
            .into_iter()
            .enumerate()
            .map(|(index, animation)| self.load_animation(animation, &model.bones, index))
            .collect();
        Ok(LoadedModel::new(&self.path, vec![scene], animations))
    }
}

/// Expands sparse keys: a key missing a component repeats the previous key's
/// value, the first key falls back to the bind pose.
fn inherit_keys(
    keys: &[JsonKey],
    bind: DecomposedTransform,
) -> (
    Vec<AnimationKeyFrame<Vec3>>,
    Vec<AnimationKeyFrame<Quat>>,
    Vec<AnimationKeyFrame<Vec3>>,
) {
    let mut translations = Vec::with_capacity(keys.len());
    let mut rotations = Vec::with_capacity(keys.len());
    let mut scales = Vec::with_capacity(keys.len());
    let mut current = bind;
    for key in keys {
        if let Some(pos) = key.pos {
            current.translation = Vec3::from_array(pos);
        }
        if let Some(rot) = key.rot {
            current.rotation = Quat::from_array(rot).normalize();
        }
        if let Some(scl) = key.scl {
            current.scale = scl.into();
        }
        translations.push(AnimationKeyFrame {
            time: key.time,
            value: current.translation,
        });
        rotations.push(AnimationKeyFrame {
            time: key.time,
            value: current.rotation,
        });
        scales.push(AnimationKeyFrame {
            time: key.time,
            value: current.scale,
        });
    }
    (translations, rotations, scales)
}

pub fn load_from_slice(
    path: &Path,
    data: &[u8],
    interpolation: KeyInterpolation,
) -> Result<LoadedModel, ModelLoadError> {
    let model: JsonModel = serde_json::from_slice(data)?;
    let mut loader = JsonModelLoader {
        path: path.to_path_buf(),
        interpolation,
        texture_loader: TextureLoader::default(),
    };
    loader.load(model)
}

pub fn load_from_path<P: AsRef<Path>>(
    path: P,
    interpolation: KeyInterpolation,
) -> Result<LoadedModel, ModelLoadError> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let model = load_from_slice(path, &data, interpolation)?;
    info!(
        "Loaded JSON model {}: {} nodes, {} animations",
        path.display(),
        model.node_count(),
        model.animations.len()
    );
    Ok(model)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quad_with_uvs_and_normals_is_split() {
        // quad | material | face vertex uv | face vertex normal
        let kind = FACE_QUAD | FACE_MATERIAL | FACE_VERTEX_UV | FACE_VERTEX_NORMAL;
        let faces = [kind, 0, 1, 2, 3, 1, 4, 5, 6, 7, 8, 9, 10, 11];
        let triangles = decode_faces(&faces, 1).unwrap();
        assert_eq!(triangles.len(), 2);

        let first = &triangles[0];
        assert_eq!(first.material, 1);
        let positions = first.corners.map(|corner| corner.position);
        assert_eq!(positions, [0, 1, 3]);
        assert_eq!(first.corners[2].uv, Some(7));
        assert_eq!(first.corners[2].normal, Some(11));

        let second = &triangles[1];
        assert_eq!(second.corners.map(|corner| corner.position), [1, 2, 3]);
        assert_eq!(second.corners[0].uv, Some(5));
        assert_eq!(second.corners[0].color, None);
    }

    #[test]
    fn face_normal_and_color_apply_to_all_corners() {
        let kind = FACE_NORMAL | FACE_COLOR;
        let faces = [kind, 0, 1, 2, 5, 3, FACE_UV, 2, 3, 4, 9];
        let triangles = decode_faces(&faces, 1).unwrap();
        assert_eq!(triangles.len(), 2);
        assert!(triangles[0]
            .corners
            .iter()
            .all(|corner| corner.normal == Some(5) && corner.color == Some(3)));
        // The face uv index is skipped
        assert_eq!(triangles[1].corners.map(|corner| corner.position), [2, 3, 4]);
        assert_eq!(triangles[1].corners[0].uv, None);
    }

    #[test]
    fn truncated_faces_are_rejected() {
        let faces = [FACE_QUAD, 0, 1, 2];
        let result = decode_faces(&faces, 0);
        assert!(matches!(result, Err(ModelLoadError::Format(_))));
    }

    #[test]
    fn influences_are_padded_to_four() {
        let indices = [1u32, 2, 3, 4];
        assert_eq!(pad_influences(&indices, 2, 1), [3, 4, 0, 0]);
        let weights = [0.25f32, 0.75];
        assert_eq!(pad_influences(&weights, 2, 0), [0.25, 0.75, 0.0, 0.0]);
        // Missing data reads as zero weight
        assert_eq!(pad_influences(&weights, 2, 5), [0.0; 4]);
        assert_eq!(pad_influences(&weights, usize::MAX, 3), [0.0; 4]);
    }

    fn bone(parent: i64, pos: [f32; 3]) -> JsonBone {
        JsonBone {
            parent,
            name: None,
            pos: Some(pos),
            rotq: None,
            scl: None,
        }
    }

    #[test]
    fn bind_matrices_follow_parent_chain() {
        let bones = [bone(-1, [0.0, 1.0, 0.0]), bone(0, [0.0, 2.0, 0.0])];
        let matrices = bind_matrices(&bones);
        let point = matrices[1].transform_point3(Vec3::ZERO);
        assert!((point - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-6);
        let point = matrices[1].inverse().transform_point3(Vec3::new(0.0, 3.0, 0.0));
        assert!(point.length() < 1e-6);
    }

    #[test]
    fn missing_key_components_are_inherited() {
        let keys = [
            JsonKey {
                time: 0.0,
                pos: None,
                rot: Some([0.0, 0.0, 0.0, 1.0]),
                scl: None,
            },
            JsonKey {
                time: 1.0,
                pos: Some([1.0, 0.0, 0.0]),
                rot: None,
                scl: Some(JsonScale::Uniform(2.0)),
            },
            JsonKey {
                time: 2.0,
                pos: None,
                rot: None,
                scl: None,
            },
        ];
        let bind = DecomposedTransform {
            translation: Vec3::new(0.0, 5.0, 0.0),
            ..Default::default()
        };
        let (translations, rotations, scales) = inherit_keys(&keys, bind);
        assert_eq!(translations[0].value, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(translations[2].value, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(rotations[2].value, Quat::IDENTITY);
        assert_eq!(scales[0].value, Vec3::ONE);
        assert_eq!(scales[2].value, Vec3::splat(2.0));
    }

    const SKINNED_MODEL: &str = r#"{
        "metadata": { "formatVersion": 3.1 },
        "scale": 2.0,
        "vertices": [0, 0, 0, 2, 0, 0, 2, 2, 0, 0, 2, 0],
        "uvs": [[0, 0, 1, 0, 1, 1, 0, 1]],
        "faces": [9, 0, 1, 2, 3, 0, 0, 1, 2, 3],
        "materials": [{ "DbgName": "skin", "colorDiffuse": [1, 1, 1] }],
        "skinIndices": [0, 0, 0, 0, 1, 0, 1, 0],
        "skinWeights": [1, 0, 1, 0, 1, 0, 1, 0],
        "bones": [
            { "parent": -1, "name": "hip", "pos": [0, 0, 0], "rotq": [0, 0, 0, 1] },
            { "parent": 0, "name": "spine", "pos": [0, 1, 0], "rotq": [0, 0, 0, 1] }
        ],
        "animations": [{
            "name": "wave",
            "length": 2.0,
            "hierarchy": [
                { "keys": [] },
                { "keys": [
                    { "time": 0, "pos": [0, 1, 0], "rot": [0, 0, 0, 1] },
                    { "time": 1, "rot": [0, 0, 0.7071068, 0.7071068] }
                ] }
            ]
        }]
    }"#;

    #[test]
    fn load_skinned_model() {
        let model = load_from_slice(
            Path::new("models/girl.json"),
            SKINNED_MODEL.as_bytes(),
            KeyInterpolation::CatmullRom,
        )
        .unwrap();

        let scene = &model.scenes[0];
        assert_eq!(scene.skins.len(), 1);
        assert_eq!(scene.skinned_nodes.len(), 1);
        // root, hip, spine, emptied mesh node
        assert_eq!(scene.nodes[0].count(), 4);

        let mesh = scene.skinned_nodes[0].mesh.as_ref().unwrap();
        let primitive = &mesh.primitives[0];
        // Corners 0, 1, 3, 2 in order of first use
        assert_eq!(primitive.positions.len(), 4);
        assert_eq!(primitive.positions[3], [1.0, 1.0, 0.0]);
        assert_eq!(primitive.indices.as_deref(), Some(&[0, 1, 2, 1, 3, 2][..]));
        assert_eq!(primitive.tex_coords.as_ref().unwrap()[3], [1.0, 0.0]);
        let skin = primitive.skin.as_ref().unwrap();
        assert_eq!(skin.joints[3], [1, 0, 0, 0]);
        assert_eq!(skin.weights[3], [1.0, 0.0, 0.0, 0.0]);
        assert!(!primitive.material.as_ref().unwrap().skinning);

        let skin = scene.skins.values().next().unwrap();
        let rest = skin.inverse_bind_matrices[1].transform_point3(Vec3::new(0.0, 1.0, 0.0));
        assert!(rest.length() < 1e-6);

        assert_eq!(model.animations.len(), 1);
        let animation = &model.animations[0];
        assert_eq!(animation.name.as_deref(), Some("wave"));
        assert_eq!(animation.channels.len(), 2);
        assert_eq!(animation.length(), 2.0);
        assert!(matches!(
            animation.channels[1].sampler,
            AnimationSampler::Rotation(AnimationKeyFrames::CatmullRom(_))
        ));
        assert!(scene.nodes[0].children[0].children[0].has_animation);
        assert!(!scene.nodes[0].children[0].has_animation);
    }

    #[test]
    fn bad_vertex_index_is_format_error() {
        let data = r#"{ "vertices": [0, 0, 0], "faces": [0, 0, 1, 2] }"#;
        let result = load_from_slice(
            Path::new("broken.json"),
            data.as_bytes(),
            KeyInterpolation::Linear,
        );
        assert!(matches!(result, Err(ModelLoadError::Format(_))));
    }

    #[test]
    fn unreasonable_influence_count_is_format_error() {
        for influences in ["0", "4611686018427387904"] {
            let data = SKINNED_MODEL.replacen(
                r#""scale": 2.0,"#,
                &format!(r#""scale": 2.0, "influencesPerVertex": {},"#, influences),
                1,
            );
            let result = load_from_slice(
                Path::new("models/girl.json"),
                data.as_bytes(),
                KeyInterpolation::Linear,
            );
            assert!(matches!(result, Err(ModelLoadError::Format(_))));
        }
    }

    #[test]
    fn bad_json_is_json_error() {
        let result = load_from_slice(Path::new("x.json"), b"[1, 2", KeyInterpolation::Linear);
        assert!(matches!(result, Err(ModelLoadError::Json(_))));
    }
}
