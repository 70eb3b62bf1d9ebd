use std::{
    collections::HashMap,
    f32::consts::FRAC_PI_2,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use collada::{
    document::{ColladaDocument, Diffuse, MaterialEffect},
    Animation, BindData, Object, PrimitiveElement, Shape, Skeleton, ROOT_JOINT_PARENT_INDEX,
};
use glam::{Mat4, Quat};
use log::{debug, info, warn};

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
    texture::SamplerAsset,
};

use super::{srgb_color_to_linear, texture::TextureLoader, LoadedModel, ModelLoadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

impl UpAxis {
    /// Rotation bringing this axis onto +Y.
    pub fn rotation_to_y(&self) -> Quat {
        match self {
            UpAxis::X => Quat::from_rotation_z(FRAC_PI_2),
            UpAxis::Y => Quat::IDENTITY,
            UpAxis::Z => Quat::from_rotation_x(-FRAC_PI_2),
        }
    }
}

/// Reads `<asset><up_axis>` from the parsed document. Documents without one
/// are Y up.
pub fn detect_up_axis(document: &ColladaDocument) -> UpAxis {
    let root = &document.root_element;
    let ns = root.ns.as_deref();
    let value = root
        .get_child("asset", ns)
        .and_then(|asset| asset.get_child("up_axis", ns))
        .map(|up_axis| up_axis.content_str());
    match value.as_deref().map(str::trim) {
        Some("X_UP") => UpAxis::X,
        Some("Z_UP") => UpAxis::Z,
        _ => UpAxis::Y,
    }
}

/// Collada matrices are row major.
pub fn convert_matrix(matrix: &[[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(matrix).transpose()
}

/// For every joint named by a skin controller, its index in the skeleton.
pub fn remap_joints(controller_joints: &[String], skeleton_joints: &[&str]) -> Vec<Option<usize>> {
    controller_joints
        .iter()
        .map(|name| skeleton_joints.iter().position(|joint| *joint == name))
        .collect()
}

fn joint_name_of_target(target: &str) -> &str {
    target.split('/').next().unwrap_or(target)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CornerIndex {
    vertex: usize,
    tex_vertex: Option<usize>,
    normal: Option<usize>,
}

struct DaeModelLoader<'a> {
    path: PathBuf,
    document: &'a ColladaDocument,
    texture_loader: TextureLoader,
    materials: HashMap<String, Arc<MaterialAsset>>,
}

impl<'a> DaeModelLoader<'a> {
    fn joint_id(&self, name: &str) -> AssetIndex {
        AssetIndex::from_name(&self.path, format!("joint {}", name))
    }

    fn load_material(&mut self, symbol: Option<&str>, skinning: bool) -> Arc<MaterialAsset> {
        let key = format!("{}:{}", symbol.unwrap_or_default(), skinning);
        if let Some(material) = self.materials.get(&key) {
            return material.clone();
        }

        let mut material = MaterialAsset {
            name: symbol.map(str::to_string),
            skinning,
            ..Default::default()
        };
        let effects = self.document.get_effect_library();
        let material_to_effect = self.document.get_material_to_effect();
        let effect = symbol.and_then(|symbol| {
            material_to_effect
                .get(symbol)
                .and_then(|effect| effects.get(effect))
                .or_else(|| effects.get(symbol))
        });
        let diffuse = match effect {
            Some(MaterialEffect::Phong(effect)) => Some(&effect.diffuse),
            Some(MaterialEffect::Lambert(effect)) => Some(&effect.diffuse),
            None => None,
        };
        match diffuse {
            Some(Diffuse::Color(color)) => {
                let rgb = srgb_color_to_linear([color[0], color[1], color[2]]);
                material.diffuse_color = [rgb[0], rgb[1], rgb[2], color[3]];
                if color[3] < 1.0 {
                    material.alpha_mode = MaterialAlphaMode::Blend;
                }
            }
            Some(Diffuse::Texture(image)) => {
                let images = self.document.get_images();
                let file = images.get(image).cloned().unwrap_or_else(|| image.clone());
                let file = file.trim_start_matches("file://");
                let path = match self.path.parent() {
                    Some(parent) => parent.join(file),
                    None => PathBuf::from(file),
                };
                match self
                    .texture_loader
                    .load_from_path(&path, SamplerAsset::repeat())
                {
                    Ok(texture) => material.diffuse_texture = Some(texture),
                    Err(err) => warn!("Texture {} not loaded: {}", path.display(), err),
                }
            }
            None => (),
        }

        let material = Arc::new(material);
        self.materials.insert(key, material.clone());
        material
    }

    fn load_primitive(
        &mut self,
        object: &Object,
        corners: Vec<CornerIndex>,
        material: Option<&str>,
        skin: Option<&[Option<usize>]>,
    ) -> Result<PrimitiveAsset, ModelLoadError> {
        let has_tex = corners.iter().any(|corner| corner.tex_vertex.is_some());
        let has_normal = corners.iter().any(|corner| corner.normal.is_some());
        let has_weights = skin.is_some() && object.joint_weights.len() == object.vertices.len();

        let mut vertex_map: HashMap<CornerIndex, u32> = HashMap::new();
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut tex_coords = Vec::new();
        let mut joints = Vec::new();
        let mut weights = Vec::new();
        let mut indices = Vec::with_capacity(corners.len());

        let out_of_range = |what: &str, index: usize| {
            ModelLoadError::Format(format!("{} index {} out of range", what, index))
        };

        for corner in corners {
            if let Some(index) = vertex_map.get(&corner) {
                indices.push(*index);
                continue;
            }
            let index = positions.len() as u32;
            let vertex = object
                .vertices
                .get(corner.vertex)
                .ok_or_else(|| out_of_range("vertex", corner.vertex))?;
            positions.push([vertex.x as f32, vertex.y as f32, vertex.z as f32]);
            if has_normal {
                normals.push(match corner.normal {
                    Some(normal) => {
                        let normal = object
                            .normals
                            .get(normal)
                            .ok_or_else(|| out_of_range("normal", normal))?;
                        [normal.x as f32, normal.y as f32, normal.z as f32]
                    }
                    None => [0.0, 1.0, 0.0],
                });
            }
            if has_tex {
                tex_coords.push(match corner.tex_vertex {
                    Some(tex_vertex) => {
                        let tex = object
                            .tex_vertices
                            .get(tex_vertex)
                            .ok_or_else(|| out_of_range("texture coordinate", tex_vertex))?;
                        [tex.x as f32, 1.0 - tex.y as f32]
                    }
                    None => [0.0, 0.0],
                });
            }
            if let (true, Some(remap)) = (has_weights, skin) {
                let influence = &object.joint_weights[corner.vertex];
                let mut joint = [0u16; 4];
                let mut weight = [0.0f32; 4];
                for slot in 0..4 {
                    let mapped = remap.get(influence.joints[slot] as usize).copied().flatten();
                    if let Some(mapped) = mapped {
                        joint[slot] = mapped as u16;
                        weight[slot] = influence.weights[slot];
                    }
                }
                joints.push(joint);
                weights.push(weight);
            }
            vertex_map.insert(corner, index);
            indices.push(index);
        }

        Ok(PrimitiveAsset {
            name: material.map(str::to_string),
            positions,
            normals: has_normal.then_some(normals),
            tex_coords: has_tex.then_some(tex_coords),
            vertex_color: None,
            skin: has_weights.then_some(PrimitiveSkin { joints, weights }),
            indices: Some(indices),
            material: Some(self.load_material(material, has_weights)),
            mode: PrimitiveAssetMode::TriangleList,
        })
    }

    fn load_object(
        &mut self,
        object: &Object,
        skin: Option<&[Option<usize>]>,
    ) -> Result<MeshAsset, ModelLoadError> {
        let mut groups: Vec<(Option<String>, Vec<CornerIndex>)> = Vec::new();
        let mut push = |material: &Option<String>, corners: [CornerIndex; 3]| {
            match groups.iter_mut().find(|(name, _)| *name == *material) {
                Some((_, group)) => group.extend(corners),
                None => groups.push((material.clone(), corners.to_vec())),
            }
        };

        for geometry in &object.geometry {
            for element in &geometry.mesh {
                match element {
                    PrimitiveElement::Triangles(triangles) => {
                        for (index, vertices) in triangles.vertices.iter().enumerate() {
                            let tex = triangles
                                .tex_vertices
                                .as_ref()
                                .and_then(|items| items.get(index));
                            let normal = triangles
                                .normals
                                .as_ref()
                                .and_then(|items| items.get(index));
                            let corner = |vertex: usize, tex: Option<usize>, normal: Option<usize>| {
                                CornerIndex {
                                    vertex,
                                    tex_vertex: tex,
                                    normal,
                                }
                            };
                            push(
                                &triangles.material,
                                [
                                    corner(vertices.0, tex.map(|t| t.0), normal.map(|n| n.0)),
                                    corner(vertices.1, tex.map(|t| t.1), normal.map(|n| n.1)),
                                    corner(vertices.2, tex.map(|t| t.2), normal.map(|n| n.2)),
                                ],
                            );
                        }
                    }
                    PrimitiveElement::Polylist(polylist) => {
                        for shape in &polylist.shapes {
                            if let Shape::Triangle(a, b, c) = shape {
                                let corner = |(vertex, tex_vertex, normal): (
                                    usize,
                                    Option<usize>,
                                    Option<usize>,
                                )| CornerIndex {
                                    vertex,
                                    tex_vertex,
                                    normal,
                                };
                                push(&polylist.material, [corner(*a), corner(*b), corner(*c)]);
                            }
                        }
                    }
                }
            }
        }

        let primitives = groups
            .into_iter()
            .map(|(material, corners)| {
                self.load_primitive(object, corners, material.as_deref(), skin)
            })
            .collect::<Result<_, _>>()?;
        Ok(MeshAsset {
            name: Some(object.name.clone()),
            primitives,
        })
    }

    fn load_skeleton(&self, skeleton: &Skeleton, animated: &[bool]) -> Vec<NodeAsset> {
        let mut nodes: Vec<Option<NodeAsset>> = skeleton
            .joints
            .iter()
            .enumerate()
            .map(|(index, joint)| {
                let mut node = NodeAsset::new(self.joint_id(&joint.name));
                node.name = Some(joint.name.clone());
                node.transform = skeleton
                    .bind_poses
                    .get(index)
                    .map(|pose| NodeTransform::Matrix(convert_matrix(pose)));
                node.has_animation = animated.get(index).copied().unwrap_or(false);
                Some(node)
            })
            .collect();

        // Children are listed after their parents, attach from the back
        for index in (0..nodes.len()).rev() {
            let parent = skeleton.joints[index].parent_index;
            if parent == ROOT_JOINT_PARENT_INDEX || parent as usize >= index {
                continue;
            }
            if let Some(node) = nodes[index].take() {
                if let Some(parent) = nodes[parent as usize].as_mut() {
                    parent.children.insert(0, node);
                }
            }
        }
        nodes.into_iter().flatten().collect()
    }

    fn load_animation(
        &self,
        animations: &[Animation],
        skeleton: Option<&Skeleton>,
    ) -> Option<AnimationAsset> {
        let joint_names: Vec<&str> = skeleton
            .map(|skeleton| {
                skeleton
                    .joints
                    .iter()
                    .map(|joint| joint.name.as_str())
                    .collect()
            })
            .unwrap_or_default();
        let mut channels = Vec::new();
        for animation in animations {
            let name = joint_name_of_target(&animation.target);
            if !joint_names.contains(&name) {
                warn!("Animation target {} is not a joint, skipped", animation.target);
                continue;
            }
            let mut translations = Vec::with_capacity(animation.sample_times.len());
            let mut rotations = Vec::with_capacity(animation.sample_times.len());
            let mut scales = Vec::with_capacity(animation.sample_times.len());
            for (time, pose) in animation.sample_times.iter().zip(&animation.sample_poses) {
                let (scale, rotation, translation) =
                    convert_matrix(pose).to_scale_rotation_translation();
                translations.push(AnimationKeyFrame {
                    time: *time,
                    value: translation,
                });
                rotations.push(AnimationKeyFrame {
                    time: *time,
                    value: rotation,
                });
                scales.push(AnimationKeyFrame {
                    time: *time,
                    value: scale,
                });
            }
            let target_id = self.joint_id(name);
            for sampler in [
                AnimationSampler::Translation(AnimationKeyFrames::Linear(translations)),
                AnimationSampler::Rotation(AnimationKeyFrames::Linear(rotations)),
                AnimationSampler::Scale(AnimationKeyFrames::Linear(scales)),
            ] {
                channels.push(AnimationChannelAsset {
                    length: sampler.length(),
                    sampler,
                    target_id: target_id.clone(),
                });
            }
        }
        (!channels.is_empty()).then(|| AnimationAsset {
            name: self
                .path
                .file_stem()
                .map(|name| name.to_string_lossy().into_owned()),
            channels,
        })
    }

    fn load_skin(
        &self,
        bind_data: &BindData,
        skeleton: &Skeleton,
    ) -> (Arc<SkinAsset>, Vec<Option<usize>>) {
        let joint_names: Vec<&str> = skeleton
            .joints
            .iter()
            .map(|joint| joint.name.as_str())
            .collect();
        let remap = remap_joints(&bind_data.joint_names, &joint_names);
        for (name, mapped) in bind_data.joint_names.iter().zip(&remap) {
            if mapped.is_none() {
                warn!("Skin joint {} is not in the skeleton", name);
            }
        }

        let mut inverse_bind_matrices: Vec<Mat4> = skeleton
            .joints
            .iter()
            .map(|joint| convert_matrix(&joint.inverse_bind_pose))
            .collect();
        for (mapped, pose) in remap.iter().zip(&bind_data.inverse_bind_poses) {
            if let Some(index) = mapped {
                inverse_bind_matrices[*index] = convert_matrix(pose);
            }
        }

        let skin = SkinAsset {
            id: AssetIndex::from_name(&self.path, format!("skin {}", bind_data.object_name)),
            inverse_bind_matrices,
            joint_ids: joint_names.iter().map(|name| self.joint_id(name)).collect(),
        };
        (Arc::new(skin), remap)
    }

    fn load(&mut self, up_axis: Option<UpAxis>) -> Result<LoadedModel, ModelLoadError> {
        let document = self.document;
        let obj_set = document
            .get_obj_set()
            .ok_or_else(|| ModelLoadError::Collada("no geometry library".to_string()))?;
        let skeletons = document.get_skeletons().unwrap_or_default();
        let bind_data_set = document
            .get_bind_data_set()
            .map(|set| set.bind_data)
            .unwrap_or_default();
        let animations = document.get_animations().unwrap_or_default();
        debug!(
            "Collada {}: {} objects, {} skeletons, {} skins, {} animations",
            self.path.display(),
            obj_set.objects.len(),
            skeletons.len(),
            bind_data_set.len(),
            animations.len()
        );

        let skeleton = skeletons.first();
        let animated: Vec<bool> = skeleton
            .map(|skeleton| {
                skeleton
                    .joints
                    .iter()
                    .map(|joint| {
                        animations
                            .iter()
                            .any(|animation| joint_name_of_target(&animation.target) == joint.name)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut scene = SceneAsset::default();
        let mut root = NodeAsset::new(AssetIndex::from_name(&self.path, "root"));
        root.name = self
            .path
            .file_stem()
            .map(|name| name.to_string_lossy().into_owned());
        if let Some(up_axis) = up_axis {
            root.transform = Some(NodeTransform::Decomposed(DecomposedTransform {
                rotation: up_axis.rotation_to_y(),
                ..Default::default()
            }));
        }
        if let Some(skeleton) = skeleton {
            root.children = self.load_skeleton(skeleton, &animated);
        }

        for object in &obj_set.objects {
            let bind_data = bind_data_set
                .iter()
                .find(|data| data.object_name == object.id || data.object_name == object.name);
            let skin = match (bind_data, skeleton) {
                (Some(bind_data), Some(skeleton)) => Some(self.load_skin(bind_data, skeleton)),
                _ => None,
            };
            let mesh = self.load_object(object, skin.as_ref().map(|(_, remap)| remap.as_slice()))?;
            let mut node = NodeAsset::new(AssetIndex::from_name(&self.path, &object.id));
            node.name = Some(object.name.clone());
            node.mesh = Some(mesh);
            if let Some((skin, _)) = skin {
                scene.add_skin(skin.clone());
                node.skin = Some(skin);
            }
            root.children.push(node);
        }
        scene.nodes.push(root);
        scene.split_skinned_nodes();

        let animations = self
            .load_animation(&animations, skeleton)
            .into_iter()
            .collect();
        Ok(LoadedModel::new(&self.path, vec![scene], animations))
    }
}

/// Loads a Collada document. With `convert_up_axis` a `Z_UP` or `X_UP`
/// model is rotated so its up axis becomes +Y.
pub fn load_from_str(
    path: &Path,
    text: &str,
    convert_up_axis: bool,
) -> Result<LoadedModel, ModelLoadError> {
    let document = ColladaDocument::from_str(text)
        .map_err(|err| ModelLoadError::Collada(err.to_string()))?;
    let up_axis = detect_up_axis(&document);
    let mut loader = DaeModelLoader {
        path: path.to_path_buf(),
        document: &document,
        texture_loader: TextureLoader::default(),
        materials: HashMap::new(),
    };
    loader.load((convert_up_axis && up_axis != UpAxis::Y).then_some(up_axis))
}

pub fn load_from_path<P: AsRef<Path>>(
    path: P,
    convert_up_axis: bool,
) -> Result<LoadedModel, ModelLoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let model = load_from_str(path, &text, convert_up_axis)?;
    info!(
        "Loaded Collada model {}: {} nodes, {} skinned primitives, {} animations",
        path.display(),
        model.node_count(),
        model.skinned_primitive_count(),
        model.animations.len()
    );
    Ok(model)
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use super::*;

    #[test]
    fn row_major_matrix_is_transposed() {
        let matrix = [
            [1.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 6.0],
            [0.0, 0.0, 1.0, 7.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let converted = convert_matrix(&matrix);
        assert_eq!(
            converted.transform_point3(Vec3::ZERO),
            Vec3::new(5.0, 6.0, 7.0)
        );
    }

    fn parse(text: &str) -> ColladaDocument {
        ColladaDocument::from_str(text).unwrap()
    }

    #[test]
    fn up_axis_is_detected() {
        let document = parse(
            r#"<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema">
                <asset><up_axis> Z_UP </up_axis></asset>
            </COLLADA>"#,
        );
        assert_eq!(detect_up_axis(&document), UpAxis::Z);
        let document = parse("<COLLADA><asset><up_axis>X_UP</up_axis></asset></COLLADA>");
        assert_eq!(detect_up_axis(&document), UpAxis::X);
        assert_eq!(detect_up_axis(&parse("<COLLADA><asset/></COLLADA>")), UpAxis::Y);
    }

    #[test]
    fn up_axis_ignores_comments_and_nested_tags() {
        let document = parse(
            r#"<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema">
                <!-- <up_axis>Z_UP</up_axis> -->
                <library_nodes><asset><up_axis>X_UP</up_axis></asset></library_nodes>
                <asset><up_axis>Y_UP</up_axis></asset>
            </COLLADA>"#,
        );
        assert_eq!(detect_up_axis(&document), UpAxis::Y);
    }

    #[test]
    fn z_up_rotates_onto_y() {
        let up = UpAxis::Z.rotation_to_y() * Vec3::Z;
        assert!((up - Vec3::Y).length() < 1e-6);
        let up = UpAxis::X.rotation_to_y() * Vec3::X;
        assert!((up - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn joints_are_remapped_by_name() {
        let controller = vec!["spine".to_string(), "hip".to_string(), "tail".to_string()];
        let skeleton = ["hip", "spine", "head"];
        assert_eq!(
            remap_joints(&controller, &skeleton),
            vec![Some(1), Some(0), None]
        );
    }

    #[test]
    fn animation_target_names_joint() {
        assert_eq!(joint_name_of_target("Bone_002/transform"), "Bone_002");
        assert_eq!(joint_name_of_target("Bone"), "Bone");
    }
}
