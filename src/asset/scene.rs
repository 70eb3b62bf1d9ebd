use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use super::{index::AssetIndex, node::NodeAsset, skin::SkinAsset};

#[derive(Debug, Clone, Default)]
pub struct SceneAsset {
    pub name: Option<String>,
    pub nodes: Vec<NodeAsset>,
    /// Nodes rendered with a skin. They are kept apart from the hierarchy
    /// so they can be drawn after every joint has been updated.
    pub skinned_nodes: Vec<NodeAsset>,
    pub skins: HashMap<AssetIndex, Arc<SkinAsset>>,
    // node id -> skins using the node as a joint
    pub joint_nodes: HashMap<AssetIndex, BTreeSet<AssetIndex>>,
}

impl SceneAsset {
    pub fn add_skin(&mut self, skin: Arc<SkinAsset>) {
        for joint_id in &skin.joint_ids {
            self.joint_nodes
                .entry(joint_id.clone())
                .or_default()
                .insert(skin.id.clone());
        }
        self.skins.insert(skin.id.clone(), skin);
    }

    /// Moves the mesh of every skinned node into `skinned_nodes`. The node
    /// itself stays in the hierarchy since it may parent joints.
    pub fn split_skinned_nodes(&mut self) {
        fn visit(node: &mut NodeAsset, target: &mut Vec<NodeAsset>) {
            if node.skin.is_some() && node.mesh.is_some() {
                let mut skinned = NodeAsset::new(node.id.clone());
                skinned.name = node.name.clone();
                skinned.skin = node.skin.take();
                skinned.mesh = node.mesh.take();
                target.push(skinned);
            }
            for child in &mut node.children {
                visit(child, target);
            }
        }
        for node in &mut self.nodes {
            visit(node, &mut self.skinned_nodes);
        }
    }

    pub fn for_each_node_mut(&mut self, mut func: impl FnMut(&mut NodeAsset)) {
        fn visit(node: &mut NodeAsset, func: &mut impl FnMut(&mut NodeAsset)) {
            func(node);
            for child in &mut node.children {
                visit(child, func);
            }
        }
        for node in self.nodes.iter_mut().chain(self.skinned_nodes.iter_mut()) {
            visit(node, &mut func);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes
            .iter()
            .chain(self.skinned_nodes.iter())
            .map(NodeAsset::count)
            .sum()
    }
}

#[cfg(test)]
mod test {
    use glam::Mat4;

    use crate::asset::mesh::MeshAsset;

    use super::*;

    #[test]
    fn add_skin_indexes_joints() {
        let mut scene = SceneAsset::default();
        let skin = SkinAsset {
            id: AssetIndex::from_index("a.json", 0),
            inverse_bind_matrices: vec![Mat4::IDENTITY; 2],
            joint_ids: vec![
                AssetIndex::from_index("a.json", 1),
                AssetIndex::from_index("a.json", 2),
            ],
        };
        scene.add_skin(Arc::new(skin));
        assert_eq!(scene.skins.len(), 1);
        let skins = &scene.joint_nodes[&AssetIndex::from_index("a.json", 2)];
        assert!(skins.contains(&AssetIndex::from_index("a.json", 0)));
    }

    #[test]
    fn split_skinned_nodes_keeps_joint_parents_in_place() {
        let skin = Arc::new(SkinAsset {
            id: AssetIndex::from_index("a.json", 0),
            inverse_bind_matrices: Vec::new(),
            joint_ids: Vec::new(),
        });
        let mut parent = NodeAsset::new(AssetIndex::from_index("a.json", 1));
        parent.skin = Some(skin);
        parent.mesh = Some(MeshAsset {
            name: None,
            primitives: Vec::new(),
        });
        parent
            .children
            .push(NodeAsset::new(AssetIndex::from_index("a.json", 2)));
        let mut scene = SceneAsset {
            nodes: vec![parent],
            ..Default::default()
        };

        scene.split_skinned_nodes();
        assert_eq!(scene.skinned_nodes.len(), 1);
        assert!(scene.skinned_nodes[0].mesh.is_some());
        assert!(scene.nodes[0].mesh.is_none());
        assert_eq!(scene.nodes[0].children.len(), 1);
        assert_eq!(scene.node_count(), 3);
    }
}
