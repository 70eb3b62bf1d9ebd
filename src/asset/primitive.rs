use std::sync::Arc;

use glam::Vec3;

use super::material::MaterialAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveAssetMode {
    Points,
    LineStrip,
    LineList,
    TriangleStrip,
    TriangleList,
}

pub type TexCoords = Vec<[f32; 2]>;
pub type VertexColor = Vec<[f32; 4]>;

#[derive(Debug, Clone)]
pub struct PrimitiveSkin {
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

#[derive(Debug, Clone)]
pub struct PrimitiveAsset {
    pub name: Option<String>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tex_coords: Option<TexCoords>,
    pub vertex_color: Option<VertexColor>,
    pub skin: Option<PrimitiveSkin>,
    pub indices: Option<Vec<u32>>,
    pub material: Option<Arc<MaterialAsset>>,
    pub mode: PrimitiveAssetMode,
}

impl PrimitiveAsset {
    /// Normals from the asset, or smooth normals averaged over adjacent faces
    /// when the asset has none.
    pub fn normals_or_calculated(&self) -> Vec<[f32; 3]> {
        match &self.normals {
            Some(normals) if normals.len() == self.positions.len() => normals.clone(),
            _ => calculate_normal(self.mode, &self.positions, self.indices.as_deref()),
        }
    }
}

fn calculate_triangle_normal(positions: [[f32; 3]; 3]) -> Vec3 {
    let pnt_0 = Vec3::from_array(positions[0]);
    let pnt_1 = Vec3::from_array(positions[1]);
    let pnt_2 = Vec3::from_array(positions[2]);
    let vec_a = pnt_2 - pnt_1;
    let vec_b = pnt_0 - pnt_1;
    vec_a.cross(vec_b)
}

pub fn calculate_normal(
    mode: PrimitiveAssetMode,
    positions: &[[f32; 3]],
    indices: Option<&[u32]>,
) -> Vec<[f32; 3]> {
    let mut buffer = vec![Vec3::ZERO; positions.len()];
    if mode == PrimitiveAssetMode::TriangleList {
        let triangle_indices: Vec<usize> = match indices {
            Some(indices) => indices.iter().map(|index| *index as usize).collect(),
            None => (0..positions.len()).collect(),
        };
        for triangle in triangle_indices.chunks_exact(3) {
            if triangle.iter().any(|index| *index >= positions.len()) {
                continue;
            }
            let normal = calculate_triangle_normal([
                positions[triangle[0]],
                positions[triangle[1]],
                positions[triangle[2]],
            ]);
            triangle.iter().for_each(|index| buffer[*index] += normal);
        }
    }
    buffer
        .into_iter()
        .map(|normal| normal.normalize_or_zero().to_array())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn calculate_normal_of_ccw_triangle_faces_towards_viewer() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = calculate_normal(PrimitiveAssetMode::TriangleList, &positions, None);
        for normal in normals {
            assert!((Vec3::from_array(normal) - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn calculate_normal_skips_out_of_range_indices() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let normals =
            calculate_normal(PrimitiveAssetMode::TriangleList, &positions, Some(&[0, 1, 7]));
        assert_eq!(normals, vec![[0.0; 3], [0.0; 3]]);
    }
}
