//! Interleaved terrain vertex uploaded to the GPU.

use crate::heightfield::TerrainMeshData;

/// One terrain vertex, 48 bytes.
///
/// Layout:
///   - `[0..12]`  position `[f32; 3]`, chunk-local
///   - `[12..24]` normal `[f32; 3]`
///   - `[24..32]` uv `[f32; 2]`, world-continuous
///   - `[32..48]` color `[f32; 4]`, alpha carries the biome blend weight
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

static_assertions::assert_eq_size!(TerrainVertex, [u8; 48]);

impl TerrainVertex {
    pub fn blend_weight(&self) -> f32 {
        self.color[3]
    }
}

impl TerrainMeshData {
    /// Interleave the separate attribute arrays.
    pub fn to_vertices(&self) -> Vec<TerrainVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .zip(&self.colors)
            .map(|(((&position, &normal), &uv), &color)| TerrainVertex {
                position,
                normal,
                uv,
                color,
            })
            .collect()
    }

    /// Vertex bytes ready for a buffer upload.
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_vertices()).to_vec()
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightfield::build_heightfield_mesh;
    use strata_voxel::HeightGrid;

    #[test]
    fn test_interleave_preserves_attributes() {
        let grid = HeightGrid::from_fn(2, |i, j| (i + 2 * j) as f32);
        let mesh = build_heightfield_mesh(&grid, (4.0, 8.0), 1.0, 4.0, None);
        let vertices = mesh.to_vertices();
        assert_eq!(vertices.len(), 9);
        let v = vertices[4];
        assert_eq!(v.position, [1.0, 3.0, 1.0]);
        assert_eq!(v.uv, [1.25, 2.25]);
        assert_eq!(v.blend_weight(), 0.0);
    }

    #[test]
    fn test_byte_sizes() {
        let mesh = build_heightfield_mesh(&HeightGrid::flat(4, 0.0), (0.0, 0.0), 1.0, 4.0, None);
        assert_eq!(mesh.vertex_bytes().len(), 25 * 48);
        assert_eq!(mesh.index_bytes().len(), 4 * 4 * 6 * 4);
    }

    #[test]
    fn test_zeroed_vertex() {
        let v: TerrainVertex = bytemuck::Zeroable::zeroed();
        assert_eq!(v, TerrainVertex::default());
    }
}
