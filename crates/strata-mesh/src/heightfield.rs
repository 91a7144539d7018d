//! Heightfield mesh construction and in-place patching.
//!
//! Vertex positions are chunk-local (the chunk origin is applied by the draw
//! transform). UVs are derived from world coordinates so textures tile
//! continuously across chunk borders.

use glam::Vec3;
use strata_voxel::{DirtyRect, HeightGrid};

use crate::blend::BlendSampler;

/// CPU-side vertex and index arrays for one heightfield chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainMeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// RGB is white; alpha is the biome blend weight.
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
    /// Vertices per side.
    side: usize,
}

impl TerrainMeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        j * self.side + i
    }
}

/// Normal at vertex `(i, j)` from the central difference of its four
/// neighbors, falling back to one-sided differences at the border.
fn vertex_normal(grid: &HeightGrid, tile_size: f32, i: usize, j: usize) -> [f32; 3] {
    let n = grid.size();
    let (il, ir) = (i.saturating_sub(1), (i + 1).min(n));
    let (jd, ju) = (j.saturating_sub(1), (j + 1).min(n));
    let dx = (ir - il).max(1) as f32 * tile_size;
    let dz = (ju - jd).max(1) as f32 * tile_size;
    let slope_x = (grid.get(ir, j) - grid.get(il, j)) / dx;
    let slope_z = (grid.get(i, ju) - grid.get(i, jd)) / dz;
    Vec3::new(-slope_x, 1.0, -slope_z).normalize().to_array()
}

/// Build the full mesh for a height grid.
///
/// - `origin`: world `(x, z)` of vertex `(0, 0)`, used only for UVs and blending
/// - `uv_scale`: world units per texture repeat
/// - `blend`: optional blend sampler; without one every alpha is 0
pub fn build_heightfield_mesh(
    grid: &HeightGrid,
    origin: (f32, f32),
    tile_size: f32,
    uv_scale: f32,
    blend: Option<&BlendSampler>,
) -> TerrainMeshData {
    let side = grid.side();
    let count = side * side;
    let inv_uv = if uv_scale > 0.0 { 1.0 / uv_scale } else { 1.0 };

    let mut mesh = TerrainMeshData {
        positions: Vec::with_capacity(count),
        normals: Vec::with_capacity(count),
        uvs: Vec::with_capacity(count),
        colors: Vec::with_capacity(count),
        indices: Vec::with_capacity(grid.size() * grid.size() * 6),
        side,
    };

    for j in 0..side {
        for i in 0..side {
            let lx = i as f32 * tile_size;
            let lz = j as f32 * tile_size;
            let (wx, wz) = (origin.0 + lx, origin.1 + lz);
            mesh.positions.push([lx, grid.get(i, j), lz]);
            mesh.normals.push(vertex_normal(grid, tile_size, i, j));
            mesh.uvs.push([wx * inv_uv, wz * inv_uv]);
            let alpha = blend.map_or(0.0, |b| b.weight(wx, wz));
            mesh.colors.push([1.0, 1.0, 1.0, alpha]);
        }
    }

    // Two triangles per cell, counter-clockwise seen from +Y.
    for j in 0..grid.size() {
        for i in 0..grid.size() {
            let a = (j * side + i) as u32;
            let b = a + 1;
            let c = a + side as u32;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    mesh
}

/// Recompute positions and normals inside `rect` expanded by one cell.
///
/// UVs, colors and indices are untouched. Returns the rectangle actually
/// recomputed, or `None` if the mesh does not match the grid's dimensions.
pub fn patch_heightfield_mesh(
    mesh: &mut TerrainMeshData,
    grid: &HeightGrid,
    tile_size: f32,
    rect: DirtyRect,
) -> Option<DirtyRect> {
    if mesh.side != grid.side() || mesh.positions.len() != grid.side() * grid.side() {
        return None;
    }
    let region = rect.expanded(1, grid.size());
    if region.x0 > grid.size() || region.z0 > grid.size() {
        return None;
    }
    for (i, j) in region.iter() {
        let idx = mesh.index(i, j);
        mesh.positions[idx][1] = grid.get(i, j);
        mesh.normals[idx] = vertex_normal(grid, tile_size, i, j);
    }
    Some(region)
}
