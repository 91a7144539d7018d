//! Shared-border height grids and per-chunk version tracking.
//!
//! A chunk of `chunk_size` cells stores `(chunk_size + 1)^2` heights. The
//! last row and column duplicate the first row and column of the neighbor,
//! so adjacent chunks stitch without seams.

use crate::bounds::{DirtyRect, WorldRect};
use crate::chunk_key::ChunkKey;

/// A `(size + 1) x (size + 1)` grid of heights, indexed `(i, j)` along X, Z.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    size: usize,
    heights: Vec<f32>,
}

impl HeightGrid {
    /// Grid of `size` cells per side with every vertex at `height`.
    pub fn flat(size: usize, height: f32) -> Self {
        let side = size + 1;
        Self {
            size,
            heights: vec![height; side * side],
        }
    }

    /// Grid of `size` cells per side filled by `f(i, j)`.
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let side = size + 1;
        let mut heights = Vec::with_capacity(side * side);
        for j in 0..side {
            for i in 0..side {
                heights.push(f(i, j));
            }
        }
        Self { size, heights }
    }

    /// Number of cells per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of vertices per side (`size + 1`).
    pub fn side(&self) -> usize {
        self.size + 1
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        j * self.side() + i
    }

    /// Height at vertex `(i, j)`. Both indices must be in `0..=size`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.heights[self.index(i, j)]
    }

    /// Set the height at vertex `(i, j)`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, height: f32) {
        let idx = self.index(i, j);
        self.heights[idx] = height;
    }

    /// Add `delta` to the height at vertex `(i, j)`.
    #[inline]
    pub fn add(&mut self, i: usize, j: usize, delta: f32) {
        let idx = self.index(i, j);
        self.heights[idx] += delta;
    }

    /// Row-major (Z rows of X) height slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.heights
    }

    /// Bilinear sample at fractional local coordinates.
    ///
    /// Coordinates are clamped to `[0, size]`. At integer coordinates the
    /// result is exactly the stored height.
    pub fn sample(&self, lx: f32, lz: f32) -> f32 {
        let max = self.size as f32;
        let lx = lx.clamp(0.0, max);
        let lz = lz.clamp(0.0, max);
        let last = self.size.saturating_sub(1);
        let i0 = (lx.floor() as usize).min(last);
        let j0 = (lz.floor() as usize).min(last);
        let fx = lx - i0 as f32;
        let fz = lz - j0 as f32;
        let i1 = (i0 + 1).min(self.size);
        let j1 = (j0 + 1).min(self.size);

        let row0 = self.get(i0, j0) * (1.0 - fx) + self.get(i1, j0) * fx;
        let row1 = self.get(i0, j1) * (1.0 - fx) + self.get(i1, j1) * fx;
        row0 * (1.0 - fz) + row1 * fz
    }

    /// Minimum and maximum height.
    pub fn min_max(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            })
    }
}

/// A ring's height chunk with mesh staleness bookkeeping.
///
/// `version` only grows. The mesh is stale while `built_from_version` differs
/// from `version`. A stale chunk without a dirty rectangle needs a full
/// rebuild.
#[derive(Clone, Debug)]
pub struct HeightChunk {
    key: ChunkKey,
    origin: (f32, f32),
    tile_size: f32,
    grid: HeightGrid,
    version: u64,
    built_from_version: Option<u64>,
    dirty_rect: Option<DirtyRect>,
    source_version: u64,
}

impl HeightChunk {
    /// Wrap a generated grid as the chunk at `key`.
    pub fn new(key: ChunkKey, tile_size: f32, grid: HeightGrid) -> Self {
        let origin = key.origin(grid.size() as f32 * tile_size);
        Self {
            key,
            origin,
            tile_size,
            grid,
            version: 0,
            built_from_version: None,
            dirty_rect: None,
            source_version: 0,
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    /// World `(x, z)` of vertex `(0, 0)`.
    pub fn origin(&self) -> (f32, f32) {
        self.origin
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn chunk_size(&self) -> usize {
        self.grid.size()
    }

    pub fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_from_version(&self) -> Option<u64> {
        self.built_from_version
    }

    pub fn dirty_rect(&self) -> Option<DirtyRect> {
        self.dirty_rect
    }

    /// Highest editable-ring version whose edits this chunk's heights reflect.
    ///
    /// Only meaningful for chunks of rings that mirror the editable ring.
    pub fn source_version(&self) -> u64 {
        self.source_version
    }

    pub fn set_source_version(&mut self, version: u64) {
        self.source_version = version;
    }

    /// World-space edge length of the chunk.
    pub fn world_size(&self) -> f32 {
        self.grid.size() as f32 * self.tile_size
    }

    /// World-space footprint, border vertices included.
    pub fn world_bounds(&self) -> WorldRect {
        let (ox, oz) = self.origin;
        let size = self.world_size();
        WorldRect::new(ox, oz, ox + size, oz + size)
    }

    /// World `(x, z)` of vertex `(i, j)`.
    pub fn vertex_world(&self, i: usize, j: usize) -> (f32, f32) {
        (
            self.origin.0 + i as f32 * self.tile_size,
            self.origin.1 + j as f32 * self.tile_size,
        )
    }

    /// Fractional local grid coordinates of a world position (unclamped).
    pub fn local_coords(&self, x: f32, z: f32) -> (f32, f32) {
        (
            (x - self.origin.0) / self.tile_size,
            (z - self.origin.1) / self.tile_size,
        )
    }

    /// Bilinear height at a world position, clamped to the chunk.
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let (lx, lz) = self.local_coords(x, z);
        self.grid.sample(lx, lz)
    }

    /// Vertex index range whose world positions fall inside `rect`.
    pub fn local_range(&self, rect: &WorldRect) -> Option<DirtyRect> {
        let n = self.grid.size() as f32;
        let (x0, z0) = self.local_coords(rect.min_x, rect.min_z);
        let (x1, z1) = self.local_coords(rect.max_x, rect.max_z);
        let (x0, z0) = (x0.ceil().max(0.0), z0.ceil().max(0.0));
        let (x1, z1) = (x1.floor().min(n), z1.floor().min(n));
        if x0 > x1 || z0 > z1 {
            return None;
        }
        Some(DirtyRect::new(
            x0 as usize,
            z0 as usize,
            x1 as usize,
            z1 as usize,
        ))
    }

    /// World-space rectangle covered by the dirty rectangle, if any.
    pub fn dirty_world_rect(&self) -> Option<WorldRect> {
        self.dirty_rect.map(|r| {
            let (ax, az) = self.vertex_world(r.x0, r.z0);
            let (bx, bz) = self.vertex_world(r.x1, r.z1);
            WorldRect::new(ax, az, bx, bz)
        })
    }

    /// Mutable access to the heights.
    ///
    /// Writers must follow up with [`HeightChunk::record_edit`] so the mesh
    /// notices the change.
    pub fn grid_mut(&mut self) -> &mut HeightGrid {
        &mut self.grid
    }

    /// Record an edit at `version`.
    ///
    /// The stored version becomes at least `version` and at least one past
    /// the previous value. `Some(rect)` unions into the dirty rectangle;
    /// `None` clears it, forcing a full rebuild.
    pub fn record_edit(&mut self, rect: Option<DirtyRect>, version: u64) {
        let was_current = !self.needs_mesh();
        self.version = version.max(self.version + 1);
        self.dirty_rect = match (self.dirty_rect, rect) {
            (Some(old), Some(new)) => Some(old.union(&new)),
            (None, Some(new)) if was_current || self.built_from_version.is_none() => Some(new),
            // A pending change of unknown extent stays a full rebuild.
            _ => None,
        };
    }

    /// Raise the version to at least `version` without touching heights.
    pub fn restore_version(&mut self, version: u64) {
        self.version = self.version.max(version);
    }

    /// Returns true if the mesh does not reflect the current heights.
    pub fn needs_mesh(&self) -> bool {
        self.built_from_version != Some(self.version)
    }

    /// Mark the mesh as built from `version` and clear the dirty rectangle.
    pub fn mark_built(&mut self, version: u64) {
        self.built_from_version = Some(version);
        self.dirty_rect = None;
    }

    /// Forget the built mesh so the next pass does a full build.
    pub fn invalidate_mesh(&mut self) {
        self.built_from_version = None;
        self.dirty_rect = None;
    }

    /// Replace the heights wholesale, for regeneration on reload.
    pub fn replace_grid(&mut self, grid: HeightGrid) {
        self.grid = grid;
        self.record_edit(None, self.version + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_chunk(key: ChunkKey, size: usize, tile: f32) -> HeightChunk {
        let grid = HeightGrid::from_fn(size, |i, j| i as f32 * 0.37 + j as f32 * 1.91 - 3.0);
        HeightChunk::new(key, tile, grid)
    }

    #[test]
    fn test_grid_exactness_at_vertices() {
        for (key, tile) in [
            (ChunkKey::new(0, 0), 1.0),
            (ChunkKey::new(-3, 2), 4.0),
            (ChunkKey::new(7, -5), 0.5),
        ] {
            let chunk = ramp_chunk(key, 16, tile);
            for j in 0..=16 {
                for i in 0..=16 {
                    let (x, z) = chunk.vertex_world(i, j);
                    assert_eq!(
                        chunk.sample(x, z),
                        chunk.grid().get(i, j),
                        "key {key:?} vertex ({i}, {j})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_bilinear_midpoint() {
        let mut grid = HeightGrid::flat(2, 0.0);
        grid.set(1, 0, 4.0);
        grid.set(0, 1, 8.0);
        grid.set(1, 1, 12.0);
        assert!((grid.sample(0.5, 0.5) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_clamps_outside() {
        let grid = HeightGrid::from_fn(4, |i, _| i as f32);
        assert_eq!(grid.sample(-2.0, 1.0), 0.0);
        assert_eq!(grid.sample(9.0, 1.0), 4.0);
    }

    #[test]
    fn test_origin_and_bounds() {
        let chunk = ramp_chunk(ChunkKey::new(2, -1), 32, 4.0);
        assert_eq!(chunk.origin(), (256.0, -128.0));
        assert_eq!(chunk.world_bounds(), WorldRect::new(256.0, -128.0, 384.0, 0.0));
    }

    #[test]
    fn test_local_range() {
        let chunk = ramp_chunk(ChunkKey::new(0, 0), 32, 1.0);
        let r = chunk
            .local_range(&WorldRect::new(10.5, -4.0, 14.0, 2.2))
            .unwrap();
        assert_eq!(r, DirtyRect::new(11, 0, 14, 2));
        assert!(chunk.local_range(&WorldRect::new(40.0, 0.0, 50.0, 5.0)).is_none());
        assert!(chunk.local_range(&WorldRect::new(3.2, 0.0, 3.8, 5.0)).is_none());
    }

    #[test]
    fn test_version_monotonic() {
        let mut chunk = ramp_chunk(ChunkKey::new(0, 0), 8, 1.0);
        chunk.mark_built(0);
        chunk.record_edit(Some(DirtyRect::point(1, 1)), 5);
        assert_eq!(chunk.version(), 5);
        chunk.record_edit(Some(DirtyRect::point(3, 2)), 2);
        assert_eq!(chunk.version(), 6);
        assert_eq!(chunk.dirty_rect(), Some(DirtyRect::new(1, 1, 3, 2)));
        chunk.restore_version(4);
        assert_eq!(chunk.version(), 6);
    }

    #[test]
    fn test_unknown_region_forces_full_rebuild() {
        let mut chunk = ramp_chunk(ChunkKey::new(0, 0), 8, 1.0);
        chunk.mark_built(0);
        chunk.record_edit(Some(DirtyRect::point(1, 1)), 1);
        chunk.record_edit(None, 2);
        assert!(chunk.needs_mesh());
        assert!(chunk.dirty_rect().is_none());

        // A later localized edit must not hide the unknown change.
        chunk.record_edit(Some(DirtyRect::point(2, 2)), 3);
        assert!(chunk.dirty_rect().is_none());
    }

    #[test]
    fn test_dirty_rect_tracked_before_first_build() {
        let mut chunk = ramp_chunk(ChunkKey::new(0, 0), 8, 1.0);
        chunk.record_edit(Some(DirtyRect::new(2, 2, 4, 4)), 1);
        assert_eq!(chunk.dirty_rect(), Some(DirtyRect::new(2, 2, 4, 4)));
        assert!(chunk.built_from_version().is_none());
    }

    #[test]
    fn test_mark_built_clears_dirty() {
        let mut chunk = ramp_chunk(ChunkKey::new(0, 0), 8, 1.0);
        assert!(chunk.needs_mesh());
        chunk.mark_built(chunk.version());
        assert!(!chunk.needs_mesh());
        chunk.record_edit(Some(DirtyRect::point(0, 0)), 1);
        assert!(chunk.needs_mesh());
        assert_eq!(chunk.dirty_rect(), Some(DirtyRect::point(0, 0)));
        chunk.mark_built(chunk.version());
        assert!(chunk.dirty_rect().is_none());
    }

    #[test]
    fn test_dirty_world_rect() {
        let mut chunk = ramp_chunk(ChunkKey::new(1, 0), 8, 2.0);
        chunk.mark_built(0);
        chunk.record_edit(Some(DirtyRect::new(1, 2, 3, 4)), 1);
        assert_eq!(
            chunk.dirty_world_rect(),
            Some(WorldRect::new(18.0, 4.0, 22.0, 8.0))
        );
    }
}
