//! Near ring: the authoritative, deformable height field around the viewpoint.

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use strata_terrain::{
    ChunkJobScheduler, GeneratedChunk, GenerationContext, OverlaySampler, TargetState,
    TerrainGenerator, dominant_biomes, generate_height_chunk,
};
use strata_voxel::{ChunkKey, DirtyRect, Falloff, SphereBrush, WorldRect, stamp_sphere};

use crate::edit_log::EditLog;
use crate::ring::{RingGeometry, RingUpdate, TerrainChunk};

/// Chunks changed by one brush stroke.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditReport {
    /// Version recorded on every touched chunk.
    pub version: u64,
    /// Touched chunks and their padded dirty rectangles.
    pub touched: Vec<(ChunkKey, DirtyRect)>,
}

impl EditReport {
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }
}

/// Change to an editable chunk that dependent rings have not seen yet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirtyPatch {
    pub key: ChunkKey,
    pub version: u64,
    /// World area of the pending change, or `None` if unknown.
    pub rect: Option<WorldRect>,
}

/// Mutable near-field ring.
pub struct EditableRing {
    geometry: RingGeometry,
    ctx: GenerationContext,
    chunks: FxHashMap<ChunkKey, TerrainChunk>,
    desired: FxHashSet<ChunkKey>,
    /// Keys handed to the scheduler and not yet applied.
    requested: FxHashSet<ChunkKey>,
    scheduler: Option<ChunkJobScheduler>,
    edit_log: Option<EditLog>,
    /// Version of the most recent stroke across the ring.
    edit_counter: u64,
}

impl EditableRing {
    /// Ring generating with `ctx`. With `background` set, loads go through
    /// a [`ChunkJobScheduler`] and land in [`EditableRing::apply_generated`];
    /// with `persist_edits` set, edits are replayed when a chunk reloads.
    pub fn new(ctx: GenerationContext, background: bool, persist_edits: bool) -> Self {
        let geometry = RingGeometry::new(ctx.chunk_size, ctx.tile_size);
        let scheduler = background.then(|| ChunkJobScheduler::new(ctx.clone()));
        Self {
            geometry,
            ctx,
            chunks: FxHashMap::default(),
            desired: FxHashSet::default(),
            requested: FxHashSet::default(),
            scheduler,
            edit_log: persist_edits.then(EditLog::new),
            edit_counter: 0,
        }
    }

    pub fn geometry(&self) -> &RingGeometry {
        &self.geometry
    }

    /// Bring membership in line with the square of `radius` chunks around
    /// world `(x, z)`.
    pub fn update_around(&mut self, x: f32, z: f32, radius: i32) -> RingUpdate {
        let center = self.geometry.key_at(x, z);
        let keys = self.geometry.desired_keys(center, radius, 0);
        self.desired = keys.iter().copied().collect();

        let mut update = RingUpdate::default();
        let desired = &self.desired;
        let stale: Vec<ChunkKey> = self
            .chunks
            .keys()
            .filter(|key| !desired.contains(key))
            .copied()
            .collect();
        for key in stale {
            self.chunks.remove(&key);
            update.unloaded.push(key);
        }

        if let Some(scheduler) = &self.scheduler {
            self.requested.retain(|key| {
                if desired.contains(key) {
                    return true;
                }
                if let Err(error) = scheduler.request_unload(*key) {
                    tracing::warn!(?key, %error, "Could not cancel chunk load");
                }
                false
            });
            for key in keys {
                if self.chunks.contains_key(&key) || self.requested.contains(&key) {
                    continue;
                }
                match scheduler.request_load(key) {
                    Ok(_) => {
                        self.requested.insert(key);
                        update.requested += 1;
                    }
                    Err(error) => tracing::warn!(?key, %error, "Could not request chunk load"),
                }
            }
        } else {
            for key in keys {
                if self.chunks.contains_key(&key) {
                    continue;
                }
                match generate_height_chunk(&self.ctx, key) {
                    Ok(generated) => {
                        self.insert_generated(generated);
                        update.loaded.push(key);
                    }
                    Err(error) => tracing::error!(?key, %error, "Chunk generation failed"),
                }
            }
        }

        if !update.is_empty() {
            tracing::debug!(
                loaded = update.loaded.len(),
                unloaded = update.unloaded.len(),
                requested = update.requested,
                "Editable ring membership changed"
            );
        }
        update
    }

    /// Apply up to `max` finished background loads. Results for keys that
    /// left the ring in the meantime are discarded.
    pub fn apply_generated(&mut self, max: usize) -> Vec<ChunkKey> {
        let results = match &self.scheduler {
            Some(scheduler) => scheduler.drain(max),
            None => return Vec::new(),
        };

        let mut loaded = Vec::new();
        for result in results {
            if result.target == TargetState::Unloaded {
                continue;
            }
            self.requested.remove(&result.key);
            // Failed loads are requested again on the next update.
            let Some(generated) = result.chunk else {
                continue;
            };
            if !self.desired.contains(&result.key) || self.chunks.contains_key(&result.key) {
                tracing::trace!(key = ?result.key, "Discarding generated chunk outside the ring");
                continue;
            }
            loaded.push(result.key);
            self.insert_generated(generated);
        }
        loaded
    }

    fn insert_generated(&mut self, generated: GeneratedChunk) {
        let key = generated.key;
        let mut chunk = TerrainChunk::from_generated(generated, self.geometry.tile_size);
        if let Some(log) = &self.edit_log
            && let Some(version) = log.replay(key, chunk.height.grid_mut())
        {
            chunk.height.restore_version(version);
            tracing::debug!(?key, version, "Replayed chunk edits");
        }
        self.chunks.insert(key, chunk);
    }

    /// Height at world `(x, z)`: bilinear over the loaded chunk, or the
    /// cheap procedural approximation when the chunk is not loaded.
    pub fn sample_height(&self, x: f32, z: f32) -> f32 {
        self.loaded_height(x, z).unwrap_or_else(|| {
            let overlay = self.overlay_for(self.geometry.key_at(x, z));
            self.fallback_height(x, z, overlay.as_ref())
        })
    }

    /// Bilinear height over the loaded chunk containing world `(x, z)`.
    pub fn loaded_height(&self, x: f32, z: f32) -> Option<f32> {
        self.chunks
            .get(&self.geometry.key_at(x, z))
            .map(|chunk| chunk.height.sample(x, z))
    }

    /// Overlay a chunk generated at `key` would receive, if overlays are on
    /// and its dominant biome has one.
    pub fn overlay_for(&self, key: ChunkKey) -> Option<OverlaySampler> {
        if !self.ctx.apply_biome_overlay {
            return None;
        }
        let size = self.geometry.chunk_world_size();
        let (ox, oz) = key.origin(size);
        let (dominant, _) = dominant_biomes(
            self.ctx.biomes.as_ref(),
            (ox as f64, oz as f64),
            size as f64,
            self.ctx.dominant_samples,
        );
        let overlay = self.ctx.biomes.def(dominant)?.overlay.as_ref()?;
        Some(OverlaySampler::new(overlay, self.ctx.seed))
    }

    /// Stand-in for an unloaded chunk: the approximate height plus the
    /// chunk's `overlay`.
    pub fn fallback_height(&self, x: f32, z: f32, overlay: Option<&OverlaySampler>) -> f32 {
        let (x, z) = (x as f64, z as f64);
        let base = self.ctx.terrain.approx_height(x, z);
        overlay.map_or(base, |o| base + o.sample(x, z))
    }

    pub fn dig_sphere(&mut self, center: Vec3, radius: f32, strength: f32, falloff: Falloff) -> EditReport {
        self.apply_brush(SphereBrush::dig(center, radius, strength, falloff))
    }

    pub fn place_sphere(&mut self, center: Vec3, radius: f32, strength: f32, falloff: Falloff) -> EditReport {
        self.apply_brush(SphereBrush::place(center, radius, strength, falloff))
    }

    /// Stamp `brush` into every loaded chunk it reaches. Unloaded chunks
    /// are skipped.
    pub fn apply_brush(&mut self, brush: SphereBrush) -> EditReport {
        let footprint = brush.footprint();
        let lo = self.geometry.key_at(footprint.min_x, footprint.min_z);
        let hi = self.geometry.key_at(footprint.max_x, footprint.max_z);
        let version = self.edit_counter + 1;
        let mut report = EditReport {
            version,
            touched: Vec::new(),
        };

        let log = &mut self.edit_log;
        // Start one chunk early: a chunk's last column is its neighbor's first.
        for cz in lo.z - 1..=hi.z {
            for cx in lo.x - 1..=hi.x {
                let key = ChunkKey::new(cx, cz);
                let Some(chunk) = self.chunks.get_mut(&key) else {
                    continue;
                };
                let side = chunk.height.grid().side();
                let rect = stamp_sphere(&mut chunk.height, &brush, version, |i, j, delta| {
                    if let Some(log) = log.as_mut() {
                        log.add(key, side, i, j, delta);
                    }
                });
                if let Some(rect) = rect {
                    if let Some(log) = log.as_mut() {
                        log.set_version(key, chunk.height.version());
                    }
                    report.touched.push((key, rect));
                }
            }
        }

        if !report.is_empty() {
            self.edit_counter = version;
            tracing::debug!(
                version,
                chunks = report.touched.len(),
                mode = ?brush.mode,
                "Applied sphere brush"
            );
        }
        report
    }

    /// Highest version among loaded chunks overlapping `bounds`.
    pub fn max_version_for_bounds(&self, bounds: &WorldRect) -> u64 {
        self.chunks
            .values()
            .filter(|chunk| chunk.height.world_bounds().intersects(bounds))
            .map(|chunk| chunk.height.version())
            .max()
            .unwrap_or(0)
    }

    /// Overlapping chunks whose version is newer than `since`.
    pub fn dirty_patches_in(&self, bounds: &WorldRect, since: u64) -> Vec<DirtyPatch> {
        self.chunks
            .values()
            .filter(|chunk| chunk.height.version() > since)
            .filter(|chunk| chunk.height.world_bounds().intersects(bounds))
            .map(|chunk| DirtyPatch {
                key: chunk.key(),
                version: chunk.height.version(),
                rect: chunk.height.dirty_world_rect(),
            })
            .collect()
    }

    /// World bounds of loaded chunks overlapping `bounds`; with
    /// `edited_only`, only chunks that carry edits.
    pub fn loaded_bounds_in(&self, bounds: &WorldRect, edited_only: bool) -> Vec<WorldRect> {
        self.chunks
            .values()
            .filter(|chunk| !edited_only || chunk.height.version() > 0)
            .map(|chunk| chunk.height.world_bounds())
            .filter(|rect| rect.intersects(bounds))
            .collect()
    }

    pub fn is_loaded(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&TerrainChunk> {
        self.chunks.get(&key)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    pub(crate) fn chunks_mut(&mut self) -> impl Iterator<Item = &mut TerrainChunk> {
        self.chunks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Loads waiting on the background scheduler.
    pub fn pending_loads(&self) -> usize {
        self.scheduler.as_ref().map_or(0, |s| s.pending_count())
    }

    /// Chunks with logged edits.
    pub fn edited_chunks(&self) -> usize {
        self.edit_log.as_ref().map_or(0, |log| log.len())
    }

    pub fn terrain(&self) -> &dyn TerrainGenerator {
        self.ctx.terrain.as_ref()
    }
}

/// Read-only view of the editable ring as a height function, for rings
/// that mirror its edits.
pub struct EditableHeightView<'a>(pub &'a EditableRing);

impl TerrainGenerator for EditableHeightView<'_> {
    fn height_at(&self, x: f64, z: f64) -> f32 {
        self.0.sample_height(x as f32, z as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use strata_terrain::{BiomeDef, BiomeId, BiomeProvider, FlatTerrain};

    struct OneBiome(Vec<BiomeDef>);

    impl BiomeProvider for OneBiome {
        fn biome_at(&self, _x: f64, _z: f64) -> BiomeId {
            BiomeId(0)
        }

        fn def(&self, id: BiomeId) -> Option<&BiomeDef> {
            self.0.get(id.0 as usize)
        }
    }

    fn ring(background: bool, persist: bool) -> EditableRing {
        let ctx = GenerationContext::new(
            3,
            32,
            1.0,
            Arc::new(FlatTerrain(10.0)),
            Arc::new(OneBiome(vec![BiomeDef::plain("flat", 0.2, 0.2)])),
        );
        EditableRing::new(ctx, background, persist)
    }

    #[test]
    fn test_membership_diff() {
        let mut ring = ring(false, true);
        let update = ring.update_around(16.0, 16.0, 1);
        assert_eq!(update.loaded.len(), 9);
        assert_eq!(ring.len(), 9);

        let update = ring.update_around(48.0, 16.0, 1);
        assert_eq!(update.loaded.len(), 3);
        assert_eq!(update.unloaded.len(), 3);
        assert!(ring.is_loaded(ChunkKey::new(2, 0)));
        assert!(!ring.is_loaded(ChunkKey::new(-1, 0)));
    }

    #[test]
    fn test_dig_example_and_sampling() {
        let mut ring = ring(false, true);
        ring.update_around(16.0, 16.0, 1);
        let report = ring.dig_sphere(Vec3::new(16.0, 10.0, 16.0), 5.0, 2.0, Falloff::Linear);
        assert_eq!(report.touched.len(), 1);
        assert_eq!(report.version, 1);

        assert_eq!(ring.sample_height(16.0, 16.0), 8.0);
        assert_eq!(ring.sample_height(21.0, 16.0), 10.0);
        assert_eq!(ring.sample_height(25.0, 16.0), 10.0);
        // Between vertices the height is interpolated.
        assert!((ring.sample_height(16.5, 16.0) - 8.2).abs() < 1e-5);

        let chunk = ring.chunk(ChunkKey::new(0, 0)).unwrap();
        assert_eq!(chunk.height.version(), 1);
        assert!(chunk.height.dirty_rect().is_some());
    }

    #[test]
    fn test_unloaded_falls_back_to_procedural() {
        let ring = ring(false, true);
        assert_eq!(ring.sample_height(500.0, -500.0), 10.0);
    }

    #[test]
    fn test_edit_across_chunk_border_keeps_seam() {
        let mut ring = ring(false, true);
        ring.update_around(32.0, 16.0, 1);
        let report = ring.place_sphere(Vec3::new(32.0, 10.0, 16.0), 4.0, 1.0, Falloff::Cosine);
        assert_eq!(report.touched.len(), 2);

        let left = ring.chunk(ChunkKey::new(0, 0)).unwrap();
        let right = ring.chunk(ChunkKey::new(1, 0)).unwrap();
        for j in 0..=32 {
            assert_eq!(left.height.grid().get(32, j), right.height.grid().get(0, j));
        }
        assert_eq!(right.height.grid().get(0, 16), 11.0);
    }

    #[test]
    fn test_versions_monotonic_across_strokes() {
        let mut ring = ring(false, true);
        ring.update_around(16.0, 16.0, 1);
        let a = ring.dig_sphere(Vec3::new(10.0, 0.0, 10.0), 2.0, 1.0, Falloff::Linear);
        let b = ring.dig_sphere(Vec3::new(40.0, 0.0, 10.0), 2.0, 1.0, Falloff::Linear);
        assert!(b.version > a.version);
        assert_eq!(ring.chunk(ChunkKey::new(1, 0)).unwrap().height.version(), b.version);

        let bounds = WorldRect::new(0.0, 0.0, 64.0, 32.0);
        assert_eq!(ring.max_version_for_bounds(&bounds), b.version);
        assert_eq!(ring.dirty_patches_in(&bounds, a.version).len(), 1);
        assert_eq!(ring.loaded_bounds_in(&bounds, true).len(), 2);
    }

    #[test]
    fn test_miss_reports_nothing() {
        let mut ring = ring(false, true);
        ring.update_around(0.0, 0.0, 0);
        let report = ring.dig_sphere(Vec3::new(500.0, 0.0, 500.0), 3.0, 1.0, Falloff::Linear);
        assert!(report.is_empty());
        let next = ring.dig_sphere(Vec3::new(10.0, 0.0, 10.0), 3.0, 1.0, Falloff::Linear);
        assert_eq!(next.version, 1);
    }

    #[test]
    fn test_edits_replayed_on_reload() {
        let mut ring = ring(false, true);
        ring.update_around(16.0, 16.0, 0);
        let report = ring.dig_sphere(Vec3::new(16.0, 10.0, 16.0), 5.0, 2.0, Falloff::Linear);

        ring.update_around(1000.0, 1000.0, 0);
        assert!(!ring.is_loaded(ChunkKey::new(0, 0)));
        ring.update_around(16.0, 16.0, 0);

        let chunk = ring.chunk(ChunkKey::new(0, 0)).unwrap();
        assert_eq!(chunk.height.sample(16.0, 16.0), 8.0);
        assert_eq!(chunk.height.version(), report.version);
        assert_eq!(ring.edited_chunks(), 1);
    }

    #[test]
    fn test_ephemeral_edits_lost_on_reload() {
        let mut ring = ring(false, false);
        ring.update_around(16.0, 16.0, 0);
        ring.dig_sphere(Vec3::new(16.0, 10.0, 16.0), 5.0, 2.0, Falloff::Linear);
        ring.update_around(1000.0, 1000.0, 0);
        ring.update_around(16.0, 16.0, 0);
        assert_eq!(ring.sample_height(16.0, 16.0), 10.0);
        assert_eq!(ring.edited_chunks(), 0);
    }

    #[test]
    fn test_background_generation() {
        let mut ring = ring(true, true);
        let update = ring.update_around(16.0, 16.0, 1);
        assert_eq!(update.requested, 9);
        assert!(update.loaded.is_empty());

        let deadline = Instant::now() + Duration::from_secs(10);
        while (ring.len() < 9 || ring.pending_loads() > 0) && Instant::now() < deadline {
            ring.apply_generated(usize::MAX);
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(ring.len(), 9);
        assert_eq!(ring.pending_loads(), 0);
        assert_eq!(ring.sample_height(3.0, 4.0), 10.0);
    }

    #[test]
    fn test_partial_drain_does_not_request_twice() {
        let mut ring = ring(true, true);
        let mut requested = ring.update_around(16.0, 16.0, 1).requested;
        assert_eq!(requested, 9);

        // Let every result queue up before applying them one at a time.
        let deadline = Instant::now() + Duration::from_secs(10);
        while ring.pending_loads() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        while ring.len() < 9 && Instant::now() < deadline {
            ring.apply_generated(1);
            requested += ring.update_around(16.0, 16.0, 1).requested;
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(ring.len(), 9);
        assert_eq!(requested, 9);
    }

    #[test]
    fn test_height_view() {
        let mut ring = ring(false, true);
        ring.update_around(16.0, 16.0, 0);
        ring.dig_sphere(Vec3::new(16.0, 10.0, 16.0), 5.0, 2.0, Falloff::Linear);
        let view = EditableHeightView(&ring);
        assert_eq!(view.height_at(16.0, 16.0), 8.0);
        assert_eq!(view.height_at(-300.0, 0.0), 10.0);
    }
}
