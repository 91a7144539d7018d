//! Far ring: coarse chunks sampled from the editable ring's height field,
//! skipping the area nearer rings already cover.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use strata_terrain::{BiomeProvider, OverlaySampler, dominant_biomes};
use strata_voxel::{ChunkKey, HeightChunk, HeightGrid};

use crate::dependent::sync_with_editable;
use crate::editable::EditableRing;
use crate::read_only::SyncSummary;
use crate::ring::{RingGeometry, RingUpdate, TerrainChunk};

pub struct LowLodRing {
    geometry: RingGeometry,
    biomes: Arc<dyn BiomeProvider>,
    dominant_samples: usize,
    chunks: FxHashMap<ChunkKey, TerrainChunk>,
    inner_exclusion: i32,
}

impl LowLodRing {
    pub fn new(geometry: RingGeometry, biomes: Arc<dyn BiomeProvider>, dominant_samples: usize) -> Self {
        Self {
            geometry,
            biomes,
            dominant_samples,
            chunks: FxHashMap::default(),
            inner_exclusion: 0,
        }
    }

    pub fn geometry(&self) -> &RingGeometry {
        &self.geometry
    }

    /// Exclusion radius of the last update, in this ring's chunks.
    pub fn inner_exclusion(&self) -> i32 {
        self.inner_exclusion
    }

    /// Bring membership in line with the square of `radius` chunks around
    /// world `(x, z)`, minus keys within `inner_exclusion` chunks of the
    /// center.
    pub fn update_around(
        &mut self,
        x: f32,
        z: f32,
        radius: i32,
        inner_exclusion: i32,
        editable: &EditableRing,
    ) -> RingUpdate {
        let center = self.geometry.key_at(x, z);
        let keys = self.geometry.desired_keys(center, radius, inner_exclusion);
        let desired: FxHashSet<ChunkKey> = keys.iter().copied().collect();
        self.inner_exclusion = inner_exclusion;

        let mut update = RingUpdate::default();
        self.chunks.retain(|key, _| {
            let keep = desired.contains(key);
            if !keep {
                update.unloaded.push(*key);
            }
            keep
        });

        let mut overlays = FxHashMap::default();
        for key in keys {
            if self.chunks.contains_key(&key) {
                continue;
            }
            let chunk = self.build_chunk(key, editable, &mut overlays);
            self.chunks.insert(key, chunk);
            update.loaded.push(key);
        }

        if !update.is_empty() {
            tracing::debug!(
                loaded = update.loaded.len(),
                unloaded = update.unloaded.len(),
                radius,
                inner_exclusion,
                "Low-LOD ring membership changed"
            );
        }
        update
    }

    /// Sample the editable ring over `key`. Unloaded editable chunks get the
    /// same overlay generation would give them; `overlays` caches it per
    /// editable chunk for the duration of one update.
    fn build_chunk(
        &self,
        key: ChunkKey,
        editable: &EditableRing,
        overlays: &mut FxHashMap<ChunkKey, Option<OverlaySampler>>,
    ) -> TerrainChunk {
        let size = self.geometry.chunk_world_size();
        let tile = self.geometry.tile_size;
        let (ox, oz) = key.origin(size);
        let grid = HeightGrid::from_fn(self.geometry.chunk_size, |i, j| {
            let (x, z) = (ox + i as f32 * tile, oz + j as f32 * tile);
            editable.loaded_height(x, z).unwrap_or_else(|| {
                let near_key = editable.geometry().key_at(x, z);
                let overlay = overlays
                    .entry(near_key)
                    .or_insert_with(|| editable.overlay_for(near_key));
                editable.fallback_height(x, z, overlay.as_ref())
            })
        });
        let (dominant, secondary) = dominant_biomes(
            self.biomes.as_ref(),
            (ox as f64, oz as f64),
            size as f64,
            self.dominant_samples,
        );

        let mut height = HeightChunk::new(key, self.geometry.tile_size, grid);
        height.set_source_version(editable.max_version_for_bounds(&height.world_bounds()));
        TerrainChunk {
            height,
            dominant,
            secondary,
            objects: Vec::new(),
        }
    }

    /// Propagate editable-ring edits into loaded chunks.
    pub fn sync_edits(&mut self, editable: &EditableRing) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for chunk in self.chunks.values_mut() {
            summary.record(sync_with_editable(&mut chunk.height, editable));
        }
        summary
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
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::Vec3;
    use strata_terrain::{BiomeDef, BiomeId, FlatTerrain, GenerationContext, NoiseOverlay};
    use strata_voxel::Falloff;

    use crate::read_only::ReadOnlyRing;

    /// Biome 1 east of x = 0, biome 0 west of it.
    struct Halves(Vec<BiomeDef>);

    impl BiomeProvider for Halves {
        fn biome_at(&self, x: f64, _z: f64) -> BiomeId {
            BiomeId(u16::from(x >= 0.0))
        }

        fn def(&self, id: BiomeId) -> Option<&BiomeDef> {
            self.0.get(id.0 as usize)
        }
    }

    fn biomes() -> Arc<dyn BiomeProvider> {
        Arc::new(Halves(vec![
            BiomeDef::plain("west", 0.0, 0.0),
            BiomeDef::plain("east", 0.0, 0.0),
        ]))
    }

    fn editable() -> EditableRing {
        let ctx = GenerationContext::new(1, 32, 1.0, Arc::new(FlatTerrain(10.0)), biomes());
        let mut ring = EditableRing::new(ctx, false, true);
        ring.update_around(16.0, 16.0, 1);
        ring
    }

    #[test]
    fn test_inner_exclusion() {
        let near = editable();
        let mut ring = LowLodRing::new(RingGeometry::new(4, 8.0), biomes(), 3);
        let update = ring.update_around(0.0, 0.0, 3, 1, &near);
        assert_eq!(update.loaded.len(), 48);
        assert!(ring.chunk(ChunkKey::new(0, 0)).is_none());
        assert!(ring.chunk(ChunkKey::new(1, 1)).is_some());

        let update = ring.update_around(0.0, 0.0, 3, 2, &near);
        assert_eq!(update.unloaded.len(), 8);
        assert!(update.loaded.is_empty());
        assert_eq!(ring.inner_exclusion(), 2);
    }

    #[test]
    fn test_samples_editable_heights() {
        let mut near = editable();
        near.dig_sphere(Vec3::new(16.0, 10.0, 16.0), 5.0, 2.0, Falloff::Linear);
        let mut ring = LowLodRing::new(RingGeometry::new(4, 8.0), biomes(), 3);
        ring.update_around(0.0, 0.0, 1, 0, &near);

        let chunk = ring.chunk(ChunkKey::new(0, 0)).unwrap();
        assert_eq!(chunk.height.grid().get(2, 2), 8.0);
        // Outside the brush.
        assert_eq!(chunk.height.grid().get(0, 0), 10.0);
        assert_eq!(chunk.height.source_version(), 1);
        assert_eq!(chunk.dominant, BiomeId(1));
        assert!(chunk.objects.is_empty());
        assert_eq!(ring.chunk(ChunkKey::new(-1, 0)).unwrap().dominant, BiomeId(0));
    }

    #[test]
    fn test_matches_read_only_heights_with_overlay() {
        // One overlay on both sides, so neighboring chunks agree on borders.
        let overlay = NoiseOverlay {
            amplitude: 4.0,
            frequency: 0.02,
            octaves: 3,
        };
        let def = |name| BiomeDef {
            overlay: Some(overlay.clone()),
            ..BiomeDef::plain(name, 0.5, 0.5)
        };
        let hills: Arc<dyn BiomeProvider> = Arc::new(Halves(vec![def("west"), def("east")]));
        let ctx = |chunk_size, tile_size| {
            let terrain = Arc::new(FlatTerrain(10.0));
            GenerationContext::new(7, chunk_size, tile_size, terrain, Arc::clone(&hills))
                .with_biome_overlay(true)
        };
        // Only the chunk at the origin is loaded; the rest falls back.
        let mut near = EditableRing::new(ctx(32, 1.0), false, true);
        near.update_around(16.0, 16.0, 0);
        let mut mid = ReadOnlyRing::new(ctx(4, 8.0));
        mid.update_around(0.0, 0.0, 2, &near);
        let mut far = LowLodRing::new(RingGeometry::new(4, 8.0), Arc::clone(&hills), 5);
        far.update_around(0.0, 0.0, 2, 0, &near);

        let mut varied = false;
        for generated in mid.chunks() {
            let sampled = far.chunk(generated.key()).unwrap();
            assert_eq!(sampled.dominant, generated.dominant);
            for j in 0..=4 {
                for i in 0..=4 {
                    let expected = generated.height.grid().get(i, j);
                    let actual = sampled.height.grid().get(i, j);
                    assert!(
                        (expected - actual).abs() < 1e-4,
                        "{:?} ({i}, {j}): read-only {expected}, low-LOD {actual}",
                        generated.key()
                    );
                    varied |= (actual - 10.0).abs() > 0.01;
                }
            }
        }
        assert!(varied, "overlay should move some vertices");
    }

    #[test]
    fn test_sync_after_edit() {
        let mut near = editable();
        let mut ring = LowLodRing::new(RingGeometry::new(4, 8.0), biomes(), 3);
        ring.update_around(0.0, 0.0, 1, 0, &near);
        near.dig_sphere(Vec3::new(16.0, 10.0, 16.0), 5.0, 2.0, Falloff::Linear);

        assert_eq!(ring.sync_edits(&near).patched, 1);
        assert_eq!(ring.chunk(ChunkKey::new(0, 0)).unwrap().height.grid().get(2, 2), 8.0);
    }
}
