//! Mid ring: procedurally generated chunks that mirror editable-ring edits.

use rustc_hash::{FxHashMap, FxHashSet};
use strata_terrain::{GenerationContext, generate_height_chunk};
use strata_voxel::ChunkKey;

use crate::dependent::{SyncOutcome, resample_overlap, sync_with_editable};
use crate::editable::EditableRing;
use crate::ring::{RingGeometry, RingUpdate, TerrainChunk};

/// Chunks patched and refreshed by one sync pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub patched: usize,
    pub refreshed: usize,
}

impl SyncSummary {
    pub(crate) fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Current => {}
            SyncOutcome::Patched(_) => self.patched += 1,
            SyncOutcome::Refreshed => self.refreshed += 1,
        }
    }
}

pub struct ReadOnlyRing {
    geometry: RingGeometry,
    ctx: GenerationContext,
    chunks: FxHashMap<ChunkKey, TerrainChunk>,
}

impl ReadOnlyRing {
    /// Ring generating with `ctx`. Objects are never spawned for it.
    pub fn new(mut ctx: GenerationContext) -> Self {
        ctx.spawner = None;
        Self {
            geometry: RingGeometry::new(ctx.chunk_size, ctx.tile_size),
            ctx,
            chunks: FxHashMap::default(),
        }
    }

    pub fn geometry(&self) -> &RingGeometry {
        &self.geometry
    }

    /// Bring membership in line with the square of `radius` chunks around
    /// world `(x, z)`. New chunks pick up edits already made to the editable
    /// chunks they overlap.
    pub fn update_around(&mut self, x: f32, z: f32, radius: i32, editable: &EditableRing) -> RingUpdate {
        let center = self.geometry.key_at(x, z);
        let keys = self.geometry.desired_keys(center, radius, 0);
        let desired: FxHashSet<ChunkKey> = keys.iter().copied().collect();

        let mut update = RingUpdate::default();
        self.chunks.retain(|key, _| {
            let keep = desired.contains(key);
            if !keep {
                update.unloaded.push(*key);
            }
            keep
        });

        for key in keys {
            if self.chunks.contains_key(&key) {
                continue;
            }
            let generated = match generate_height_chunk(&self.ctx, key) {
                Ok(generated) => generated,
                Err(error) => {
                    tracing::warn!(?key, %error, "Read-only chunk generation failed");
                    continue;
                }
            };
            let mut chunk = TerrainChunk::from_generated(generated, self.geometry.tile_size);
            resample_overlap(&mut chunk.height, editable, true);
            let source = editable.max_version_for_bounds(&chunk.height.world_bounds());
            chunk.height.set_source_version(source);
            self.chunks.insert(key, chunk);
            update.loaded.push(key);
        }

        if !update.is_empty() {
            tracing::debug!(
                loaded = update.loaded.len(),
                unloaded = update.unloaded.len(),
                radius,
                "Read-only ring membership changed"
            );
        }
        update
    }

    /// Propagate editable-ring edits into loaded chunks.
    pub fn sync_edits(&mut self, editable: &EditableRing) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for chunk in self.chunks.values_mut() {
            summary.record(sync_with_editable(&mut chunk.height, editable));
        }
        summary
    }

    /// Bilinear height at world `(x, z)`, if the owning chunk is loaded.
    pub fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        self.chunks
            .get(&self.geometry.key_at(x, z))
            .map(|chunk| chunk.height.sample(x, z))
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
    use std::sync::Arc;

    use glam::Vec3;
    use strata_terrain::{BiomeDef, BiomeId, BiomeProvider, FlatTerrain, TerrainGenerator};
    use strata_voxel::Falloff;

    struct OneBiome(Vec<BiomeDef>);

    impl BiomeProvider for OneBiome {
        fn biome_at(&self, _x: f64, _z: f64) -> BiomeId {
            BiomeId(0)
        }

        fn def(&self, id: BiomeId) -> Option<&BiomeDef> {
            self.0.get(id.0 as usize)
        }
    }

    /// Slope rising one unit per world unit along x.
    struct Ramp;

    impl TerrainGenerator for Ramp {
        fn height_at(&self, x: f64, _z: f64) -> f32 {
            x as f32
        }
    }

    fn ctx(terrain: Arc<dyn TerrainGenerator>, chunk_size: usize, tile: f32) -> GenerationContext {
        GenerationContext::new(
            9,
            chunk_size,
            tile,
            terrain,
            Arc::new(OneBiome(vec![BiomeDef::plain("flat", 0.0, 0.0)])),
        )
    }

    fn editable(terrain: Arc<dyn TerrainGenerator>) -> EditableRing {
        let mut ring = EditableRing::new(ctx(terrain, 32, 1.0), false, true);
        ring.update_around(16.0, 16.0, 1);
        ring
    }

    #[test]
    fn test_samples_procedural_function() {
        let terrain: Arc<dyn TerrainGenerator> = Arc::new(Ramp);
        let near = editable(terrain.clone());
        let mut ring = ReadOnlyRing::new(ctx(terrain, 8, 4.0));
        let update = ring.update_around(0.0, 0.0, 1, &near);
        assert_eq!(update.loaded.len(), 9);
        assert_eq!(ring.sample_height(20.0, 7.0), Some(20.0));
        assert_eq!(ring.sample_height(-30.0, 7.0), Some(-30.0));
        assert_eq!(ring.sample_height(500.0, 0.0), None);

        let update = ring.update_around(0.0, 0.0, 0, &near);
        assert_eq!(update.unloaded.len(), 8);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_load_picks_up_existing_edits() {
        let mut near = editable(Arc::new(FlatTerrain(10.0)));
        let report = near.dig_sphere(Vec3::new(16.0, 10.0, 16.0), 5.0, 2.0, Falloff::Linear);
        let mut ring = ReadOnlyRing::new(ctx(Arc::new(FlatTerrain(10.0)), 8, 4.0));
        ring.update_around(0.0, 0.0, 0, &near);

        let chunk = ring.chunk(ChunkKey::new(0, 0)).unwrap();
        assert_eq!(chunk.height.grid().get(4, 4), 8.0);
        assert_eq!(chunk.height.source_version(), report.version);
        assert_eq!(ring.sync_edits(&near), SyncSummary::default());
    }

    #[test]
    fn test_sync_propagates_later_edits() {
        let mut near = editable(Arc::new(FlatTerrain(10.0)));
        let mut ring = ReadOnlyRing::new(ctx(Arc::new(FlatTerrain(10.0)), 8, 4.0));
        ring.update_around(0.0, 0.0, 1, &near);
        near.place_sphere(Vec3::new(16.0, 10.0, 16.0), 5.0, 2.0, Falloff::Linear);

        let summary = ring.sync_edits(&near);
        // Only chunk (0, 0) holds vertices inside the dirty area.
        assert_eq!(summary, SyncSummary { patched: 1, refreshed: 0 });
        assert_eq!(ring.sample_height(16.0, 16.0), Some(12.0));
    }
}
