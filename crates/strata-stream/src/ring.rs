//! Shared ring vocabulary: ring kinds, chunk-grid geometry, the per-ring
//! chunk record, and membership diff results.

use glam::{Mat4, Vec3};
use strata_config::RingConfig;
use strata_terrain::{BiomeId, GeneratedChunk, PlacedObject};
use strata_voxel::{ChunkKey, HeightChunk};

/// Which ring a chunk belongs to. Doubles as the mesh layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RingKind {
    Editable,
    ReadOnly,
    LowLod,
}

impl RingKind {
    pub fn layer(self) -> u8 {
        match self {
            RingKind::Editable => 0,
            RingKind::ReadOnly => 1,
            RingKind::LowLod => 2,
        }
    }
}

/// Chunk grid of one ring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingGeometry {
    /// Cells per chunk side.
    pub chunk_size: usize,
    pub tile_size: f32,
}

impl RingGeometry {
    pub fn new(chunk_size: usize, tile_size: f32) -> Self {
        Self {
            chunk_size,
            tile_size,
        }
    }

    pub fn from_config(config: &RingConfig) -> Self {
        Self::new(config.chunk_size as usize, config.tile_size)
    }

    pub fn chunk_world_size(&self) -> f32 {
        self.chunk_size as f32 * self.tile_size
    }

    /// Key of the chunk containing world `(x, z)`.
    pub fn key_at(&self, x: f32, z: f32) -> ChunkKey {
        ChunkKey::from_world(x, z, self.chunk_world_size())
    }

    /// World-space center of a chunk, at height zero.
    pub fn chunk_center(&self, key: ChunkKey) -> Vec3 {
        let (ox, oz) = key.origin(self.chunk_world_size());
        let half = self.chunk_world_size() * 0.5;
        Vec3::new(ox + half, 0.0, oz + half)
    }

    /// Model transform placing a chunk-local mesh in the world.
    pub fn chunk_transform(&self, key: ChunkKey) -> Mat4 {
        let (ox, oz) = key.origin(self.chunk_world_size());
        Mat4::from_translation(Vec3::new(ox, 0.0, oz))
    }

    /// Keys within Chebyshev distance `radius` of `center`, skipping those
    /// closer than `inner_exclusion`, nearest first.
    pub fn desired_keys(&self, center: ChunkKey, radius: i32, inner_exclusion: i32) -> Vec<ChunkKey> {
        if radius < 0 {
            return Vec::new();
        }
        let mut keys = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs().max(dz.abs()) < inner_exclusion {
                    continue;
                }
                keys.push(center.offset(dx, dz));
            }
        }
        keys.sort_by_key(|key| {
            let dx = (key.x - center.x) as i64;
            let dz = (key.z - center.z) as i64;
            (dx * dx + dz * dz, *key)
        });
        keys
    }
}

/// Radius, in chunks of the outer ring, that lies entirely inside
/// `inner_radius` chunks of the inner ring.
pub fn exclusion_radius(inner_radius: i32, inner: &RingGeometry, outer: &RingGeometry) -> i32 {
    let outer_size = outer.chunk_world_size();
    if outer_size <= 0.0 || inner_radius <= 0 {
        return 0;
    }
    ((inner_radius as f32 * inner.chunk_world_size()) / outer_size).floor() as i32
}

/// A loaded chunk of any ring.
#[derive(Clone, Debug)]
pub struct TerrainChunk {
    pub height: HeightChunk,
    pub dominant: BiomeId,
    pub secondary: Option<BiomeId>,
    pub objects: Vec<PlacedObject>,
}

impl TerrainChunk {
    pub fn from_generated(generated: GeneratedChunk, tile_size: f32) -> Self {
        Self {
            height: HeightChunk::new(generated.key, tile_size, generated.grid),
            dominant: generated.dominant,
            secondary: generated.secondary,
            objects: generated.objects,
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.height.key()
    }
}

/// Membership changes from one ring update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RingUpdate {
    pub loaded: Vec<ChunkKey>,
    pub unloaded: Vec<ChunkKey>,
    /// Loads handed to the background scheduler.
    pub requested: usize,
}

impl RingUpdate {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.unloaded.is_empty() && self.requested == 0
    }
}
