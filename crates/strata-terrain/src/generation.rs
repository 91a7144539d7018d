//! Generation of one height chunk, shared by the background scheduler and
//! the synchronous path.

use std::sync::Arc;
use std::time::Instant;

use strata_voxel::{ChunkKey, HeightGrid};

use crate::biome::{BiomeId, BiomeProvider, apply_overlay, dominant_biomes};
use crate::error::GenerationError;
use crate::generator::TerrainGenerator;
use crate::seed::derive_chunk_seed;
use crate::spawner::{ObjectSpawner, PlacedObject, filter_to_biome};

/// Everything a worker needs to generate chunks for one ring.
#[derive(Clone)]
pub struct GenerationContext {
    pub seed: u64,
    /// Cells per chunk side.
    pub chunk_size: usize,
    pub tile_size: f32,
    pub terrain: Arc<dyn TerrainGenerator>,
    pub biomes: Arc<dyn BiomeProvider>,
    pub spawner: Option<Arc<dyn ObjectSpawner>>,
    /// Layer the dominant biome's noise overlay onto the grid.
    pub apply_biome_overlay: bool,
    /// Samples per side when voting for the dominant biome.
    pub dominant_samples: usize,
}

impl GenerationContext {
    pub fn new(
        seed: u64,
        chunk_size: usize,
        tile_size: f32,
        terrain: Arc<dyn TerrainGenerator>,
        biomes: Arc<dyn BiomeProvider>,
    ) -> Self {
        Self {
            seed,
            chunk_size,
            tile_size,
            terrain,
            biomes,
            spawner: None,
            apply_biome_overlay: false,
            dominant_samples: 5,
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn ObjectSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    pub fn with_biome_overlay(mut self, enabled: bool) -> Self {
        self.apply_biome_overlay = enabled;
        self
    }

    pub fn chunk_world_size(&self) -> f32 {
        self.chunk_size as f32 * self.tile_size
    }
}

/// A generated chunk ready to be inserted into a ring.
#[derive(Clone, Debug)]
pub struct GeneratedChunk {
    pub key: ChunkKey,
    pub grid: HeightGrid,
    pub dominant: BiomeId,
    pub secondary: Option<BiomeId>,
    pub objects: Vec<PlacedObject>,
    /// Generation time in microseconds.
    pub elapsed_us: u64,
}

/// Generate the height grid, dominant biomes, overlay and objects for `key`.
///
/// # Errors
///
/// Returns [`GenerationError::NonFiniteHeight`] if any vertex is NaN or
/// infinite after the overlay.
pub fn generate_height_chunk(
    ctx: &GenerationContext,
    key: ChunkKey,
) -> Result<GeneratedChunk, GenerationError> {
    let start = Instant::now();
    let origin = key.origin(ctx.chunk_world_size());
    let tile = ctx.tile_size as f64;

    let mut grid = HeightGrid::from_fn(ctx.chunk_size, |i, j| {
        ctx.terrain.height_at(
            origin.0 as f64 + i as f64 * tile,
            origin.1 as f64 + j as f64 * tile,
        )
    });

    let (dominant, secondary) = dominant_biomes(
        ctx.biomes.as_ref(),
        (origin.0 as f64, origin.1 as f64),
        ctx.chunk_world_size() as f64,
        ctx.dominant_samples,
    );

    if ctx.apply_biome_overlay
        && let Some(overlay) = ctx.biomes.def(dominant).and_then(|d| d.overlay.as_ref())
    {
        apply_overlay(&mut grid, origin, ctx.tile_size, overlay, ctx.seed);
    }

    if let Some(idx) = grid.as_slice().iter().position(|h| !h.is_finite()) {
        let side = grid.side();
        return Err(GenerationError::NonFiniteHeight {
            key,
            i: idx % side,
            j: idx / side,
        });
    }

    let objects = match &ctx.spawner {
        Some(spawner) => {
            let chunk_seed = derive_chunk_seed(ctx.seed, key);
            let raw = spawner.spawn(
                dominant,
                ctx.terrain.as_ref(),
                &grid,
                origin,
                ctx.tile_size,
                chunk_seed,
            );
            filter_to_biome(raw, dominant, ctx.biomes.as_ref())
        }
        None => Vec::new(),
    };

    Ok(GeneratedChunk {
        key,
        grid,
        dominant,
        secondary,
        objects,
        elapsed_us: start.elapsed().as_micros() as u64,
    })
}
