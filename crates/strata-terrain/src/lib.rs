//! Procedural terrain: fBm height function, biome assignment and overlays,
//! object spawning, and the background chunk job scheduler.

mod error;
mod generation;
mod generator;
mod heightmap;
mod scheduler;
mod seed;
mod spawner;

pub mod biome;

pub use biome::{
    BiomeDef, BiomeId, BiomeProvider, BiomeRegistry, BiomeRegistryError, BiomeSampler,
    NoiseBiomeProvider, NoiseOverlay, OverlaySampler, SurfaceTexture, WhittakerDiagram,
    WhittakerRegion, apply_overlay, dominant_biome, dominant_biomes,
};
pub use error::{GenerationError, SchedulerError};
pub use generation::{GeneratedChunk, GenerationContext, generate_height_chunk};
pub use generator::{FlatTerrain, NoiseTerrain, TerrainGenerator};
pub use heightmap::{HeightmapParams, HeightmapSampler};
pub use scheduler::{ChunkJob, ChunkJobResult, ChunkJobScheduler, JobKind, TargetState};
pub use seed::{chunk_rng, derive_chunk_seed};
pub use spawner::{
    ObjectSpawner, ObjectTypeId, PlacedObject, PoissonSpawner, filter_to_biome, poisson_disk_2d,
};
