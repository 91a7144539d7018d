//! Per-chunk seed derivation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_voxel::ChunkKey;

/// Combine the world seed and a chunk key into a well-distributed u64.
pub fn derive_chunk_seed(world_seed: u64, key: ChunkKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    world_seed.hash(&mut hasher);
    key.x.hash(&mut hasher);
    key.z.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic RNG for a chunk, independent of thread and call order.
pub fn chunk_rng(world_seed: u64, key: ChunkKey) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_chunk_seed(world_seed, key))
}
