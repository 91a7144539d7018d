//! The procedural height function consumed by every ring.

use crate::heightmap::{HeightmapParams, HeightmapSampler};

/// Maps world `(x, z)` to elevation. Implementations must be deterministic.
pub trait TerrainGenerator: Send + Sync {
    /// Full-detail height at world `(x, z)`.
    fn height_at(&self, x: f64, z: f64) -> f32;

    /// Cheaper approximation used where no chunk is loaded.
    fn approx_height(&self, x: f64, z: f64) -> f32 {
        self.height_at(x, z)
    }
}

/// fBm terrain offset by a base height.
pub struct NoiseTerrain {
    detail: HeightmapSampler,
    coarse: HeightmapSampler,
    base_height: f64,
}

impl NoiseTerrain {
    /// Octaves kept by [`TerrainGenerator::approx_height`].
    pub const APPROX_OCTAVES: u32 = 2;

    pub fn new(params: HeightmapParams, base_height: f64) -> Self {
        let coarse = HeightmapSampler::new(params.with_octaves(Self::APPROX_OCTAVES));
        Self {
            detail: HeightmapSampler::new(params),
            coarse,
            base_height,
        }
    }

    pub fn params(&self) -> &HeightmapParams {
        self.detail.params()
    }
}

impl TerrainGenerator for NoiseTerrain {
    fn height_at(&self, x: f64, z: f64) -> f32 {
        (self.base_height + self.detail.sample(x, z)) as f32
    }

    fn approx_height(&self, x: f64, z: f64) -> f32 {
        (self.base_height + self.coarse.sample(x, z)) as f32
    }
}

/// Constant-height terrain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatTerrain(pub f32);

impl TerrainGenerator for FlatTerrain {
    fn height_at(&self, _x: f64, _z: f64) -> f32 {
        self.0
    }
}
