//! Biome height overlays applied to freshly generated grids.

use strata_voxel::HeightGrid;

use super::NoiseOverlay;
use crate::heightmap::{HeightmapParams, HeightmapSampler};

/// World-space fBm of one biome overlay.
pub struct OverlaySampler(HeightmapSampler);

impl OverlaySampler {
    pub fn new(overlay: &NoiseOverlay, seed: u64) -> Self {
        Self(HeightmapSampler::new(HeightmapParams {
            seed: seed ^ 0x0B10_E5ED,
            octaves: overlay.octaves,
            base_frequency: overlay.frequency,
            amplitude: overlay.amplitude,
            ..Default::default()
        }))
    }

    /// Height added at world `(x, z)`.
    pub fn sample(&self, x: f64, z: f64) -> f32 {
        self.0.sample(x, z) as f32
    }
}

/// Add the overlay's fBm to every vertex of `grid`.
///
/// The overlay is sampled in world space, so neighboring chunks with the
/// same dominant biome agree on their shared border.
pub fn apply_overlay(
    grid: &mut HeightGrid,
    origin: (f32, f32),
    tile_size: f32,
    overlay: &NoiseOverlay,
    seed: u64,
) {
    let sampler = OverlaySampler::new(overlay, seed);
    let side = grid.side();
    for j in 0..side {
        for i in 0..side {
            let x = origin.0 as f64 + i as f64 * tile_size as f64;
            let z = origin.1 as f64 + j as f64 * tile_size as f64;
            grid.add(i, j, sampler.sample(x, z));
        }
    }
}
