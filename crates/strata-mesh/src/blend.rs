//! Per-vertex biome blend weights.
//!
//! Samples the biome on concentric rings around a vertex and measures the
//! fraction that differs from the chunk's dominant biome. The fraction is
//! smoothed through a threshold band into `[0, 1]` and drives a two-texture
//! blend without hard edges at biome borders.

use std::f32::consts::TAU;
use std::sync::Arc;

use strata_terrain::{BiomeId, BiomeProvider};

/// Computes blend weights against one dominant biome.
#[derive(Clone)]
pub struct BlendSampler {
    provider: Arc<dyn BiomeProvider>,
    dominant: BiomeId,
    rings: usize,
    samples_per_ring: usize,
    ring_spacing: f32,
    threshold_low: f32,
    threshold_high: f32,
}

impl BlendSampler {
    pub fn new(provider: Arc<dyn BiomeProvider>, dominant: BiomeId) -> Self {
        Self {
            provider,
            dominant,
            rings: 2,
            samples_per_ring: 6,
            ring_spacing: 4.0,
            threshold_low: 0.1,
            threshold_high: 0.6,
        }
    }

    /// Sample `rings` rings of `samples_per_ring` points, `spacing` apart.
    pub fn with_rings(mut self, rings: usize, samples_per_ring: usize, spacing: f32) -> Self {
        self.rings = rings;
        self.samples_per_ring = samples_per_ring;
        self.ring_spacing = spacing;
        self
    }

    /// Foreign fractions at or below `low` map to 0, at or above `high` to 1.
    pub fn with_thresholds(mut self, low: f32, high: f32) -> Self {
        self.threshold_low = low.min(high);
        self.threshold_high = low.max(high);
        self
    }

    pub fn dominant(&self) -> BiomeId {
        self.dominant
    }

    /// Fraction of ring samples around `(x, z)` whose biome is not dominant.
    pub fn foreign_fraction(&self, x: f32, z: f32) -> f32 {
        let total = self.rings * self.samples_per_ring;
        if total == 0 {
            return 0.0;
        }
        let mut foreign = 0usize;
        for ring in 1..=self.rings {
            let radius = ring as f32 * self.ring_spacing;
            // Offset alternate rings so samples do not line up radially.
            let phase = if ring % 2 == 0 {
                0.5 * TAU / self.samples_per_ring as f32
            } else {
                0.0
            };
            for k in 0..self.samples_per_ring {
                let angle = phase + k as f32 * TAU / self.samples_per_ring as f32;
                let sx = x + radius * angle.cos();
                let sz = z + radius * angle.sin();
                if self.provider.biome_at(sx as f64, sz as f64) != self.dominant {
                    foreign += 1;
                }
            }
        }
        foreign as f32 / total as f32
    }

    /// Smoothed blend weight in `[0, 1]` at world `(x, z)`.
    pub fn weight(&self, x: f32, z: f32) -> f32 {
        smoothstep(
            self.threshold_low,
            self.threshold_high,
            self.foreign_fraction(x, z),
        )
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
