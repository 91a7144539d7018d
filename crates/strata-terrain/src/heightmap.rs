//! Multi-octave fractal Brownian motion (fBm) height sampler.
//!
//! Sums octaves of simplex noise, each at a higher frequency and lower
//! amplitude than the last, for features at many spatial scales.

use noise::{NoiseFn, Simplex};

/// Configuration for multi-octave fBm noise.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapParams {
    /// World seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first (lowest) octave, in cycles per world unit.
    pub base_frequency: f64,
    /// Amplitude of the first octave, in world units.
    pub amplitude: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 5,
            lacunarity: 2.0,
            persistence: 0.5,
            amplitude: 24.0,
            base_frequency: 0.004,
        }
    }
}

impl HeightmapParams {
    /// The same field truncated to at most `octaves` octaves.
    pub fn with_octaves(&self, octaves: u32) -> Self {
        Self {
            octaves: octaves.min(self.octaves),
            ..self.clone()
        }
    }
}

/// Samples fBm height over simplex noise.
pub struct HeightmapSampler {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapSampler {
    pub fn new(params: HeightmapParams) -> Self {
        let noise = Simplex::new(params.seed as u32);
        Self { noise, params }
    }

    /// `(frequency, amplitude)` of each octave, lowest first.
    fn octaves(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let p = &self.params;
        std::iter::successors(Some((p.base_frequency, p.amplitude)), |&(f, a)| {
            Some((f * p.lacunarity, a * p.persistence))
        })
        .take(p.octaves as usize)
    }

    /// Sample at world `(x, z)`.
    ///
    /// The result lies within `[-max_amplitude, max_amplitude]`.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        self.octaves()
            .map(|(f, a)| self.noise.get([x * f, z * f]) * a)
            .sum()
    }

    /// Largest magnitude [`sample`](Self::sample) can return.
    pub fn max_amplitude(&self) -> f64 {
        self.octaves().map(|(_, a)| a.abs()).sum()
    }

    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_determinism_same_seed_same_coord() {
        let params = HeightmapParams {
            seed: 42,
            ..Default::default()
        };
        let a = HeightmapSampler::new(params.clone());
        let b = HeightmapSampler::new(params);
        assert!((a.sample(100.0, 200.0) - b.sample(100.0, 200.0)).abs() < EPSILON);
    }

    #[test]
    fn test_different_seeds_produce_different_heights() {
        let a = HeightmapSampler::new(HeightmapParams {
            seed: 1,
            ..Default::default()
        });
        let b = HeightmapSampler::new(HeightmapParams {
            seed: 999,
            ..Default::default()
        });
        let h1 = a.sample(500.0, 500.0);
        let h2 = b.sample(500.0, 500.0);
        assert!(
            (h1 - h2).abs() > EPSILON,
            "Different seeds should produce different heights: {h1} vs {h2}"
        );
    }

    #[test]
    fn test_height_within_expected_range() {
        let sampler = HeightmapSampler::new(HeightmapParams::default());
        let max_amp = sampler.max_amplitude();
        for x in (0..60).map(|i| i as f64 * 17.0) {
            for z in (0..60).map(|i| i as f64 * 13.0) {
                let h = sampler.sample(x, z);
                assert!(h.abs() <= max_amp + EPSILON, "{h} exceeds {max_amp}");
            }
        }
    }

    #[test]
    fn test_max_amplitude_calculation() {
        let sampler = HeightmapSampler::new(HeightmapParams {
            amplitude: 1000.0,
            persistence: 0.5,
            octaves: 4,
            ..Default::default()
        });
        assert!((sampler.max_amplitude() - 1875.0).abs() < EPSILON);
    }

    #[test]
    fn test_with_octaves_truncates() {
        let params = HeightmapParams {
            octaves: 6,
            ..Default::default()
        };
        assert_eq!(params.with_octaves(2).octaves, 2);
        assert_eq!(params.with_octaves(10).octaves, 6);
    }

    #[test]
    fn test_zero_amplitude_returns_zero() {
        let sampler = HeightmapSampler::new(HeightmapParams {
            amplitude: 0.0,
            ..Default::default()
        });
        assert!(sampler.sample(123.0, 456.0).abs() < EPSILON);
    }
}
