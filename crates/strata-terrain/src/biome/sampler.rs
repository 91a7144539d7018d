//! Biome sampler: simplex temperature and moisture fields fed into a
//! [`WhittakerDiagram`].

use noise::{NoiseFn, Simplex};

use super::{BiomeId, WhittakerDiagram};

/// Samples biomes at world `(x, z)` positions.
pub struct BiomeSampler {
    temp_noise: Simplex,
    moisture_noise: Simplex,
    diagram: WhittakerDiagram,
    /// Frequency for temperature noise. Lower values produce broader zones.
    pub temp_frequency: f64,
    /// Frequency for moisture noise.
    pub moisture_frequency: f64,
}

impl BiomeSampler {
    /// Creates a sampler with decorrelated temperature and moisture seeds.
    pub fn new(seed: u64, diagram: WhittakerDiagram) -> Self {
        Self {
            temp_noise: Simplex::new(seed as u32),
            moisture_noise: Simplex::new(seed.wrapping_add(0xDEAD_BEEF) as u32),
            diagram,
            temp_frequency: 0.0015,
            moisture_frequency: 0.002,
        }
    }

    /// Replace both noise frequencies.
    pub fn with_frequencies(mut self, temp_frequency: f64, moisture_frequency: f64) -> Self {
        self.temp_frequency = temp_frequency;
        self.moisture_frequency = moisture_frequency;
        self
    }

    /// Returns `(biome_id, temperature, moisture)`, the latter two in `[0, 1]`.
    pub fn sample(&self, x: f64, z: f64) -> (BiomeId, f64, f64) {
        let temp_raw = self
            .temp_noise
            .get([x * self.temp_frequency, z * self.temp_frequency]);
        let moisture_raw = self
            .moisture_noise
            .get([x * self.moisture_frequency, z * self.moisture_frequency]);

        // [-1, 1] -> [0, 1]
        let temperature = ((temp_raw + 1.0) * 0.5).clamp(0.0, 1.0);
        let moisture = ((moisture_raw + 1.0) * 0.5).clamp(0.0, 1.0);

        (self.diagram.lookup(temperature, moisture), temperature, moisture)
    }

    pub fn diagram(&self) -> &WhittakerDiagram {
        &self.diagram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::WhittakerRegion;

    fn quadrant_diagram() -> WhittakerDiagram {
        let region = |t0, t1, m0, m1, id| WhittakerRegion {
            temp_min: t0,
            temp_max: t1,
            moisture_min: m0,
            moisture_max: m1,
            biome_id: BiomeId(id),
        };
        WhittakerDiagram {
            regions: vec![
                region(0.0, 0.5, 0.0, 0.5, 0),
                region(0.5, 1.0, 0.0, 0.5, 1),
                region(0.0, 0.5, 0.5, 1.0, 2),
                region(0.5, 1.0, 0.5, 1.0, 3),
            ],
            fallback: BiomeId(3),
        }
    }

    #[test]
    fn test_lookup_quadrants() {
        let d = quadrant_diagram();
        assert_eq!(d.lookup(0.1, 0.1), BiomeId(0));
        assert_eq!(d.lookup(0.9, 0.1), BiomeId(1));
        assert_eq!(d.lookup(0.1, 0.9), BiomeId(2));
        // Upper bounds are exclusive, so 1.0 falls back.
        assert_eq!(d.lookup(1.0, 1.0), BiomeId(3));
    }

    #[test]
    fn test_sampler_deterministic_and_normalized() {
        let a = BiomeSampler::new(42, quadrant_diagram());
        let b = BiomeSampler::new(42, quadrant_diagram());
        for i in 0..200 {
            let (x, z) = (i as f64 * 37.0, i as f64 * -53.0);
            let (id_a, t_a, m_a) = a.sample(x, z);
            let (id_b, t_b, m_b) = b.sample(x, z);
            assert_eq!(id_a, id_b);
            assert_eq!(t_a, t_b);
            assert_eq!(m_a, m_b);
            assert!((0.0..=1.0).contains(&t_a));
            assert!((0.0..=1.0).contains(&m_a));
        }
    }

    #[test]
    fn test_boundaries_are_smooth_along_a_line() {
        let sampler = BiomeSampler::new(9, quadrant_diagram());
        let mut transitions = 0;
        let (mut prev, _, _) = sampler.sample(0.0, 0.0);
        for i in 1..=1000 {
            let (id, _, _) = sampler.sample(i as f64, 0.0);
            if id != prev {
                transitions += 1;
                prev = id;
            }
        }
        assert!(transitions < 20, "too many transitions: {transitions}");
    }
}
