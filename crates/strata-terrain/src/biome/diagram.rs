//! Whittaker diagram: maps (temperature, moisture) pairs to biome IDs.

use super::BiomeId;

/// A rectangular region in temperature-moisture space mapped to a biome.
#[derive(Clone, Debug)]
pub struct WhittakerRegion {
    /// Minimum temperature (inclusive), in `[0.0, 1.0]`.
    pub temp_min: f64,
    /// Maximum temperature (exclusive), in `[0.0, 1.0]`.
    pub temp_max: f64,
    /// Minimum moisture (inclusive), in `[0.0, 1.0]`.
    pub moisture_min: f64,
    /// Maximum moisture (exclusive), in `[0.0, 1.0]`.
    pub moisture_max: f64,
    /// Biome assigned to points within this region.
    pub biome_id: BiomeId,
}

impl WhittakerRegion {
    fn contains(&self, temperature: f64, moisture: f64) -> bool {
        (self.temp_min..self.temp_max).contains(&temperature)
            && (self.moisture_min..self.moisture_max).contains(&moisture)
    }
}

/// Ordered list of regions; first match wins, otherwise `fallback`.
#[derive(Clone, Debug)]
pub struct WhittakerDiagram {
    pub regions: Vec<WhittakerRegion>,
    pub fallback: BiomeId,
}

impl WhittakerDiagram {
    /// Biome for a temperature and moisture, both in `[0.0, 1.0]`.
    pub fn lookup(&self, temperature: f64, moisture: f64) -> BiomeId {
        self.regions
            .iter()
            .find(|r| r.contains(temperature, moisture))
            .map_or(self.fallback, |r| r.biome_id)
    }
}
