//! The biome-at-position boundary and dominant-biome voting.

use hashbrown::HashMap;

use super::{
    BiomeDef, BiomeId, BiomeRegistry, BiomeRegistryError, BiomeSampler, NoiseOverlay,
    SurfaceTexture, WhittakerDiagram, WhittakerRegion,
};

/// Answers "which biome is at world `(x, z)`".
pub trait BiomeProvider: Send + Sync {
    fn biome_at(&self, x: f64, z: f64) -> BiomeId;

    fn def(&self, id: BiomeId) -> Option<&BiomeDef>;

    fn def_at(&self, x: f64, z: f64) -> Option<&BiomeDef> {
        self.def(self.biome_at(x, z))
    }
}

/// Registry plus noise sampler.
pub struct NoiseBiomeProvider {
    registry: BiomeRegistry,
    sampler: BiomeSampler,
}

impl NoiseBiomeProvider {
    pub fn new(registry: BiomeRegistry, sampler: BiomeSampler) -> Self {
        Self { registry, sampler }
    }

    /// Five-biome world: tundra, desert, plains, forest, highlands.
    pub fn with_default_biomes(
        seed: u64,
        temp_frequency: f64,
        moisture_frequency: f64,
    ) -> Result<Self, BiomeRegistryError> {
        let mut registry = BiomeRegistry::new();
        let texture = |name: &str, tiling| SurfaceTexture {
            name: name.to_string(),
            tiling,
        };

        let tundra = registry.register(BiomeDef {
            textures: vec![texture("snow", 8.0), texture("gravel", 4.0)],
            ..BiomeDef::plain("tundra", 0.3, 0.05)
        })?;
        let desert = registry.register(BiomeDef {
            overlay: Some(NoiseOverlay {
                amplitude: 2.0,
                frequency: 0.03,
                octaves: 2,
            }),
            textures: vec![texture("sand", 6.0)],
            ..BiomeDef::plain("desert", 0.2, 0.02)
        })?;
        let plains = registry.register(BiomeDef {
            textures: vec![texture("grass", 8.0), texture("dirt", 4.0)],
            ..BiomeDef::plain("plains", 0.15, 0.35)
        })?;
        let forest = registry.register(BiomeDef {
            textures: vec![texture("forest_floor", 6.0), texture("moss", 4.0)],
            ..BiomeDef::plain("forest", 0.4, 0.9)
        })?;
        let highlands = registry.register(BiomeDef {
            overlay: Some(NoiseOverlay {
                amplitude: 12.0,
                frequency: 0.01,
                octaves: 4,
            }),
            textures: vec![texture("rock", 12.0), texture("scree", 6.0)],
            ..BiomeDef::plain("highlands", 0.9, 0.2)
        })?;

        let region = |temp_min, temp_max, moisture_min, moisture_max, biome_id| WhittakerRegion {
            temp_min,
            temp_max,
            moisture_min,
            moisture_max,
            biome_id,
        };
        let diagram = WhittakerDiagram {
            regions: vec![
                region(0.0, 0.3, 0.0, 1.0, tundra),
                region(0.7, 1.0, 0.0, 0.35, desert),
                region(0.3, 0.7, 0.0, 0.5, plains),
                region(0.3, 1.0, 0.5, 0.8, forest),
                region(0.3, 1.0, 0.8, 1.0, highlands),
            ],
            fallback: plains,
        };

        let sampler =
            BiomeSampler::new(seed, diagram).with_frequencies(temp_frequency, moisture_frequency);
        Ok(Self::new(registry, sampler))
    }

    pub fn registry(&self) -> &BiomeRegistry {
        &self.registry
    }

    pub fn sampler(&self) -> &BiomeSampler {
        &self.sampler
    }
}

impl BiomeProvider for NoiseBiomeProvider {
    fn biome_at(&self, x: f64, z: f64) -> BiomeId {
        self.sampler.sample(x, z).0
    }

    fn def(&self, id: BiomeId) -> Option<&BiomeDef> {
        self.registry.get(id)
    }
}

/// The two most frequent biomes over a `samples_per_side^2` grid spanning a
/// square footprint starting at `origin`.
///
/// Ties go to the lower [`BiomeId`]. The secondary is `None` when only one
/// biome was sampled.
pub fn dominant_biomes(
    provider: &dyn BiomeProvider,
    origin: (f64, f64),
    world_size: f64,
    samples_per_side: usize,
) -> (BiomeId, Option<BiomeId>) {
    let n = samples_per_side.max(1);
    let step = if n > 1 {
        world_size / (n - 1) as f64
    } else {
        0.0
    };
    let offset = if n > 1 { 0.0 } else { world_size * 0.5 };

    let mut counts: HashMap<BiomeId, u32> = HashMap::new();
    for j in 0..n {
        for i in 0..n {
            let x = origin.0 + offset + i as f64 * step;
            let z = origin.1 + offset + j as f64 * step;
            *counts.entry(provider.biome_at(x, z)).or_default() += 1;
        }
    }

    let mut ranked: Vec<(BiomeId, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let primary = ranked.first().map_or(BiomeId::default(), |e| e.0);
    let secondary = ranked.get(1).map(|e| e.0);
    (primary, secondary)
}

/// Most frequent biome over the footprint. See [`dominant_biomes`].
pub fn dominant_biome(
    provider: &dyn BiomeProvider,
    origin: (f64, f64),
    world_size: f64,
    samples_per_side: usize,
) -> BiomeId {
    dominant_biomes(provider, origin, world_size, samples_per_side).0
}
