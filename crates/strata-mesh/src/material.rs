//! Terrain material selection.
//!
//! A material pairs the dominant biome's albedo with an optional secondary
//! biome's albedo for the two-texture blend. Materials are cached by biome
//! pair; textures are resolved lazily per `(biome, mip)` through a
//! [`TextureSource`].

use rustc_hash::FxHashMap;
use strata_terrain::{BiomeId, BiomeProvider, SurfaceTexture};

/// Cache key for a terrain material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialKey {
    pub primary: BiomeId,
    pub secondary: Option<BiomeId>,
}

/// Handle to a loaded texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Loads albedo textures. Implemented by the asset layer.
pub trait TextureSource {
    /// Load `texture` at `mip`. `None` if the texture is unavailable.
    fn load_albedo(&mut self, texture: &SurfaceTexture, mip: u8) -> Option<TextureId>;
}

/// Texture source that hands out sequential ids and counts loads.
#[derive(Debug, Default)]
pub struct SequentialTextureSource {
    next: u32,
    pub loads: usize,
}

impl TextureSource for SequentialTextureSource {
    fn load_albedo(&mut self, _texture: &SurfaceTexture, _mip: u8) -> Option<TextureId> {
        self.loads += 1;
        self.next += 1;
        Some(TextureId(self.next))
    }
}

/// A resolved terrain material.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainMaterial {
    pub key: MaterialKey,
    pub primary_albedo: Option<TextureId>,
    pub secondary_albedo: Option<TextureId>,
    pub mip_level: u8,
}

/// Mip level for a camera distance: one level per doubling past
/// `mip_distance`, clamped to `[0, max_level]`.
pub fn mip_level_for_distance(distance: f32, mip_distance: f32, max_level: u8) -> u8 {
    if mip_distance <= 0.0 || distance <= mip_distance || !distance.is_finite() {
        return 0;
    }
    let level = (distance / mip_distance).log2().floor();
    (level as u32).min(max_level as u32) as u8
}

/// Caches materials by biome pair and textures by `(biome, mip)`.
#[derive(Debug, Default)]
pub struct MaterialCache {
    materials: FxHashMap<(MaterialKey, u8), TerrainMaterial>,
    textures: FxHashMap<(BiomeId, u8), Option<TextureId>>,
}

impl MaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the material for `key` at `mip`, loading textures on first use.
    pub fn resolve(
        &mut self,
        key: MaterialKey,
        mip: u8,
        biomes: &dyn BiomeProvider,
        source: &mut dyn TextureSource,
    ) -> &TerrainMaterial {
        if !self.materials.contains_key(&(key, mip)) {
            let primary_albedo = self.texture(key.primary, mip, biomes, source);
            let secondary_albedo = key
                .secondary
                .and_then(|id| self.texture(id, mip, biomes, source));
            self.materials.insert(
                (key, mip),
                TerrainMaterial {
                    key,
                    primary_albedo,
                    secondary_albedo,
                    mip_level: mip,
                },
            );
        }
        &self.materials[&(key, mip)]
    }

    fn texture(
        &mut self,
        biome: BiomeId,
        mip: u8,
        biomes: &dyn BiomeProvider,
        source: &mut dyn TextureSource,
    ) -> Option<TextureId> {
        *self.textures.entry((biome, mip)).or_insert_with(|| {
            let texture = biomes.def(biome).and_then(|def| def.textures.first());
            match texture {
                Some(texture) => source.load_albedo(texture, mip),
                None => {
                    tracing::debug!(?biome, "Biome has no surface texture");
                    None
                }
            }
        })
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_terrain::BiomeDef;

    struct Two(Vec<BiomeDef>);

    impl BiomeProvider for Two {
        fn biome_at(&self, _x: f64, _z: f64) -> BiomeId {
            BiomeId(0)
        }

        fn def(&self, id: BiomeId) -> Option<&BiomeDef> {
            self.0.get(id.0 as usize)
        }
    }

    fn biomes() -> Two {
        let bare = BiomeDef {
            textures: Vec::new(),
            ..BiomeDef::plain("bare", 0.0, 0.0)
        };
        Two(vec![
            BiomeDef::plain("grass", 0.0, 0.0),
            BiomeDef::plain("sand", 0.0, 0.0),
            bare,
        ])
    }

    #[test]
    fn test_mip_levels() {
        assert_eq!(mip_level_for_distance(10.0, 64.0, 4), 0);
        assert_eq!(mip_level_for_distance(64.0, 64.0, 4), 0);
        assert_eq!(mip_level_for_distance(130.0, 64.0, 4), 1);
        assert_eq!(mip_level_for_distance(300.0, 64.0, 4), 2);
        assert_eq!(mip_level_for_distance(1.0e6, 64.0, 4), 4);
        assert_eq!(mip_level_for_distance(100.0, 0.0, 4), 0);
    }

    #[test]
    fn test_materials_cached_by_key() {
        let biomes = biomes();
        let mut source = SequentialTextureSource::default();
        let mut cache = MaterialCache::new();
        let key = MaterialKey {
            primary: BiomeId(0),
            secondary: Some(BiomeId(1)),
        };

        let first = cache.resolve(key, 0, &biomes, &mut source).clone();
        let again = cache.resolve(key, 0, &biomes, &mut source).clone();
        assert_eq!(first, again);
        assert!(first.primary_albedo.is_some() && first.secondary_albedo.is_some());
        assert_ne!(first.primary_albedo, first.secondary_albedo);
        assert_eq!(source.loads, 2);
        assert_eq!(cache.material_count(), 1);
    }

    #[test]
    fn test_textures_shared_between_materials() {
        let biomes = biomes();
        let mut source = SequentialTextureSource::default();
        let mut cache = MaterialCache::new();
        let solo = MaterialKey {
            primary: BiomeId(0),
            secondary: None,
        };
        let pair = MaterialKey {
            primary: BiomeId(1),
            secondary: Some(BiomeId(0)),
        };
        cache.resolve(solo, 1, &biomes, &mut source);
        cache.resolve(pair, 1, &biomes, &mut source);
        assert_eq!(source.loads, 2);
        assert_eq!(cache.texture_count(), 2);

        // A different mip level loads again.
        cache.resolve(solo, 2, &biomes, &mut source);
        assert_eq!(source.loads, 3);
    }

    #[test]
    fn test_missing_texture_is_none() {
        let biomes = biomes();
        let mut source = SequentialTextureSource::default();
        let mut cache = MaterialCache::new();
        let key = MaterialKey {
            primary: BiomeId(2),
            secondary: Some(BiomeId(9)),
        };
        let material = cache.resolve(key, 0, &biomes, &mut source);
        assert_eq!(material.primary_albedo, None);
        assert_eq!(material.secondary_albedo, None);
        assert_eq!(source.loads, 0);
    }
}
