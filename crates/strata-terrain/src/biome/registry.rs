//! Biome registry: maps [`BiomeId`] to [`BiomeDef`] with name-based lookup.

use hashbrown::HashMap;

use super::BiomeDef;

/// Unique identifier for a biome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BiomeId(pub u16);

/// Errors that can occur when registering biomes.
#[derive(Debug, thiserror::Error)]
pub enum BiomeRegistryError {
    /// A biome with this name is already registered.
    #[error("duplicate biome name: {0}")]
    DuplicateName(String),
}

/// All registered biome definitions, indexed by ID.
#[derive(Clone, Debug, Default)]
pub struct BiomeRegistry {
    biomes: Vec<BiomeDef>,
    name_to_id: HashMap<String, BiomeId>,
}

impl BiomeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new biome definition, returning its assigned [`BiomeId`].
    ///
    /// # Errors
    ///
    /// Returns [`BiomeRegistryError::DuplicateName`] if a biome with the same name exists.
    pub fn register(&mut self, def: BiomeDef) -> Result<BiomeId, BiomeRegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(BiomeRegistryError::DuplicateName(def.name.clone()));
        }
        let id = BiomeId(self.biomes.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.biomes.push(def);
        Ok(id)
    }

    /// Definition for `id`, or `None` if it was never registered.
    pub fn get(&self, id: BiomeId) -> Option<&BiomeDef> {
        self.biomes.get(id.0 as usize)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<BiomeId> {
        self.name_to_id.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Iterates `(id, def)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (BiomeId, &BiomeDef)> {
        self.biomes
            .iter()
            .enumerate()
            .map(|(i, def)| (BiomeId(i as u16), def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut reg = BiomeRegistry::new();
        let a = reg.register(BiomeDef::plain("plains", 0.2, 0.4)).unwrap();
        let b = reg.register(BiomeDef::plain("desert", 0.1, 0.0)).unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.lookup_by_name("desert"), Some(b));
        assert_eq!(reg.get(a).map(|d| d.name.as_str()), Some("plains"));
        assert!(reg.get(BiomeId(99)).is_none());
        assert_eq!(reg.iter().count(), 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut reg = BiomeRegistry::new();
        reg.register(BiomeDef::plain("desert", 0.0, 0.0)).unwrap();
        let result = reg.register(BiomeDef::plain("desert", 0.5, 0.5));
        assert!(matches!(result, Err(BiomeRegistryError::DuplicateName(name)) if name == "desert"));
        assert_eq!(reg.len(), 1);
    }
}
