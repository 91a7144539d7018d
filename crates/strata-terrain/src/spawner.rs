//! Object placement: the spawner boundary, Poisson disk candidates, and the
//! dominant-biome filter applied to every spawned chunk.

use glam::Vec3;
use hashbrown::HashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_voxel::HeightGrid;

use crate::biome::{BiomeId, BiomeProvider};
use crate::generator::TerrainGenerator;

/// Identifier for an object archetype (tree, boulder, ruin, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectTypeId(pub u32);

/// A placed object instance on the terrain surface.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedObject {
    pub object_type: ObjectTypeId,
    /// World-space anchor (base) position.
    pub position: Vec3,
    /// Rotation around the vertical axis, in radians.
    pub rotation: f32,
    pub scale: f32,
}

/// Places objects on a generated chunk.
pub trait ObjectSpawner: Send + Sync {
    /// Candidate objects for the chunk whose dominant biome is `biome`.
    fn spawn(
        &self,
        biome: BiomeId,
        terrain: &dyn TerrainGenerator,
        grid: &HeightGrid,
        origin: (f32, f32),
        tile_size: f32,
        chunk_seed: u64,
    ) -> Vec<PlacedObject>;
}

/// Keep only objects whose own sampled biome is `dominant`.
pub fn filter_to_biome(
    objects: Vec<PlacedObject>,
    dominant: BiomeId,
    provider: &dyn BiomeProvider,
) -> Vec<PlacedObject> {
    objects
        .into_iter()
        .filter(|o| provider.biome_at(o.position.x as f64, o.position.z as f64) == dominant)
        .collect()
}

/// Poisson disk points within a rectangle (Mitchell's best candidate).
///
/// - `min_distance`: minimum distance between any two points
/// - `max_attempts`: candidates tested per accepted point
pub fn poisson_disk_2d(
    seed: u64,
    region_min: (f64, f64),
    region_max: (f64, f64),
    min_distance: f64,
    max_attempts: u32,
) -> Vec<(f64, f64)> {
    if min_distance <= 0.0 || region_max.0 <= region_min.0 || region_max.1 <= region_min.1 {
        return Vec::new();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points: Vec<(f64, f64)> = Vec::new();

    let area = (region_max.0 - region_min.0) * (region_max.1 - region_min.1);
    let max_points = (area / (min_distance * min_distance * 0.7)) as usize;

    for _ in 0..max_points {
        let mut best_candidate = None;
        let mut best_distance = 0.0f64;

        for _ in 0..max_attempts {
            let x = rng.random_range(region_min.0..region_max.0);
            let z = rng.random_range(region_min.1..region_max.1);

            let nearest = points
                .iter()
                .map(|&(px, pz)| ((x - px).powi(2) + (z - pz).powi(2)).sqrt())
                .fold(f64::INFINITY, f64::min);

            if nearest >= min_distance && nearest > best_distance {
                best_candidate = Some((x, z));
                best_distance = nearest;
            }
        }

        match best_candidate {
            Some(point) => points.push(point),
            // Saturated.
            None => break,
        }
    }

    points
}

/// Spawns objects at Poisson disk points using per-biome probability tables.
pub struct PoissonSpawner {
    min_spacing: f64,
    max_attempts: u32,
    /// Largest height change per world unit an object may stand on.
    max_slope: f32,
    scale_range: (f32, f32),
    tables: HashMap<BiomeId, Vec<(ObjectTypeId, f64)>>,
}

impl PoissonSpawner {
    pub fn new(min_spacing: f64) -> Self {
        Self {
            min_spacing,
            max_attempts: 16,
            max_slope: 1.0,
            scale_range: (0.8, 1.2),
            tables: HashMap::new(),
        }
    }

    /// Register `(object, probability)` pairs for a biome. The first
    /// successful roll per candidate point wins.
    pub fn with_objects(mut self, biome: BiomeId, objects: Vec<(ObjectTypeId, f64)>) -> Self {
        self.tables.insert(biome, objects);
        self
    }

    pub fn with_max_slope(mut self, max_slope: f32) -> Self {
        self.max_slope = max_slope;
        self
    }

    pub fn with_scale_range(mut self, min: f32, max: f32) -> Self {
        self.scale_range = (min.min(max), min.max(max));
        self
    }
}

impl ObjectSpawner for PoissonSpawner {
    fn spawn(
        &self,
        biome: BiomeId,
        terrain: &dyn TerrainGenerator,
        grid: &HeightGrid,
        origin: (f32, f32),
        tile_size: f32,
        chunk_seed: u64,
    ) -> Vec<PlacedObject> {
        let Some(table) = self.tables.get(&biome) else {
            return Vec::new();
        };
        let size = grid.size() as f64 * tile_size as f64;
        let min = (origin.0 as f64, origin.1 as f64);
        let max = (min.0 + size, min.1 + size);
        let candidates = poisson_disk_2d(chunk_seed, min, max, self.min_spacing, self.max_attempts);

        let mut rng = ChaCha8Rng::seed_from_u64(chunk_seed.rotate_left(17));
        let mut placed = Vec::new();
        for (x, z) in candidates {
            let lx = ((x - min.0) / tile_size as f64) as f32;
            let lz = ((z - min.1) / tile_size as f64) as f32;
            let height = grid.sample(lx, lz);

            let dx = terrain.height_at(x + 1.0, z) - terrain.height_at(x - 1.0, z);
            let dz = terrain.height_at(x, z + 1.0) - terrain.height_at(x, z - 1.0);
            if (dx * dx + dz * dz).sqrt() * 0.5 > self.max_slope {
                continue;
            }

            for &(object_type, probability) in table {
                if rng.random::<f64>() < probability {
                    let (lo, hi) = self.scale_range;
                    placed.push(PlacedObject {
                        object_type,
                        position: Vec3::new(x as f32, height, z as f32),
                        rotation: rng.random_range(0.0..std::f32::consts::TAU),
                        scale: if hi > lo { rng.random_range(lo..=hi) } else { lo },
                    });
                    break;
                }
            }
        }
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeDef;
    use crate::generator::FlatTerrain;

    struct HalfPlane {
        defs: Vec<BiomeDef>,
    }

    impl BiomeProvider for HalfPlane {
        fn biome_at(&self, x: f64, _z: f64) -> BiomeId {
            if x < 16.0 { BiomeId(0) } else { BiomeId(1) }
        }

        fn def(&self, id: BiomeId) -> Option<&BiomeDef> {
            self.defs.get(id.0 as usize)
        }
    }

    #[test]
    fn test_poisson_respects_min_distance() {
        let points = poisson_disk_2d(7, (0.0, 0.0), (64.0, 64.0), 5.0, 20);
        assert!(!points.is_empty());
        for (i, a) in points.iter().enumerate() {
            assert!(a.0 >= 0.0 && a.0 < 64.0 && a.1 >= 0.0 && a.1 < 64.0);
            for b in &points[i + 1..] {
                let d = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
                assert!(d >= 5.0, "points {a:?} and {b:?} too close: {d}");
            }
        }
    }

    #[test]
    fn test_poisson_deterministic() {
        let a = poisson_disk_2d(3, (0.0, 0.0), (32.0, 32.0), 4.0, 10);
        let b = poisson_disk_2d(3, (0.0, 0.0), (32.0, 32.0), 4.0, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_poisson_degenerate_region() {
        assert!(poisson_disk_2d(1, (0.0, 0.0), (0.0, 10.0), 1.0, 5).is_empty());
        assert!(poisson_disk_2d(1, (0.0, 0.0), (10.0, 10.0), 0.0, 5).is_empty());
    }

    #[test]
    fn test_spawner_places_on_surface() {
        let spawner = PoissonSpawner::new(3.0).with_objects(BiomeId(0), vec![(ObjectTypeId(1), 1.0)]);
        let grid = HeightGrid::flat(32, 12.0);
        let objects = spawner.spawn(BiomeId(0), &FlatTerrain(12.0), &grid, (0.0, 0.0), 1.0, 99);
        assert!(!objects.is_empty());
        for o in &objects {
            assert_eq!(o.object_type, ObjectTypeId(1));
            assert_eq!(o.position.y, 12.0);
            assert!((0.8..=1.2).contains(&o.scale));
        }
    }

    #[test]
    fn test_spawner_unknown_biome_is_empty() {
        let spawner = PoissonSpawner::new(3.0);
        let grid = HeightGrid::flat(8, 0.0);
        assert!(
            spawner
                .spawn(BiomeId(4), &FlatTerrain(0.0), &grid, (0.0, 0.0), 1.0, 1)
                .is_empty()
        );
    }

    #[test]
    fn test_filter_to_biome_discards_straddlers() {
        let provider = HalfPlane {
            defs: vec![BiomeDef::plain("a", 0.0, 0.0), BiomeDef::plain("b", 0.0, 0.0)],
        };
        let object = |x: f32| PlacedObject {
            object_type: ObjectTypeId(0),
            position: Vec3::new(x, 0.0, 0.0),
            rotation: 0.0,
            scale: 1.0,
        };
        let kept = filter_to_biome(vec![object(2.0), object(20.0), object(15.9)], BiomeId(0), &provider);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|o| o.position.x < 16.0));
    }
}
