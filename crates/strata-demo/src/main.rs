//! Strata demo: walks a viewpoint across procedural terrain without a GPU.
//!
//! Loads (or creates) `config.ron`, applies CLI overrides, then drives a
//! [`TerrainManager`] against a [`HeadlessBackend`] for `--steps` updates,
//! digging and raising terrain along the way and logging ring statistics.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_config::{CliArgs, Config};
use strata_mesh::HeadlessBackend;
use strata_stream::TerrainManager;
use strata_terrain::{
    BiomeId, HeightmapParams, NoiseBiomeProvider, NoiseTerrain, ObjectSpawner, ObjectTypeId,
    PoissonSpawner,
};
use strata_voxel::Falloff;
use tracing::{info, warn};

/// Simulated frame time.
const DT: f32 = 1.0 / 60.0;
/// Steps between brush strokes.
const EDIT_INTERVAL: u32 = 90;
/// Steps between stats lines.
const REPORT_INTERVAL: u32 = 60;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args
        .config
        .clone()
        .or_else(strata_config::default_config_dir)
        .unwrap_or_else(|| PathBuf::from("strata"));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        seed = config.world.seed,
        config_dir = %config_dir.display(),
        "Strata demo starting"
    );

    let mut manager = match build_manager(&config) {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!("Failed to build terrain: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut backend = HeadlessBackend::new();
    walk(&mut manager, &mut backend, &args, config.world.seed);
    manager.shutdown();

    info!(
        uploads = backend.uploads,
        updates = backend.updates,
        releases = backend.releases,
        live = backend.live_meshes(),
        "Strata demo finished"
    );
    ExitCode::SUCCESS
}

fn build_manager(config: &Config) -> Result<TerrainManager, strata_terrain::BiomeRegistryError> {
    let world = &config.world;
    let params = HeightmapParams {
        seed: world.seed,
        octaves: world.octaves,
        lacunarity: world.lacunarity,
        persistence: world.persistence,
        base_frequency: world.base_frequency,
        amplitude: world.amplitude,
    };
    let terrain = Arc::new(NoiseTerrain::new(params, world.base_height));
    let biomes = Arc::new(NoiseBiomeProvider::with_default_biomes(
        world.seed,
        world.biome_temp_frequency,
        world.biome_moisture_frequency,
    )?);

    // Rocks everywhere, trees in the two wetter biomes.
    let mut spawner = PoissonSpawner::new(6.0).with_max_slope(0.8);
    for id in 0..5 {
        let mut table = vec![(ObjectTypeId(0), 0.05)];
        if matches!(id, 2 | 3) {
            table.insert(0, (ObjectTypeId(1), 0.3));
        }
        spawner = spawner.with_objects(BiomeId(id), table);
    }
    let spawner: Arc<dyn ObjectSpawner> = Arc::new(spawner);

    Ok(TerrainManager::new(config, terrain, biomes, Some(spawner)))
}

/// Move in a slow arc at `args.speed`, following the ground.
fn walk(manager: &mut TerrainManager, backend: &mut HeadlessBackend, args: &CliArgs, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut position = Vec3::new(0.0, manager.sample_height(0.0, 0.0) + 2.0, 0.0);
    let mut heading = 0.0_f32;

    for step in 0..args.steps {
        heading += 0.15 * DT;
        let forward = Vec3::new(heading.cos(), 0.0, heading.sin());
        position += forward * args.speed * DT;
        position.y = manager.sample_height(position.x, position.z) + 2.0;

        manager.update_around(position, DT, backend);

        if step > 0 && step % EDIT_INTERVAL == 0 {
            let offset = Vec3::new(rng.random_range(-6.0..6.0), 0.0, rng.random_range(-6.0..6.0));
            let mut center = position + forward * 8.0 + offset;
            center.y = manager.sample_height(center.x, center.z);
            let radius = rng.random_range(2.0..5.0);
            let report = if rng.random_bool(0.7) {
                manager.dig_sphere(center, radius, 1.5, Falloff::Cosine)
            } else {
                manager.place_sphere(center, radius, 1.0, Falloff::Linear)
            };
            if report.is_empty() {
                warn!(x = center.x, z = center.z, "Brush stroke touched no loaded chunk");
            } else {
                info!(
                    version = report.version,
                    chunks = report.touched.len(),
                    x = center.x,
                    z = center.z,
                    "Applied brush stroke"
                );
            }
        }

        backend.begin_frame();
        let drawn = manager.render(position, backend);

        if step % REPORT_INTERVAL == 0 {
            let stats = manager.stats();
            let biome = manager
                .biome_at(position.x, position.z)
                .map_or("unknown", |b| b.name.as_str());
            info!(
                step,
                x = position.x,
                z = position.z,
                biome,
                editable = stats.editable_chunks,
                read_only = stats.read_only_chunks,
                low_lod = stats.low_lod_chunks,
                radii = ?stats.radii,
                speed = stats.speed,
                pending = stats.pending_generation,
                mesh_pending = stats.mesh_pending,
                live = stats.live_meshes,
                draws = drawn.total(),
                missing = drawn.missing,
                "Terrain stats"
            );
        }
    }
}
