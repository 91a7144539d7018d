//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level terrain configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Seed and procedural height/biome parameters.
    pub world: WorldConfig,
    /// Ring geometry and adaptive-radius tuning.
    pub rings: RingsConfig,
    /// Mesh build, blend and upload settings.
    pub mesh: MeshConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Seed and noise parameters for the procedural height and biome functions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed. Every generator derives its noise from this value.
    pub seed: u64,
    /// Number of fBm octaves for the base height field.
    pub octaves: u32,
    /// Frequency of the lowest octave (cycles per world unit).
    pub base_frequency: f64,
    /// Amplitude of the lowest octave, in world units.
    pub amplitude: f64,
    /// Height added to every sample, in world units.
    pub base_height: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Frequency of the biome temperature field.
    pub biome_temp_frequency: f64,
    /// Frequency of the biome moisture field.
    pub biome_moisture_frequency: f64,
}

/// Geometry and radius bounds for a single terrain ring.
///
/// Radii are in chunks of this ring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RingConfig {
    /// Cells per chunk side. A chunk stores `(chunk_size + 1)^2` heights.
    pub chunk_size: u32,
    /// World-space width of one cell.
    pub tile_size: f32,
    /// Radius used before speed/density/performance adjustments.
    pub base_radius: i32,
    /// Lower clamp for the adapted radius.
    pub min_radius: i32,
    /// Upper clamp for the adapted radius.
    pub max_radius: i32,
}

impl RingConfig {
    /// World-space width of one chunk of this ring.
    pub fn chunk_world_size(&self) -> f32 {
        self.chunk_size as f32 * self.tile_size
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 32,
            tile_size: 1.0,
            base_radius: 2,
            min_radius: 1,
            max_radius: 4,
        }
    }
}

/// Ring layout plus the adaptive-radius and update-cadence tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RingsConfig {
    /// Near, mutable ring.
    pub editable: RingConfig,
    /// Mid-distance procedural ring.
    pub read_only: RingConfig,
    /// Far, coarse ring.
    pub low_lod: RingConfig,
    /// Frame rate the adaptive radii try to hold.
    pub fps_target: f32,
    /// Chunks removed from the mid/far radii per unit of biome density above 0.5.
    pub density_penalty: f32,
    /// Converts smoothed speed (world units per second) into chunks.
    pub speed_to_chunk_scale: f32,
    /// The read-only ring is repositioned every Nth update, the low-LOD ring every 2Nth.
    pub read_only_update_stride: u32,
    /// Movement below this distance reuses the previous radii.
    pub movement_epsilon: f32,
    /// Exponential smoothing factor for the frame delta, in `(0, 1]`.
    pub dt_smoothing: f32,
    /// Exponential smoothing factor for the viewpoint speed, in `(0, 1]`.
    pub speed_smoothing: f32,
    /// Forward-prediction horizon in seconds.
    pub lookahead_seconds: f32,
    /// Keep per-chunk edit deltas and replay them when a chunk reloads.
    pub persist_edits: bool,
    /// Generate editable chunks on the background job scheduler.
    pub background_generation: bool,
    /// Ask the object spawner for placements when a chunk loads.
    pub spawn_objects: bool,
    /// Apply the dominant biome's noise overlay to generated height grids.
    pub apply_biome_overlay: bool,
}

impl Default for RingsConfig {
    fn default() -> Self {
        Self {
            editable: RingConfig {
                chunk_size: 32,
                tile_size: 1.0,
                base_radius: 2,
                min_radius: 1,
                max_radius: 3,
            },
            read_only: RingConfig {
                chunk_size: 32,
                tile_size: 4.0,
                base_radius: 3,
                min_radius: 2,
                max_radius: 6,
            },
            low_lod: RingConfig {
                chunk_size: 16,
                tile_size: 32.0,
                base_radius: 5,
                min_radius: 3,
                max_radius: 10,
            },
            fps_target: 60.0,
            density_penalty: 2.0,
            speed_to_chunk_scale: 0.05,
            read_only_update_stride: 4,
            movement_epsilon: 0.01,
            dt_smoothing: 0.1,
            speed_smoothing: 0.2,
            lookahead_seconds: 1.0,
            persist_edits: true,
            background_generation: true,
            spawn_objects: true,
            apply_biome_overlay: true,
        }
    }
}

/// Mesh build, blending and upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshConfig {
    /// Completed off-thread builds uploaded per update.
    pub max_mesh_builds_per_frame: u32,
    /// Mesh worker threads (0 = derive from the CPU count).
    pub worker_threads: u32,
    /// Maximum builds queued or executing at once.
    pub build_budget: u32,
    /// World units per texture repeat.
    pub uv_scale: f32,
    /// Number of sample rings used for the biome blend weight.
    pub blend_sample_rings: u32,
    /// Samples per blend ring.
    pub blend_samples_per_ring: u32,
    /// Foreign-biome fraction at which blending starts.
    pub blend_threshold_low: f32,
    /// Foreign-biome fraction at which blending saturates.
    pub blend_threshold_high: f32,
    /// Camera distance covered by each texture mip level.
    pub mip_distance: f32,
    /// Highest mip level requested from the texture source.
    pub max_mip_level: u32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            max_mesh_builds_per_frame: 4,
            worker_threads: 0,
            build_budget: 64,
            uv_scale: 8.0,
            blend_sample_rings: 2,
            blend_samples_per_ring: 6,
            blend_threshold_low: 0.1,
            blend_threshold_high: 0.6,
            mip_distance: 256.0,
            max_mip_level: 4,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter override (e.g. "debug", "info,strata_stream=trace").
    pub log_level: String,
    /// Also write JSON logs to a file in debug builds.
    pub log_to_file: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            octaves: 5,
            base_frequency: 0.004,
            amplitude: 24.0,
            base_height: 32.0,
            persistence: 0.5,
            lacunarity: 2.0,
            biome_temp_frequency: 0.0015,
            biome_moisture_frequency: 0.002,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded terrain config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default terrain config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Terrain config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }
}
