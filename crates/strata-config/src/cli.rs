//! Command-line argument parsing for the terrain demo and tools.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Streaming deformable terrain")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace) or a full filter string.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base radius of the editable ring, in chunks.
    #[arg(long)]
    pub editable_radius: Option<i32>,

    /// Maximum mesh uploads per update.
    #[arg(long)]
    pub max_mesh_builds: Option<u32>,

    /// Number of simulation steps to run.
    #[arg(long, default_value_t = 600)]
    pub steps: u32,

    /// Viewpoint speed in world units per second.
    #[arg(long, default_value_t = 12.0)]
    pub speed: f32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(radius) = args.editable_radius {
            let ring = &mut self.rings.editable;
            ring.base_radius = radius;
            ring.min_radius = ring.min_radius.min(radius);
            ring.max_radius = ring.max_radius.max(radius);
        }
        if let Some(max) = args.max_mesh_builds {
            self.mesh.max_mesh_builds_per_frame = max;
        }
    }
}
