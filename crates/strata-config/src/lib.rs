//! Configuration system for the Strata terrain streamer.
//!
//! Ring radii, tile and chunk sizes, adaptive-radius tuning, mesh upload caps
//! and the world seed live in one explicit [`Config`] value that is built once
//! at startup and passed to every component. Settings persist to disk as RON,
//! can be overridden from the command line via clap, and support hot-reload
//! detection.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, MeshConfig, RingConfig, RingsConfig, WorldConfig};
pub use error::ConfigError;

/// Default configuration directory (`<platform config dir>/strata`).
///
/// Returns `None` on platforms without a config directory.
pub fn default_config_dir() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("strata"))
}
