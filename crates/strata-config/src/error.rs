//! Errors raised while loading, saving, or parsing terrain configuration.

use std::path::PathBuf;

/// Errors that can occur when loading, saving, or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read `config.ron` from disk.
    #[error("failed to read terrain config {path}: {source}")]
    ReadError {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the config directory or write `config.ron`.
    #[error("failed to write terrain config {path}: {source}")]
    WriteError {
        /// File or directory that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid RON for [`crate::Config`].
    #[error("failed to parse terrain config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize the config to RON.
    #[error("failed to serialize terrain config: {0}")]
    SerializeError(#[source] ron::Error),

    /// No `--config` path was given and the platform has no config directory.
    #[error("no config directory available on this platform")]
    NoConfigDir,
}
