use strata_voxel::ChunkKey;

/// Failure while generating one chunk.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The height function produced NaN or infinity.
    #[error("non-finite height at vertex ({i}, {j}) of chunk {key:?}")]
    NonFiniteHeight { key: ChunkKey, i: usize, j: usize },
    /// The generation code panicked; the panic was caught at the job boundary.
    #[error("generation of chunk {key:?} panicked: {message}")]
    Panicked { key: ChunkKey, message: String },
}

/// Errors returned by the chunk job scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("chunk job scheduler has been stopped")]
    Stopped,
}
