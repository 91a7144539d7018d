//! In-memory record of height edits per chunk, replayed when a chunk is
//! regenerated after being unloaded.

use rustc_hash::FxHashMap;
use strata_voxel::{ChunkKey, HeightGrid};

#[derive(Clone, Debug)]
struct ChunkEdits {
    side: usize,
    /// Accumulated height delta per vertex, row-major.
    deltas: Vec<f32>,
    /// Version of the most recent edit.
    version: u64,
}

/// Accumulated deltas keyed by chunk.
#[derive(Clone, Debug, Default)]
pub struct EditLog {
    chunks: FxHashMap<ChunkKey, ChunkEdits>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` at vertex `(i, j)` of a chunk with `side` vertices per side.
    pub fn add(&mut self, key: ChunkKey, side: usize, i: usize, j: usize, delta: f32) {
        let entry = self.chunks.entry(key).or_insert_with(|| ChunkEdits {
            side,
            deltas: vec![0.0; side * side],
            version: 0,
        });
        if entry.side != side || i >= side || j >= side {
            tracing::warn!(?key, i, j, side, "Edit outside logged chunk layout");
            return;
        }
        entry.deltas[j * side + i] += delta;
    }

    /// Record the version of the latest edit to `key`.
    pub fn set_version(&mut self, key: ChunkKey, version: u64) {
        if let Some(entry) = self.chunks.get_mut(&key) {
            entry.version = entry.version.max(version);
        }
    }

    /// Apply the logged deltas for `key` to `grid`. Returns the logged
    /// version, or `None` if the chunk was never edited.
    pub fn replay(&self, key: ChunkKey, grid: &mut HeightGrid) -> Option<u64> {
        let entry = self.chunks.get(&key)?;
        if entry.side != grid.side() {
            tracing::warn!(?key, "Edit log layout does not match chunk; skipping replay");
            return None;
        }
        for j in 0..entry.side {
            for i in 0..entry.side {
                let delta = entry.deltas[j * entry.side + i];
                if delta != 0.0 {
                    grid.add(i, j, delta);
                }
            }
        }
        Some(entry.version)
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    /// Number of chunks with edits.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
