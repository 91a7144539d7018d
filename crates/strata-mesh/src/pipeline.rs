//! Asynchronous heightfield mesh builds with bounded uploads.
//!
//! Builds run on worker threads from owned snapshots of the height grid.
//! The owning thread uploads at most a fixed number of finished meshes per
//! frame and discards any result that is not the latest build requested for
//! its key. Small edits skip the workers entirely and patch
//! the live mesh in place.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use glam::Mat4;
use rustc_hash::FxHashMap;
use strata_voxel::{ChunkKey, DirtyRect, HeightGrid};

use crate::backend::{MeshHandle, RenderBackend};
use crate::blend::BlendSampler;
use crate::heightfield::{TerrainMeshData, build_heightfield_mesh, patch_heightfield_mesh};
use crate::material::TerrainMaterial;

/// Identifies a mesh across rings: `layer` separates rings that share keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshKey {
    pub layer: u8,
    pub chunk: ChunkKey,
}

impl MeshKey {
    pub fn new(layer: u8, chunk: ChunkKey) -> Self {
        Self { layer, chunk }
    }
}

/// A self-contained build request.
#[derive(Clone)]
pub struct MeshBuildTask {
    pub key: MeshKey,
    /// Chunk version the snapshot was taken at.
    pub version: u64,
    pub grid: HeightGrid,
    pub origin: (f32, f32),
    pub tile_size: f32,
    pub uv_scale: f32,
    pub blend: Option<BlendSampler>,
}

/// A task tagged with the ticket it was submitted under.
struct MeshBuildJob {
    ticket: u64,
    task: MeshBuildTask,
}

struct MeshBuildResult {
    key: MeshKey,
    ticket: u64,
    version: u64,
    tile_size: f32,
    mesh: TerrainMeshData,
}

struct LiveMesh {
    handle: MeshHandle,
    version: u64,
    tile_size: f32,
    data: TerrainMeshData,
}

/// Counters reported by [`MeshBuildPipeline::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub in_flight: usize,
    pub pending: usize,
    pub live: usize,
    pub uploads: usize,
    pub updates: usize,
    pub patches: usize,
    pub discarded: usize,
}

/// Worker pool plus the table of live meshes.
pub struct MeshBuildPipeline {
    task_sender: Option<crossbeam_channel::Sender<MeshBuildJob>>,
    result_receiver: crossbeam_channel::Receiver<MeshBuildResult>,
    worker_handles: Vec<JoinHandle<()>>,
    budget: usize,
    in_flight: Arc<AtomicUsize>,
    /// Ticket of the latest build requested for each key with one
    /// outstanding. Versions repeat when a chunk is reloaded; tickets never do.
    pending: FxHashMap<MeshKey, u64>,
    next_ticket: u64,
    live: FxHashMap<MeshKey, LiveMesh>,
    stats: PipelineStats,
}

impl MeshBuildPipeline {
    /// Spawn `worker_count` build threads (all cores but one when 0) with
    /// at most `budget` builds in flight.
    pub fn new(worker_count: usize, budget: usize) -> Self {
        let worker_count = if worker_count == 0 {
            num_cpus::get().saturating_sub(1).max(1)
        } else {
            worker_count
        };
        let budget = budget.max(1);
        let (task_tx, task_rx) = crossbeam_channel::bounded::<MeshBuildJob>(budget);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let flight = Arc::clone(&in_flight);
            let handle = std::thread::Builder::new()
                .name(format!("mesh-build-{index}"))
                .spawn(move || {
                    while let Ok(MeshBuildJob { ticket, task }) = rx.recv() {
                        let mesh = build_heightfield_mesh(
                            &task.grid,
                            task.origin,
                            task.tile_size,
                            task.uv_scale,
                            task.blend.as_ref(),
                        );
                        let _ = tx.send(MeshBuildResult {
                            key: task.key,
                            ticket,
                            version: task.version,
                            tile_size: task.tile_size,
                            mesh,
                        });
                        flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .expect("Failed to spawn mesh build worker thread");
            handles.push(handle);
        }
        tracing::debug!(workers = worker_count, budget, "Mesh build pipeline started");

        Self {
            task_sender: Some(task_tx),
            result_receiver: result_rx,
            worker_handles: handles,
            budget,
            in_flight,
            pending: FxHashMap::default(),
            next_ticket: 0,
            live: FxHashMap::default(),
            stats: PipelineStats::default(),
        }
    }

    /// Submit a full build. Returns `false` if the budget is exhausted or
    /// the pipeline has shut down; the caller retries on a later frame.
    pub fn submit(&mut self, task: MeshBuildTask) -> bool {
        let Some(sender) = &self.task_sender else {
            return false;
        };
        if self.in_flight.load(Ordering::Relaxed) >= self.budget {
            return false;
        }
        let key = task.key;
        let ticket = self.next_ticket;
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        if sender.send(MeshBuildJob { ticket, task }).is_err() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        self.next_ticket += 1;
        self.pending.insert(key, ticket);
        true
    }

    /// Patch the live mesh for `key` inside `rect` and push the new vertex
    /// data to the backend.
    ///
    /// Returns `false` when there is no live mesh or a full build for `key`
    /// is outstanding; the caller falls back to [`MeshBuildPipeline::submit`].
    pub fn patch(
        &mut self,
        key: MeshKey,
        grid: &HeightGrid,
        rect: DirtyRect,
        version: u64,
        backend: &mut dyn RenderBackend,
    ) -> bool {
        if self.pending.contains_key(&key) {
            return false;
        }
        let Some(live) = self.live.get_mut(&key) else {
            return false;
        };
        if patch_heightfield_mesh(&mut live.data, grid, live.tile_size, rect).is_none() {
            return false;
        }
        live.version = version;
        backend.update_mesh(live.handle, &live.data);
        self.stats.patches += 1;
        tracing::trace!(?key, version, ?rect, "Patched mesh");
        true
    }

    /// Upload up to `max_uploads` finished builds. Returns the number uploaded.
    pub fn process_build_queue(
        &mut self,
        max_uploads: usize,
        backend: &mut dyn RenderBackend,
    ) -> usize {
        let mut uploaded = 0;
        while uploaded < max_uploads {
            let Ok(result) = self.result_receiver.try_recv() else {
                break;
            };
            if self.pending.get(&result.key) != Some(&result.ticket) {
                tracing::trace!(key = ?result.key, version = result.version, "Discarding stale mesh");
                self.stats.discarded += 1;
                continue;
            }
            self.pending.remove(&result.key);

            match self.live.get_mut(&result.key) {
                Some(live) => {
                    backend.update_mesh(live.handle, &result.mesh);
                    live.version = result.version;
                    live.tile_size = result.tile_size;
                    live.data = result.mesh;
                    self.stats.updates += 1;
                }
                None => {
                    let handle = backend.upload_mesh(&result.mesh);
                    self.live.insert(
                        result.key,
                        LiveMesh {
                            handle,
                            version: result.version,
                            tile_size: result.tile_size,
                            data: result.mesh,
                        },
                    );
                    self.stats.uploads += 1;
                }
            }
            uploaded += 1;
        }
        uploaded
    }

    /// Drop the mesh for `key` and forget any outstanding build.
    pub fn release(&mut self, key: MeshKey, backend: &mut dyn RenderBackend) {
        self.pending.remove(&key);
        if let Some(live) = self.live.remove(&key) {
            backend.release_mesh(live.handle);
        }
    }

    /// Draw the live mesh for `key`. Returns `false` if there is none.
    pub fn draw(
        &self,
        key: MeshKey,
        material: &TerrainMaterial,
        transform: Mat4,
        backend: &mut dyn RenderBackend,
    ) -> bool {
        match self.live.get(&key) {
            Some(live) => {
                backend.draw_mesh(live.handle, material, transform);
                true
            }
            None => false,
        }
    }

    pub fn has_mesh(&self, key: MeshKey) -> bool {
        self.live.contains_key(&key)
    }

    /// Backend handle of the live mesh for `key`.
    pub fn handle(&self, key: MeshKey) -> Option<MeshHandle> {
        self.live.get(&key).map(|live| live.handle)
    }

    /// Version of the uploaded mesh, if any.
    pub fn mesh_version(&self, key: MeshKey) -> Option<u64> {
        self.live.get(&key).map(|live| live.version)
    }

    pub fn mesh_data(&self, key: MeshKey) -> Option<&TerrainMeshData> {
        self.live.get(&key).map(|live| &live.data)
    }

    pub fn is_pending(&self, key: MeshKey) -> bool {
        self.pending.contains_key(&key)
    }

    /// Keys with a live mesh on `layer`.
    pub fn live_keys(&self, layer: u8) -> impl Iterator<Item = ChunkKey> + '_ {
        self.live
            .keys()
            .filter(move |key| key.layer == layer)
            .map(|key| key.chunk)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            in_flight: self.in_flight_count(),
            pending: self.pending.len(),
            live: self.live.len(),
            ..self.stats
        }
    }

    /// Close the task channel and join the workers.
    pub fn shutdown(&mut self) {
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MeshBuildPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
