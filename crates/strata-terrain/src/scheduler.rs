//! Background chunk job scheduler.
//!
//! One worker thread consumes a FIFO of load/unload jobs and pushes results
//! onto a channel the owner drains at a controlled checkpoint. A failed load
//! is logged and reported as a result without a chunk; the chunk stays
//! unloaded until it is requested again.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use dashmap::DashMap;
use strata_voxel::ChunkKey;

use crate::error::{GenerationError, SchedulerError};
use crate::generation::{GeneratedChunk, GenerationContext, generate_height_chunk};

/// Kind of chunk job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    Load,
    Unload,
}

/// State the chunk should be in once the result is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetState {
    Loaded,
    Unloaded,
}

/// A queued job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkJob {
    pub key: ChunkKey,
    pub kind: JobKind,
}

/// A finished job, ready to be applied on the owning thread.
#[derive(Debug)]
pub struct ChunkJobResult {
    pub key: ChunkKey,
    pub target: TargetState,
    /// Generated data for [`TargetState::Loaded`] results. `None` when the
    /// load failed.
    pub chunk: Option<GeneratedChunk>,
}

/// Single-worker FIFO chunk generator.
pub struct ChunkJobScheduler {
    job_sender: Option<Sender<ChunkJob>>,
    result_receiver: Receiver<ChunkJobResult>,
    /// Keys with a queued or running load, mapped to the ticket of the latest
    /// request. Removing a key cancels its load. A key stays here until its
    /// result is on the channel.
    pending: Arc<DashMap<ChunkKey, u64>>,
    next_ticket: AtomicU64,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ChunkJobScheduler {
    /// Spawn the worker thread.
    pub fn new(ctx: GenerationContext) -> Self {
        let (job_sender, job_receiver) = unbounded::<ChunkJob>();
        let (result_sender, result_receiver) = unbounded::<ChunkJobResult>();
        let pending: Arc<DashMap<ChunkKey, u64>> = Arc::new(DashMap::new());
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let pending = Arc::clone(&pending);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("chunk-job-worker".into())
                .spawn(move || worker_loop(ctx, job_receiver, result_sender, pending, running))
                .expect("Failed to spawn chunk job worker thread")
        };

        Self {
            job_sender: Some(job_sender),
            result_receiver,
            pending,
            next_ticket: AtomicU64::new(0),
            running,
            worker: Some(worker),
        }
    }

    /// Queue a job.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Stopped`] after [`ChunkJobScheduler::stop`].
    pub fn enqueue(&self, job: ChunkJob) -> Result<(), SchedulerError> {
        let sender = self.job_sender.as_ref().ok_or(SchedulerError::Stopped)?;
        match job.kind {
            JobKind::Load => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                self.pending.insert(job.key, ticket);
            }
            JobKind::Unload => {
                self.pending.remove(&job.key);
            }
        }
        sender.send(job).map_err(|_| {
            self.pending.remove(&job.key);
            SchedulerError::Stopped
        })
    }

    /// Queue a load unless one is already pending for `key`.
    pub fn request_load(&self, key: ChunkKey) -> Result<bool, SchedulerError> {
        if self.is_pending(key) {
            return Ok(false);
        }
        self.enqueue(ChunkJob {
            key,
            kind: JobKind::Load,
        })?;
        Ok(true)
    }

    /// Queue an unload, cancelling any pending load for `key`.
    pub fn request_unload(&self, key: ChunkKey) -> Result<(), SchedulerError> {
        self.enqueue(ChunkJob {
            key,
            kind: JobKind::Unload,
        })
    }

    pub fn is_pending(&self, key: ChunkKey) -> bool {
        self.pending.contains_key(&key)
    }

    /// Loads queued or running.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Take one finished result, if any.
    pub fn try_dequeue(&self) -> Option<ChunkJobResult> {
        self.result_receiver.try_recv().ok()
    }

    /// Take up to `max` finished results.
    pub fn drain(&self, max: usize) -> Vec<ChunkJobResult> {
        let mut results = Vec::new();
        while results.len() < max {
            match self.result_receiver.try_recv() {
                Ok(result) => results.push(result),
                Err(_) => break,
            }
        }
        results
    }

    /// Stop the worker. The job in progress finishes; queued jobs are abandoned.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.job_sender = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("Chunk job worker exited with a panic");
        }
        self.pending.clear();
    }
}

impl Drop for ChunkJobScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    ctx: GenerationContext,
    jobs: Receiver<ChunkJob>,
    results: Sender<ChunkJobResult>,
    pending: Arc<DashMap<ChunkKey, u64>>,
    running: Arc<AtomicBool>,
) {
    while let Ok(job) = jobs.recv() {
        if !running.load(Ordering::Acquire) {
            tracing::debug!(key = ?job.key, kind = ?job.kind, "Dropping chunk job on stop");
            continue;
        }

        let (result, ticket) = match job.kind {
            JobKind::Unload => {
                let result = ChunkJobResult {
                    key: job.key,
                    target: TargetState::Unloaded,
                    chunk: None,
                };
                (result, None)
            }
            JobKind::Load => {
                let Some(ticket) = pending.get(&job.key).map(|entry| *entry) else {
                    tracing::trace!(key = ?job.key, "Skipping cancelled chunk load");
                    continue;
                };
                let chunk = match run_load(&ctx, job.key) {
                    Ok(chunk) => {
                        tracing::trace!(key = ?job.key, elapsed_us = chunk.elapsed_us, "Generated chunk");
                        Some(chunk)
                    }
                    Err(error) => {
                        tracing::error!(key = ?job.key, %error, "Chunk job failed");
                        None
                    }
                };
                let result = ChunkJobResult {
                    key: job.key,
                    target: TargetState::Loaded,
                    chunk,
                };
                (result, Some(ticket))
            }
        };

        if results.send(result).is_err() {
            break;
        }
        // A newer request for the key keeps its own entry.
        if let Some(ticket) = ticket {
            pending.remove_if(&job.key, |_, current| *current == ticket);
        }
    }
}

fn run_load(ctx: &GenerationContext, key: ChunkKey) -> Result<GeneratedChunk, GenerationError> {
    match catch_unwind(AssertUnwindSafe(|| generate_height_chunk(ctx, key))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(GenerationError::Panicked { key, message })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::biome::{BiomeDef, BiomeId, BiomeProvider};
    use crate::generator::{FlatTerrain, TerrainGenerator};

    struct OneBiome(Vec<BiomeDef>);

    impl BiomeProvider for OneBiome {
        fn biome_at(&self, _x: f64, _z: f64) -> BiomeId {
            BiomeId(0)
        }

        fn def(&self, id: BiomeId) -> Option<&BiomeDef> {
            self.0.get(id.0 as usize)
        }
    }

    /// Panics for chunks with negative X.
    struct Fragile;

    impl TerrainGenerator for Fragile {
        fn height_at(&self, x: f64, _z: f64) -> f32 {
            assert!(x >= 0.0, "negative x");
            1.0
        }
    }

    /// Slow to sample west of the origin.
    struct SlowWest;

    impl TerrainGenerator for SlowWest {
        fn height_at(&self, x: f64, _z: f64) -> f32 {
            if x < 0.0 {
                std::thread::sleep(Duration::from_millis(1));
            }
            0.0
        }
    }

    fn ctx(terrain: Arc<dyn TerrainGenerator>) -> GenerationContext {
        GenerationContext::new(
            7,
            8,
            1.0,
            terrain,
            Arc::new(OneBiome(vec![BiomeDef::plain("only", 0.0, 0.0)])),
        )
    }

    fn collect(scheduler: &ChunkJobScheduler, count: usize) -> Vec<ChunkJobResult> {
        let mut out = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while out.len() < count && Instant::now() < deadline {
            out.extend(scheduler.drain(usize::MAX));
            if out.len() < count {
                std::thread::sleep(Duration::from_millis(2));
            }
        }
        out
    }

    fn wait_idle(scheduler: &ChunkJobScheduler) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while scheduler.pending_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_loads_complete_in_fifo_order() {
        let scheduler = ChunkJobScheduler::new(ctx(Arc::new(FlatTerrain(3.0))));
        let keys: Vec<_> = (0..6).map(|i| ChunkKey::new(i, -i)).collect();
        for &key in &keys {
            assert!(scheduler.request_load(key).unwrap());
        }

        let results = collect(&scheduler, keys.len());
        let got: Vec<_> = results.iter().map(|r| r.key).collect();
        assert_eq!(got, keys);
        for r in &results {
            assert_eq!(r.target, TargetState::Loaded);
            let chunk = r.chunk.as_ref().unwrap();
            assert_eq!(chunk.grid.get(0, 0), 3.0);
        }
        wait_idle(&scheduler);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_load_can_be_requested_again_after_completion() {
        let scheduler = ChunkJobScheduler::new(ctx(Arc::new(FlatTerrain(0.0))));
        let key = ChunkKey::new(1, 1);
        assert!(scheduler.request_load(key).unwrap());
        assert_eq!(collect(&scheduler, 1).len(), 1);
        wait_idle(&scheduler);
        assert!(!scheduler.is_pending(key));
        assert!(scheduler.request_load(key).unwrap());
        assert_eq!(collect(&scheduler, 1)[0].key, key);
    }

    #[test]
    fn test_failed_job_reports_empty_result_and_worker_survives() {
        let scheduler = ChunkJobScheduler::new(ctx(Arc::new(Fragile)));
        scheduler.request_load(ChunkKey::new(-1, 0)).unwrap();
        scheduler.request_load(ChunkKey::new(2, 0)).unwrap();

        let results = collect(&scheduler, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].key, ChunkKey::new(-1, 0));
        assert_eq!(results[0].target, TargetState::Loaded);
        assert!(results[0].chunk.is_none());
        assert_eq!(results[1].key, ChunkKey::new(2, 0));
        assert!(results[1].chunk.is_some());
        assert!(!scheduler.is_pending(ChunkKey::new(-1, 0)));
        assert!(scheduler.try_dequeue().is_none());
    }

    #[test]
    fn test_key_stays_pending_until_result_is_queued() {
        let scheduler = ChunkJobScheduler::new(ctx(Arc::new(FlatTerrain(2.0))));
        let keys: Vec<_> = (0..16).map(|i| ChunkKey::new(i, 3)).collect();
        for &key in &keys {
            scheduler.request_load(key).unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut seen = Vec::new();
        for &key in &keys {
            while scheduler.is_pending(key) && Instant::now() < deadline {
                std::thread::yield_now();
            }
            assert!(!scheduler.is_pending(key));
            // Once the key is no longer pending its result must already be
            // receivable.
            seen.extend(scheduler.drain(usize::MAX).into_iter().map(|r| r.key));
            assert!(seen.contains(&key), "result for {key:?} missing");
        }
        assert_eq!(seen, keys);
    }

    #[test]
    fn test_rerequest_after_cancel_generates_once() {
        let scheduler = ChunkJobScheduler::new(ctx(Arc::new(SlowWest)));
        // Occupies the worker while the key below is cancelled and requested
        // again.
        let blocker = ChunkKey::new(-1, 0);
        let key = ChunkKey::new(4, 4);
        scheduler.request_load(blocker).unwrap();
        assert!(scheduler.request_load(key).unwrap());
        scheduler.request_unload(key).unwrap();
        assert!(scheduler.request_load(key).unwrap());

        let results = collect(&scheduler, 3);
        let loads = results
            .iter()
            .filter(|r| r.key == key && r.target == TargetState::Loaded)
            .count();
        assert_eq!(loads, 1);
        std::thread::sleep(Duration::from_millis(20));
        assert!(scheduler.drain(usize::MAX).is_empty());
        assert!(!scheduler.is_pending(key));
    }

    #[test]
    fn test_unload_signal() {
        let scheduler = ChunkJobScheduler::new(ctx(Arc::new(FlatTerrain(0.0))));
        scheduler.request_unload(ChunkKey::new(5, 5)).unwrap();
        let results = collect(&scheduler, 1);
        assert_eq!(results[0].target, TargetState::Unloaded);
        assert!(results[0].chunk.is_none());
    }

    #[test]
    fn test_stop_rejects_new_jobs() {
        let mut scheduler = ChunkJobScheduler::new(ctx(Arc::new(FlatTerrain(0.0))));
        for i in 0..32 {
            scheduler.request_load(ChunkKey::new(i, 0)).unwrap();
        }
        scheduler.stop();
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.pending_count(), 0);
        assert!(matches!(
            scheduler.request_load(ChunkKey::new(100, 0)),
            Err(SchedulerError::Stopped)
        ));
    }
}
