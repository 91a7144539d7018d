//! The terrain manager: drives the three rings around a moving viewpoint,
//! keeps their meshes current, and draws them far to near.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use strata_config::{Config, MeshConfig, RingsConfig};
use strata_mesh::{
    BlendSampler, MaterialCache, MaterialKey, MeshBuildPipeline, MeshBuildTask, MeshKey,
    RenderBackend, SequentialTextureSource, TextureSource, mip_level_for_distance,
};
use strata_terrain::{
    BiomeDef, BiomeProvider, GenerationContext, ObjectSpawner, TerrainGenerator,
};
use strata_voxel::{ChunkKey, Falloff};

use crate::editable::{EditReport, EditableRing};
use crate::low_lod::LowLodRing;
use crate::motion::{MotionTracker, RadiusInputs, RingRadii, compute_radii};
use crate::read_only::ReadOnlyRing;
use crate::ring::{RingGeometry, RingKind, RingUpdate, TerrainChunk, exclusion_radius};

/// Snapshot returned by [`TerrainManager::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerrainStats {
    pub editable_chunks: usize,
    pub read_only_chunks: usize,
    pub low_lod_chunks: usize,
    pub radii: RingRadii,
    pub fps: f32,
    pub speed: f32,
    /// Editable chunks waiting on background generation.
    pub pending_generation: usize,
    pub mesh_in_flight: usize,
    /// Builds submitted and not yet uploaded.
    pub mesh_pending: usize,
    pub live_meshes: usize,
    pub patches_this_frame: usize,
    pub full_builds_this_frame: usize,
    pub uploads_this_frame: usize,
    /// Chunks carrying logged edits.
    pub edited_chunks: usize,
}

/// Draws issued by one [`TerrainManager::render`] call, per ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub low_lod: usize,
    pub read_only: usize,
    pub editable: usize,
    /// Read-only chunks hidden under the editable ring.
    pub excluded: usize,
    /// Chunks without a live mesh yet.
    pub missing: usize,
}

impl RenderStats {
    pub fn total(&self) -> usize {
        self.low_lod + self.read_only + self.editable
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameCounters {
    patches: usize,
    full_builds: usize,
    uploads: usize,
}

/// Owns the rings and the mesh pipeline. Every method takes `&mut self`, so
/// edits, membership changes and mesh scheduling never interleave.
pub struct TerrainManager {
    rings_config: RingsConfig,
    mesh_config: MeshConfig,
    biomes: Arc<dyn BiomeProvider>,
    editable: EditableRing,
    read_only: ReadOnlyRing,
    low_lod: LowLodRing,
    pipeline: MeshBuildPipeline,
    materials: MaterialCache,
    textures: Box<dyn TextureSource>,
    motion: MotionTracker,
    radii: Option<RingRadii>,
    update_count: u64,
    frame: FrameCounters,
}

impl TerrainManager {
    pub fn new(
        config: &Config,
        terrain: Arc<dyn TerrainGenerator>,
        biomes: Arc<dyn BiomeProvider>,
        spawner: Option<Arc<dyn ObjectSpawner>>,
    ) -> Self {
        let rings = &config.rings;
        let seed = config.world.seed;
        let context = |ring: &strata_config::RingConfig| {
            GenerationContext::new(
                seed,
                ring.chunk_size as usize,
                ring.tile_size,
                Arc::clone(&terrain),
                Arc::clone(&biomes),
            )
            .with_biome_overlay(rings.apply_biome_overlay)
        };

        let mut editable_ctx = context(&rings.editable);
        if rings.spawn_objects
            && let Some(spawner) = spawner
        {
            editable_ctx = editable_ctx.with_spawner(spawner);
        }
        let dominant_samples = editable_ctx.dominant_samples;
        let read_only = ReadOnlyRing::new(context(&rings.read_only));
        let low_lod = LowLodRing::new(
            RingGeometry::from_config(&rings.low_lod),
            Arc::clone(&biomes),
            dominant_samples,
        );
        let editable = EditableRing::new(editable_ctx, rings.background_generation, rings.persist_edits);
        let pipeline = MeshBuildPipeline::new(
            config.mesh.worker_threads as usize,
            config.mesh.build_budget as usize,
        );

        tracing::info!(
            seed,
            background = rings.background_generation,
            persist_edits = rings.persist_edits,
            "Terrain manager ready"
        );

        Self {
            rings_config: rings.clone(),
            mesh_config: config.mesh.clone(),
            biomes,
            editable,
            read_only,
            low_lod,
            pipeline,
            materials: MaterialCache::new(),
            textures: Box::new(SequentialTextureSource::default()),
            motion: MotionTracker::new(rings),
            radii: None,
            update_count: 0,
            frame: FrameCounters::default(),
        }
    }

    /// Replace the texture source used when materials are first resolved.
    pub fn with_texture_source(mut self, source: Box<dyn TextureSource>) -> Self {
        self.textures = source;
        self
    }

    /// Advance one step with the viewpoint at `viewpoint` after `dt` seconds.
    pub fn update_around(&mut self, viewpoint: Vec3, dt: f32, backend: &mut dyn RenderBackend) {
        self.frame = FrameCounters::default();
        let moved = self.motion.update(viewpoint, dt);
        let radii = self.adapt_radii(viewpoint, moved);
        let predicted = self
            .motion
            .predicted(viewpoint, self.rings_config.lookahead_seconds);

        // Near ring follows the true viewpoint every step.
        let mut update = self.editable.update_around(viewpoint.x, viewpoint.z, radii.editable);
        update.loaded.extend(self.editable.apply_generated(usize::MAX));
        self.release_meshes(RingKind::Editable, &update, backend);

        let stride = u64::from(self.rings_config.read_only_update_stride.max(1));
        if self.update_count % stride == 0 {
            let update = self.read_only.update_around(
                predicted.x,
                predicted.z,
                radii.read_only,
                &self.editable,
            );
            self.release_meshes(RingKind::ReadOnly, &update, backend);
        }
        if self.update_count % (stride * 2) == 0 {
            let inner = exclusion_radius(
                radii.read_only,
                self.read_only.geometry(),
                self.low_lod.geometry(),
            );
            let update = self.low_lod.update_around(
                predicted.x,
                predicted.z,
                radii.low_lod,
                inner,
                &self.editable,
            );
            self.release_meshes(RingKind::LowLod, &update, backend);
        }

        // Dependents read the editable dirty rectangles, which the editable
        // mesh step below clears.
        let read_only_sync = self.read_only.sync_edits(&self.editable);
        let low_lod_sync = self.low_lod.sync_edits(&self.editable);
        if read_only_sync.refreshed + low_lod_sync.refreshed > 0 {
            tracing::debug!(
                read_only = read_only_sync.refreshed,
                low_lod = low_lod_sync.refreshed,
                "Dependent chunks refreshed without a dirty rectangle"
            );
        }

        let mut scheduler = MeshScheduler {
            pipeline: &mut self.pipeline,
            config: &self.mesh_config,
            biomes: &self.biomes,
            backend: &mut *backend,
            frame: &mut self.frame,
        };
        let low_center = self.low_lod.geometry().key_at(predicted.x, predicted.z);
        scheduler.schedule_ring(RingKind::LowLod, low_center, self.low_lod.chunks_mut());
        let read_only_center = self.read_only.geometry().key_at(predicted.x, predicted.z);
        scheduler.schedule_ring(RingKind::ReadOnly, read_only_center, self.read_only.chunks_mut());
        let editable_center = self.editable.geometry().key_at(viewpoint.x, viewpoint.z);
        scheduler.schedule_ring(RingKind::Editable, editable_center, self.editable.chunks_mut());

        let max_uploads = self.mesh_config.max_mesh_builds_per_frame as usize;
        self.frame.uploads = self.pipeline.process_build_queue(max_uploads, backend);
        self.update_count += 1;
    }

    fn adapt_radii(&mut self, viewpoint: Vec3, moved: f32) -> RingRadii {
        if let Some(radii) = self.radii
            && moved < self.rings_config.movement_epsilon
        {
            return radii;
        }
        let density = self
            .biomes
            .def_at(viewpoint.x as f64, viewpoint.z as f64)
            .map_or(0.5, |def| def.density() as f32);
        let inputs = RadiusInputs {
            speed_mps: self.motion.speed(),
            density,
            fps: self.motion.fps(),
        };
        let radii = compute_radii(&self.rings_config, &inputs);
        if self.radii != Some(radii) {
            tracing::debug!(
                editable = radii.editable,
                read_only = radii.read_only,
                low_lod = radii.low_lod,
                speed = inputs.speed_mps,
                fps = inputs.fps,
                density,
                "Ring radii changed"
            );
        }
        self.radii = Some(radii);
        radii
    }

    fn release_meshes(&mut self, kind: RingKind, update: &RingUpdate, backend: &mut dyn RenderBackend) {
        for key in &update.unloaded {
            self.pipeline.release(MeshKey::new(kind.layer(), *key), backend);
        }
    }

    /// Draw low-LOD, then read-only, then editable chunks. Read-only chunks
    /// inside the editable ring's footprint are skipped.
    pub fn render(&mut self, camera: Vec3, backend: &mut dyn RenderBackend) -> RenderStats {
        let mut stats = RenderStats::default();
        let editable_radius = self.radii.map_or(0, |r| r.editable);
        let band = exclusion_radius(
            editable_radius,
            self.editable.geometry(),
            self.read_only.geometry(),
        );
        let camera_key = self.read_only.geometry().key_at(camera.x, camera.z);

        let mut draw = DrawContext {
            pipeline: &self.pipeline,
            materials: &mut self.materials,
            textures: self.textures.as_mut(),
            biomes: self.biomes.as_ref(),
            mip_distance: self.mesh_config.mip_distance,
            max_mip: self.mesh_config.max_mip_level.min(u8::MAX as u32) as u8,
            camera,
        };

        for chunk in sorted(self.low_lod.chunks()) {
            if draw.draw(RingKind::LowLod, self.low_lod.geometry(), chunk, backend) {
                stats.low_lod += 1;
            } else {
                stats.missing += 1;
            }
        }
        for chunk in sorted(self.read_only.chunks()) {
            if chunk.key().ring_distance(camera_key) < band {
                stats.excluded += 1;
                continue;
            }
            if draw.draw(RingKind::ReadOnly, self.read_only.geometry(), chunk, backend) {
                stats.read_only += 1;
            } else {
                stats.missing += 1;
            }
        }
        for chunk in sorted(self.editable.chunks()) {
            if draw.draw(RingKind::Editable, self.editable.geometry(), chunk, backend) {
                stats.editable += 1;
            } else {
                stats.missing += 1;
            }
        }
        stats
    }

    /// Authoritative height at world `(x, z)`.
    pub fn sample_height(&self, x: f32, z: f32) -> f32 {
        self.editable.sample_height(x, z)
    }

    /// Biome descriptor at world `(x, z)`.
    pub fn biome_at(&self, x: f32, z: f32) -> Option<&BiomeDef> {
        self.biomes.def_at(x as f64, z as f64)
    }

    pub fn dig_sphere(&mut self, center: Vec3, radius: f32, strength: f32, falloff: Falloff) -> EditReport {
        self.editable.dig_sphere(center, radius, strength, falloff)
    }

    pub fn place_sphere(&mut self, center: Vec3, radius: f32, strength: f32, falloff: Falloff) -> EditReport {
        self.editable.place_sphere(center, radius, strength, falloff)
    }

    pub fn stats(&self) -> TerrainStats {
        let pipeline = self.pipeline.stats();
        TerrainStats {
            editable_chunks: self.editable.len(),
            read_only_chunks: self.read_only.len(),
            low_lod_chunks: self.low_lod.len(),
            radii: self.radii.unwrap_or_default(),
            fps: self.motion.fps(),
            speed: self.motion.speed(),
            pending_generation: self.editable.pending_loads(),
            mesh_in_flight: pipeline.in_flight,
            mesh_pending: pipeline.pending,
            live_meshes: pipeline.live,
            patches_this_frame: self.frame.patches,
            full_builds_this_frame: self.frame.full_builds,
            uploads_this_frame: self.frame.uploads,
            edited_chunks: self.editable.edited_chunks(),
        }
    }

    /// Radii used by the last update.
    pub fn radii(&self) -> Option<RingRadii> {
        self.radii
    }

    pub fn editable(&self) -> &EditableRing {
        &self.editable
    }

    pub fn read_only(&self) -> &ReadOnlyRing {
        &self.read_only
    }

    pub fn low_lod(&self) -> &LowLodRing {
        &self.low_lod
    }

    pub fn pipeline(&self) -> &MeshBuildPipeline {
        &self.pipeline
    }

    /// Stop the mesh workers. Further builds are refused.
    pub fn shutdown(&mut self) {
        self.pipeline.shutdown();
    }
}

/// Chunks ordered by key, for a stable draw order within a ring.
fn sorted<'a>(chunks: impl Iterator<Item = &'a TerrainChunk>) -> Vec<&'a TerrainChunk> {
    let mut chunks: Vec<_> = chunks.collect();
    chunks.sort_by_key(|chunk| chunk.key());
    chunks
}

/// Decides rebuild vs. patch for one frame.
struct MeshScheduler<'a> {
    pipeline: &'a mut MeshBuildPipeline,
    config: &'a MeshConfig,
    biomes: &'a Arc<dyn BiomeProvider>,
    backend: &'a mut dyn RenderBackend,
    frame: &'a mut FrameCounters,
}

impl MeshScheduler<'_> {
    /// Schedule stale chunks nearest `center` first, so a full build budget
    /// leaves the far ones for a later frame.
    fn schedule_ring<'c>(
        &mut self,
        kind: RingKind,
        center: ChunkKey,
        chunks: impl Iterator<Item = &'c mut TerrainChunk>,
    ) {
        let mut stale: Vec<&mut TerrainChunk> = chunks.filter(|c| c.height.needs_mesh()).collect();
        stale.sort_by_key(|c| (c.key().ring_distance(center), c.key()));
        for chunk in stale {
            self.schedule(kind, chunk);
        }
    }

    fn schedule(&mut self, kind: RingKind, chunk: &mut TerrainChunk) {
        let key = MeshKey::new(kind.layer(), chunk.key());
        let version = chunk.height.version();

        if chunk.height.built_from_version().is_some()
            && let Some(rect) = chunk.height.dirty_rect()
        {
            if self
                .pipeline
                .patch(key, chunk.height.grid(), rect, version, &mut *self.backend)
            {
                chunk.height.mark_built(version);
                self.frame.patches += 1;
                return;
            }
            tracing::debug!(?key, version, "Patch unavailable, falling back to full rebuild");
        }

        let blend = chunk.secondary.map(|_| {
            BlendSampler::new(Arc::clone(self.biomes), chunk.dominant)
                .with_rings(
                    self.config.blend_sample_rings as usize,
                    self.config.blend_samples_per_ring as usize,
                    chunk.height.tile_size() * 2.0,
                )
                .with_thresholds(self.config.blend_threshold_low, self.config.blend_threshold_high)
        });
        let task = MeshBuildTask {
            key,
            version,
            grid: chunk.height.grid().clone(),
            origin: chunk.height.origin(),
            tile_size: chunk.height.tile_size(),
            uv_scale: self.config.uv_scale,
            blend,
        };
        if self.pipeline.submit(task) {
            chunk.height.mark_built(version);
            self.frame.full_builds += 1;
        }
    }
}

/// Material resolution and draw submission for one render pass.
struct DrawContext<'a> {
    pipeline: &'a MeshBuildPipeline,
    materials: &'a mut MaterialCache,
    textures: &'a mut dyn TextureSource,
    biomes: &'a dyn BiomeProvider,
    mip_distance: f32,
    max_mip: u8,
    camera: Vec3,
}

impl DrawContext<'_> {
    fn draw(
        &mut self,
        kind: RingKind,
        geometry: &RingGeometry,
        chunk: &TerrainChunk,
        backend: &mut dyn RenderBackend,
    ) -> bool {
        let key = MeshKey::new(kind.layer(), chunk.key());
        if !self.pipeline.has_mesh(key) {
            return false;
        }
        let center = geometry.chunk_center(chunk.key());
        let distance = Vec2::new(center.x - self.camera.x, center.z - self.camera.z).length();
        let mip = mip_level_for_distance(distance, self.mip_distance, self.max_mip);
        let material_key = MaterialKey {
            primary: chunk.dominant,
            secondary: chunk.secondary,
        };
        let material = self
            .materials
            .resolve(material_key, mip, self.biomes, &mut *self.textures);
        self.pipeline
            .draw(key, material, geometry.chunk_transform(chunk.key()), backend)
    }
}
