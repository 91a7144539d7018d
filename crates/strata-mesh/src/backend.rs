//! Render backend boundary.
//!
//! The streaming core never talks to a GPU directly. It uploads, updates,
//! releases and draws meshes through [`RenderBackend`]. [`HeadlessBackend`]
//! records every call and is used by tests and the demo binary.

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::heightfield::TerrainMeshData;
use crate::material::{MaterialKey, TerrainMaterial};

/// Opaque handle to an uploaded mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

/// GPU-side operations needed by the terrain system.
pub trait RenderBackend {
    /// Upload a new mesh and return its handle.
    fn upload_mesh(&mut self, mesh: &TerrainMeshData) -> MeshHandle;

    /// Replace the vertex data behind `handle`. Topology is unchanged.
    fn update_mesh(&mut self, handle: MeshHandle, mesh: &TerrainMeshData);

    /// Free the GPU resources behind `handle`.
    fn release_mesh(&mut self, handle: MeshHandle);

    /// Queue a draw of `handle` with `material` at `transform`.
    fn draw_mesh(&mut self, handle: MeshHandle, material: &TerrainMaterial, transform: Mat4);
}

/// A recorded draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub handle: MeshHandle,
    pub material: MaterialKey,
    pub transform: Mat4,
}

/// Backend without a GPU. Keeps counts, live handles and the current
/// frame's draw list.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    /// Vertex count per live handle.
    live: FxHashMap<MeshHandle, usize>,
    draws: Vec<DrawCall>,
    pub uploads: usize,
    pub updates: usize,
    pub releases: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the draw list for a new frame.
    pub fn begin_frame(&mut self) {
        self.draws.clear();
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn live_meshes(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: MeshHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Vertices across every live mesh.
    pub fn live_vertices(&self) -> usize {
        self.live.values().sum()
    }
}

impl RenderBackend for HeadlessBackend {
    fn upload_mesh(&mut self, mesh: &TerrainMeshData) -> MeshHandle {
        self.next_handle += 1;
        let handle = MeshHandle(self.next_handle);
        self.live.insert(handle, mesh.vertex_count());
        self.uploads += 1;
        handle
    }

    fn update_mesh(&mut self, handle: MeshHandle, mesh: &TerrainMeshData) {
        match self.live.get_mut(&handle) {
            Some(count) => {
                *count = mesh.vertex_count();
                self.updates += 1;
            }
            None => tracing::warn!(?handle, "Update of unknown mesh handle"),
        }
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if self.live.remove(&handle).is_some() {
            self.releases += 1;
        } else {
            tracing::warn!(?handle, "Release of unknown mesh handle");
        }
    }

    fn draw_mesh(&mut self, handle: MeshHandle, material: &TerrainMaterial, transform: Mat4) {
        if !self.live.contains_key(&handle) {
            tracing::warn!(?handle, "Draw of unknown mesh handle");
            return;
        }
        self.draws.push(DrawCall {
            handle,
            material: material.key,
            transform,
        });
    }
}
