//! Terrain meshing: heightfield build and patch, biome blend weights, the
//! GPU vertex format, the render backend boundary, the async build pipeline
//! with bounded uploads, material caching, and greedy voxel meshing.

pub mod backend;
pub mod blend;
pub mod greedy;
pub mod heightfield;
pub mod material;
pub mod pipeline;
pub mod vertex;

pub use backend::{DrawCall, HeadlessBackend, MeshHandle, RenderBackend};
pub use blend::BlendSampler;
pub use greedy::{Axis, MeshBoundary, VoxelMesh, VoxelQuad, greedy_mesh};
pub use heightfield::{TerrainMeshData, build_heightfield_mesh, patch_heightfield_mesh};
pub use material::{
    MaterialCache, MaterialKey, SequentialTextureSource, TerrainMaterial, TextureId,
    TextureSource, mip_level_for_distance,
};
pub use pipeline::{MeshBuildPipeline, MeshBuildTask, MeshKey, PipelineStats};
pub use vertex::TerrainVertex;
