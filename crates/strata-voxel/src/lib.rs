//! Terrain storage: chunk keys, shared-border height grids with version and
//! dirty-rectangle tracking, brush falloff, and dense density chunks for
//! volumetric edits.

pub mod bounds;
pub mod brush;
pub mod chunk_key;
pub mod density;
pub mod falloff;
pub mod height;

pub use bounds::{Aabb, DirtyRect, WorldRect};
pub use brush::{BrushMode, SphereBrush, stamp_sphere};
pub use chunk_key::ChunkKey;
pub use density::{DensityChunk, apply_sphere};
pub use falloff::Falloff;
pub use height::{HeightChunk, HeightGrid};
