//! Ring-based terrain streaming around a moving viewpoint.
//!
//! Three concentric rings cover the world at decreasing resolution: an
//! editable near ring holding the authoritative, deformable heights, a
//! procedurally generated mid ring, and a coarse far ring. The
//! [`TerrainManager`] adapts their radii to speed, biome density and frame
//! rate, propagates edits outward, and decides per chunk whether to patch a
//! live mesh or rebuild it.

pub mod dependent;
pub mod edit_log;
pub mod editable;
pub mod low_lod;
pub mod manager;
pub mod motion;
pub mod read_only;
pub mod ring;

pub use dependent::SyncOutcome;
pub use edit_log::EditLog;
pub use editable::{DirtyPatch, EditReport, EditableHeightView, EditableRing};
pub use low_lod::LowLodRing;
pub use manager::{RenderStats, TerrainManager, TerrainStats};
pub use motion::{MotionTracker, RadiusInputs, RingRadii, compute_radii, perf_deficit};
pub use read_only::{ReadOnlyRing, SyncSummary};
pub use ring::{RingGeometry, RingKind, RingUpdate, TerrainChunk, exclusion_radius};
