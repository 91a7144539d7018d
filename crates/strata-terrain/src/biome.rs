//! Biome system: definitions, registry, Whittaker lookup, noise sampling,
//! the provider boundary, dominant-biome voting, and height overlays.
//!
//! Temperature and moisture noise fields feed a Whittaker-style 2D diagram
//! that assigns a biome to every world `(x, z)`.

mod def;
mod diagram;
mod overlay;
mod provider;
mod registry;
mod sampler;

pub use def::{BiomeDef, NoiseOverlay, SurfaceTexture};
pub use diagram::{WhittakerDiagram, WhittakerRegion};
pub use overlay::{OverlaySampler, apply_overlay};
pub use provider::{BiomeProvider, NoiseBiomeProvider, dominant_biome, dominant_biomes};
pub use registry::{BiomeId, BiomeRegistry, BiomeRegistryError};
pub use sampler::BiomeSampler;
