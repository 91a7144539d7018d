//! Biome definition: the procedural modifiers and surface look of one biome.

/// Extra fBm layered onto generated heights inside a biome.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseOverlay {
    /// Amplitude of the first overlay octave, in world units.
    pub amplitude: f64,
    /// Frequency of the first overlay octave.
    pub frequency: f64,
    /// Number of overlay octaves.
    pub octaves: u32,
}

/// One albedo layer used when texturing a biome.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceTexture {
    /// Texture name resolved by the external texture source.
    pub name: String,
    /// World units covered by one texture repeat.
    pub tiling: f32,
}

/// Full descriptor for a biome type.
#[derive(Clone, Debug, PartialEq)]
pub struct BiomeDef {
    /// Human-readable biome name (e.g., "temperate_forest").
    pub name: String,
    /// Terrain ruggedness in `[0.0, 1.0]`.
    pub roughness: f64,
    /// Vegetation coverage in `[0.0, 1.0]`.
    pub vegetation_density: f64,
    /// Height overlay applied to chunks dominated by this biome.
    pub overlay: Option<NoiseOverlay>,
    /// Surface textures, primary first.
    pub textures: Vec<SurfaceTexture>,
}

impl BiomeDef {
    /// Definition with no overlay and a single texture named after the biome.
    pub fn plain(name: &str, roughness: f64, vegetation_density: f64) -> Self {
        Self {
            name: name.to_string(),
            roughness,
            vegetation_density,
            overlay: None,
            textures: vec![SurfaceTexture {
                name: name.to_string(),
                tiling: 8.0,
            }],
        }
    }

    /// Combined ruggedness/vegetation scalar in `[0, 1]`.
    pub fn density(&self) -> f64 {
        (0.5 * self.roughness + 0.5 * self.vegetation_density).clamp(0.0, 1.0)
    }
}
