//! Generation parameters shared by every chunk pipeline.

use serde::{Deserialize, Serialize};

/// Inclusive integer range sampled uniformly (trunk heights, canopy radii).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

impl IntRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Map a uniform sample `t` in [0, 1) onto the range, rounding to nearest.
    pub fn lerp_round(&self, t: f32) -> i32 {
        (self.min as f32 + (self.max - self.min) as f32 * t).round() as i32
    }
}

/// Heightmap parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Horizontal divisor applied to world coordinates before sampling
    pub scale: f32,
    /// Height contributed by a full-amplitude noise sample
    pub magnitude: f32,
    /// Base height added to every column
    pub offset: f32,
    /// Columns at or below this height are sand up to their surface
    pub water_height: i32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            scale: 30.0,
            magnitude: 10.0,
            offset: 4.0,
            water_height: 5,
        }
    }
}

/// Spherical canopy parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanopyParams {
    /// Radius range in blocks
    pub size: IntRange,
    /// Probability that a cell inside the sphere becomes leaves
    pub density: f32,
}

impl Default for CanopyParams {
    fn default() -> Self {
        Self {
            size: IntRange::new(2, 4),
            density: 0.8,
        }
    }
}

/// Vegetation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    /// Per-column probability of starting a trunk
    pub frequency: f32,
    pub trunk_height: IntRange,
    pub canopy: CanopyParams,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            frequency: 0.01,
            trunk_height: IntRange::new(4, 7),
            canopy: CanopyParams::default(),
        }
    }
}

/// Cloud layer parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudParams {
    pub draw: bool,
    pub scale: f32,
    /// Cells whose remapped noise falls below this become cloud
    pub density: f32,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            draw: false,
            scale: 30.0,
            density: 0.35,
        }
    }
}

/// Everything the generation pipeline needs besides the chunk coordinate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub seed: u32,
    pub terrain: TerrainParams,
    pub trees: TreeParams,
    pub clouds: CloudParams,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            terrain: TerrainParams::default(),
            trees: TreeParams::default(),
            clouds: CloudParams::default(),
        }
    }
}

impl GenerationParams {
    /// Default parameters with a different seed.
    pub fn with_seed(seed: u32) -> Self {
        Self { seed, ..Default::default() }
    }
}
