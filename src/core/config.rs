//! Engine configuration loaded from JSON.
//!
//! Every field has a default, so a config file only needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;
use crate::generation::config::GenerationParams;
use crate::voxel::chunk::ChunkSize;

/// How chunk generation requests are executed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    /// Run the pipeline inside the call that requested the chunk
    Immediate,
    /// Run the pipeline on background workers and install results on poll
    #[default]
    Deferred,
}

/// Chunk streaming and terrain settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub chunk_size: ChunkSize,
    /// Chebyshev radius of the loaded window, in chunks
    pub draw_distance: i32,
    pub scheduling: SchedulingMode,
    /// Worker threads for deferred generation
    pub worker_threads: usize,
    pub generation: GenerationParams,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: ChunkSize::default(),
            draw_distance: 2,
            scheduling: SchedulingMode::Deferred,
            worker_threads: 2,
            generation: GenerationParams::default(),
        }
    }
}

/// Collision simulation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed steps per second
    pub simulation_rate: f32,
    /// Downward acceleration in blocks/s²
    pub gravity: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            simulation_rate: 200.0,
            gravity: 32.0,
        }
    }
}

/// Player body settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub radius: f32,
    pub height: f32,
    pub jump_speed: f32,
    /// Horizontal speed for full input
    pub max_speed: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 1.75,
            jump_speed: 10.0,
            max_speed: 10.0,
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub agent: AgentConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.warn_suspicious();
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn warn_suspicious(&self) {
        if self.world.draw_distance < 0 {
            log::warn!("negative draw distance {}; no chunks will load", self.world.draw_distance);
        }
        if !(self.physics.simulation_rate.is_finite() && self.physics.simulation_rate > 0.0) {
            log::warn!("simulation rate {} is not positive; physics will not step", self.physics.simulation_rate);
        }
    }
}
