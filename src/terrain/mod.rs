//! Procedural terrain generation

pub mod noise;
pub mod generator;

pub use generator::TerrainGenerator;
pub use noise::{CoherentNoise, NoiseSource, SeededRng};
