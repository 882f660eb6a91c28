//! Voxel data structures and operations

pub mod block;
pub mod voxel;
pub mod chunk;
pub mod instancing;
pub mod edit;

pub use block::{BlockId, BlockRegistry, BlockType};
pub use chunk::{BlockSource, Chunk, ChunkCoord, ChunkSize, LoadState};
pub use edit::EditOverlay;
pub use instancing::{InstanceBatch, Renderable, WaterPlane};
pub use voxel::Voxel;
