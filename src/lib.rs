//! Blockterra - streamed, editable block terrain with cylinder collision

pub mod core;
pub mod math;
pub mod voxel;
pub mod terrain;
pub mod generation;
pub mod streaming;
pub mod physics;

pub use core::error::Error;
pub use core::types::Result;
