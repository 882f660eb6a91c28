//! Core type aliases and re-exports

pub use glam::{IVec3, UVec3, Vec2, Vec3};

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
