//! Agent body and collision against the block grid

pub mod agent;
pub mod collision;

pub use agent::Agent;
pub use collision::{CollisionSystem, Contact};
