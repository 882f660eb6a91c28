//! Player edits layered over generated terrain.

pub mod overlay;

pub use overlay::EditOverlay;
