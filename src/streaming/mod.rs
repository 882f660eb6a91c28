//! Chunk streaming around the agent

pub mod chunk_loader;
pub mod world_streamer;

pub use chunk_loader::{
    BackgroundScheduler, GenerationJob, GenerationOutput, GenerationScheduler, ImmediateScheduler, TaskHandle,
};
pub use world_streamer::{StreamEvent, WorldStreamer, DEFAULT_REACH};
