//! Error types for blockterra

use thiserror::Error;

/// Main error type for the crate.
///
/// The simulation core never returns these for ordinary conditions
/// (missing chunks, out-of-range coordinates, rejected edits are plain
/// `Option`/`bool` results). They surface only at the boundary: loading
/// configuration, building a block registry, starting a scheduler.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Streaming error: {0}")]
    Streaming(String),
}
