//! Error types for buffer operations

use crate::find::Cancelled;
use hexed_config::ConfigError;
use thiserror::Error;

/// Recoverable buffer failures.
///
/// Misuse of the engine (stale handles, out-of-range offsets, undo with an
/// empty stack) panics instead.
#[derive(Error, Debug)]
pub enum BufferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<Cancelled> for BufferError {
    fn from(_: Cancelled) -> Self {
        BufferError::Cancelled
    }
}

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;
