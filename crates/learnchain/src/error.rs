//! Error types for the engine.

use learnchain_core::{CodecError, PlatformError};
use learnchain_store::StoreError;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation was rejected by the state machine.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Journal storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Record encoding error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The journal could not be replayed into a consistent state.
    #[error("replay failed at seq {seq}: {reason}")]
    Replay { seq: u64, reason: String },

    /// The global log subscriber could not be installed.
    #[error("logging error: {0}")]
    Logging(String),
}

impl EngineError {
    /// The platform rejection behind this error, if that is what it is.
    pub fn as_platform(&self) -> Option<&PlatformError> {
        match self {
            EngineError::Platform(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
