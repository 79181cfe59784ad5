//! Error types for the journal store.

use learnchain_core::CodecError;
use thiserror::Error;

/// Errors that can occur during journal operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A lock guarding the backend was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
