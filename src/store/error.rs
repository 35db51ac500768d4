//! Local store error types

use thiserror::Error;

/// Errors that can occur in the local manifest store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database could not be opened (missing permissions, disk full, ...)
    #[error("Failed to open store at {path}: {message}")]
    Open { path: String, message: String },

    /// Schema declaration failed or the file carries an unknown version
    #[error("Schema error: {0}")]
    Schema(String),

    /// Insert did not complete
    #[error("Write failed: {0}")]
    Write(String),

    /// Query did not complete
    #[error("Read failed: {0}")]
    Read(String),

    /// Stored blob is not valid JSON
    #[error("Corrupt record {id}: {message}")]
    Corrupt { id: i64, message: String },

    /// Store was closed
    #[error("Store is closed")]
    Closed,
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
