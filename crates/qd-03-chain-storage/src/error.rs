//! Error types for chain storage.

use thiserror::Error;

/// Storage subsystem errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Backend reported a failure.
    #[error("storage backend error: {reason}")]
    Backend { reason: String },

    /// A stored value failed to decode.
    #[error("corrupt record in table {table}")]
    Corrupt { table: &'static str },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
