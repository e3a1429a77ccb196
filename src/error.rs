//! Error types for storage and the task log

use thiserror::Error;

/// Failures of the persistent key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of task log operations
#[derive(Debug, Error)]
pub enum LogError {
    #[error("task {0} not found")]
    NotFound(String),

    #[error("invalid task entry: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
