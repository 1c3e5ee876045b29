//! Typed failures of the vector store.

use ragvault_core::AppError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by embedding, indexing, and persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Remote embedding call failed, timed out, or returned a malformed payload
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// A vector does not have the configured dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A persisted artifact exists but is unreadable or shape-invalid
    #[error("Storage corruption in {path:?}: {reason}")]
    StorageCorruption { path: PathBuf, reason: String },

    /// Writing a persisted artifact failed
    #[error("Failed to write {path:?}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delete found no entry for the given identifier
    #[error("No stored chunk matches '{0}'")]
    NoMatch(String),

    /// Invalid store configuration
    #[error("Store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn corruption(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::StorageCorruption {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::StorageWrite {
            path: path.into(),
            source,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmbeddingService(_) => AppError::Embedding(err.to_string()),
            StoreError::Config(msg) => AppError::Config(msg),
            other => AppError::Store(other.to_string()),
        }
    }
}

/// Convenience type alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;
