//! Error types for vector data storage operations

use thiserror::Error;

/// Result type alias for vector data operations
pub type VectorDataResult<T> = Result<T, VectorDataError>;

/// Errors that can occur during vector storage operations
#[derive(Error, Debug)]
pub enum VectorDataError {
    /// Storage backend is unavailable or connection failed
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Vector dimension mismatch (e.g., query vector wrong size)
    #[error("vector dimension mismatch: {0}")]
    VectorDimensionMismatch(String),

    /// Storage backend specific error
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Generic error for other issues
    #[error("other error: {0}")]
    Other(String),
}

impl From<sqlx::Error> for VectorDataError {
    fn from(err: sqlx::Error) -> Self {
        VectorDataError::Storage(err.to_string())
    }
}

impl From<codescribe_meta::MetaError> for VectorDataError {
    fn from(err: codescribe_meta::MetaError) -> Self {
        VectorDataError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for VectorDataError {
    fn from(err: anyhow::Error) -> Self {
        VectorDataError::Other(err.to_string())
    }
}

impl From<serde_json::Error> for VectorDataError {
    fn from(err: serde_json::Error) -> Self {
        VectorDataError::Serialization(err.to_string())
    }
}
