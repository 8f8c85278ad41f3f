//! Error types for the parsing crate
//!
//! Defines parsing-specific errors and result types for file filtering and
//! chunking operations.

use thiserror::Error;

/// Parsing-specific error types
#[derive(Error, Debug)]
pub enum ParsingError {
    /// Chunking failed for a specific file
    #[error("Chunking error for {path}: {reason}")]
    ChunkingError {
        /// File path being chunked
        path: String,
        /// Human-readable reason
        reason: String,
    },

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error (fallback)
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for parsing operations
pub type ParsingResult<T> = Result<T, ParsingError>;
