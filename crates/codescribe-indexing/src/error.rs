//! Error taxonomy for repo fetching, the ingestion pipeline, and the job
//! orchestrator.

use thiserror::Error;

/// Errors raised by the fetcher (C2), pipeline (C8), and orchestrator (C9).
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("repo fetch failed: {0}")]
    FetchFailed(String),

    #[error("clone failed: {0}")]
    CloneFailed(String),

    #[error("parsing error: {0}")]
    Parsing(#[from] codescribe_parsing::ParsingError),

    #[error("embedding error: {0}")]
    Embedding(#[from] codescribe_embeddings::EmbeddingError),

    #[error("vector store error: {0}")]
    VectorData(#[from] codescribe_vector::VectorDataError),

    #[error("metadata error: {0}")]
    Meta(#[from] codescribe_meta::MetaError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type for this crate's operations.
pub type IndexerResult<T> = std::result::Result<T, IndexerError>;
