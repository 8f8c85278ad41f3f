//! Error taxonomy for retrieval, context assembly, and the query service.

use thiserror::Error;

/// Errors raised by the retriever (C6), context assembler (C7), LLM client,
/// and query service (C10).
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("embedding generation failed for query {query:?}")]
    EmbeddingFailed { query: String },

    #[error("search timed out after {timeout_ms}ms for query {query:?}")]
    SearchTimeout { query: String, timeout_ms: u64 },

    #[error("query must be at least 3 characters after trimming")]
    QueryTooShort,

    #[error("repoId must not be empty")]
    EmptyRepoId,

    #[error("llm generation failed: {0}")]
    LlmFailed(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] codescribe_embeddings::EmbeddingError),

    #[error("vector store error: {0}")]
    VectorData(#[from] codescribe_vector::VectorDataError),

    #[error("metadata error: {0}")]
    Meta(#[from] codescribe_meta::MetaError),
}

/// Result type for this crate's operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
