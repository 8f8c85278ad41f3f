//! Storage abstraction for the vector store writer (C5) and retriever (C6).

use crate::models::{EmbeddedChunk, RetrievedChunk, WriteOptions, WriteResult};
use crate::VectorDataResult;
use async_trait::async_trait;

/// Per-repo top-K search restricted to `repo_id`, minimum similarity floor
/// applied by the implementation (see [`crate::SIMILARITY_FLOOR`]).
pub const DEFAULT_TOP_K: usize = 8;

/// Pluggable vector-capable persistence backend.
///
/// One implementation ([`crate::PgVectorStore`]) backs production, another
/// ([`crate::InMemoryVectorStore`]) backs tests without a database.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persists `embedded` under whichever of the three strategies
    /// `opts.commit_hash` selects against the stored `RepoIndex`.
    async fn write(
        &self,
        embedded: &[EmbeddedChunk],
        opts: &WriteOptions,
    ) -> VectorDataResult<WriteResult>;

    /// Cosine-similarity top-`top_k` search against chunks stored under
    /// `repo_id`. Candidates below the similarity floor are dropped.
    async fn search(
        &self,
        query_embedding: &[f32],
        repo_id: &str,
        top_k: usize,
    ) -> VectorDataResult<Vec<RetrievedChunk>>;
}
