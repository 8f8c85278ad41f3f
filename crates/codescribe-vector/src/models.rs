//! Value types shared by the vector store writer and the retriever.

use chrono::{DateTime, Utc};
use codescribe_parsing::CodeChunk;
use serde::{Deserialize, Serialize};

/// A chunk paired with its embedding, ready for persistence.
///
/// Invariant: `embedding` is L2-normalized and `embedding.len()` equals the
/// configured model's dimension for every chunk in one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: CodeChunk,
    pub embedding: Vec<f32>,
    pub embedded_at: DateTime<Utc>,
}

/// A chunk returned from similarity search, scored against a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol_name: Option<String>,
    pub content: String,
    pub language: String,
    /// `1 - cosine_distance`, in `[0, 1]`.
    pub score: f32,
}

/// Which of the three write strategies [`crate::VectorStore::write`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteStrategy {
    /// `commitHash` matched the stored `RepoIndex` — no writes performed.
    Skipped,
    /// `commitHash` present and differed (or no prior index) — delete-all,
    /// insert-all, then upsert `RepoIndex`.
    FullReindex,
    /// `commitHash` absent — insert-or-update per chunk id.
    Upsert,
}

/// Metadata accompanying a write, independent of the chunks themselves.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub repo_id: String,
    pub commit_hash: Option<String>,
    pub default_branch: String,
    pub size_kb: i32,
    pub file_count: i32,
    pub embedding_model: String,
}

/// Outcome of a [`crate::VectorStore::write`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub strategy: WriteStrategy,
    pub chunks_written: usize,
    pub chunks_deleted: usize,
    pub duration_ms: u64,
}
