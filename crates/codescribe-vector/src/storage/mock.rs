//! In-memory [`VectorStore`] for tests that don't need a real database.

use crate::error::VectorDataError;
use crate::models::{EmbeddedChunk, RetrievedChunk, WriteOptions, WriteResult, WriteStrategy};
use crate::storage::postgres::SIMILARITY_FLOOR;
use crate::storage::traits::VectorStore;
use crate::VectorDataResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mirrors the `code_chunks` row shape closely enough to score cosine
/// similarity the same way the Postgres-backed store does.
#[derive(Debug, Clone)]
struct Row {
    chunk: EmbeddedChunk,
}

/// In-memory stand-in for [`crate::PgVectorStore`]: no HNSW index, just a
/// linear cosine-similarity scan, sufficient for the cosine-score contract
/// under test without a database.
pub struct InMemoryVectorStore {
    chunks: Mutex<HashMap<String, Vec<Row>>>,
    commit_hashes: Mutex<HashMap<String, Option<String>>>,
    fail_on_write: bool,
    fail_on_search: bool,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(HashMap::new()),
            commit_hashes: Mutex::new(HashMap::new()),
            fail_on_write: false,
            fail_on_search: false,
        }
    }

    #[must_use]
    pub fn with_write_failure(mut self) -> Self {
        self.fail_on_write = true;
        self
    }

    #[must_use]
    pub fn with_search_failure(mut self) -> Self {
        self.fail_on_search = true;
        self
    }

    /// Number of chunks currently stored for `repo_id` (for test assertions).
    #[must_use]
    pub fn chunk_count(&self, repo_id: &str) -> usize {
        self.chunks
            .lock()
            .unwrap()
            .get(repo_id)
            .map_or(0, Vec::len)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn write(
        &self,
        embedded: &[EmbeddedChunk],
        opts: &WriteOptions,
    ) -> VectorDataResult<WriteResult> {
        if self.fail_on_write {
            return Err(VectorDataError::Storage(
                "mock storage configured to fail".into(),
            ));
        }

        let mut commit_hashes = self.commit_hashes.lock().unwrap();
        let stored_hash = commit_hashes.get(&opts.repo_id).cloned().flatten();

        let strategy = match &opts.commit_hash {
            Some(hash) if stored_hash.as_deref() == Some(hash.as_str()) => WriteStrategy::Skipped,
            Some(_) => WriteStrategy::FullReindex,
            None => WriteStrategy::Upsert,
        };

        let mut chunks = self.chunks.lock().unwrap();
        let (written, deleted) = match strategy {
            WriteStrategy::Skipped => (0, 0),
            WriteStrategy::FullReindex => {
                let deleted = chunks
                    .get(&opts.repo_id)
                    .map_or(0, Vec::len);
                let rows = embedded
                    .iter()
                    .map(|c| Row { chunk: c.clone() })
                    .collect();
                chunks.insert(opts.repo_id.clone(), rows);
                commit_hashes.insert(opts.repo_id.clone(), opts.commit_hash.clone());
                (embedded.len(), deleted)
            }
            WriteStrategy::Upsert => {
                let entry = chunks.entry(opts.repo_id.clone()).or_default();
                for chunk in embedded {
                    if let Some(existing) = entry.iter_mut().find(|r| r.chunk.chunk.id == chunk.chunk.id) {
                        existing.chunk = chunk.clone();
                    } else {
                        entry.push(Row {
                            chunk: chunk.clone(),
                        });
                    }
                }
                (embedded.len(), 0)
            }
        };

        Ok(WriteResult {
            strategy,
            chunks_written: written,
            chunks_deleted: deleted,
            duration_ms: 0,
        })
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        repo_id: &str,
        top_k: usize,
    ) -> VectorDataResult<Vec<RetrievedChunk>> {
        if self.fail_on_search {
            return Err(VectorDataError::Storage(
                "mock storage configured to fail".into(),
            ));
        }

        let chunks = self.chunks.lock().unwrap();
        let Some(rows) = chunks.get(repo_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| RetrievedChunk {
                file_path: row.chunk.chunk.path.clone(),
                start_line: row.chunk.chunk.start_line,
                end_line: row.chunk.chunk.end_line,
                symbol_name: row.chunk.chunk.symbol_name.clone(),
                content: row.chunk.chunk.content.clone(),
                language: row.chunk.chunk.language.clone(),
                score: cosine_similarity(query_embedding, &row.chunk.embedding),
            })
            .filter(|r| r.score >= SIMILARITY_FLOOR)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codescribe_parsing::CodeChunk;
    use chrono::Utc;

    fn chunk(id: &str, path: &str) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: CodeChunk {
                id: id.to_string(),
                repo_id: "octocat/demo".to_string(),
                path: path.to_string(),
                start_line: 1,
                end_line: 3,
                content: "fn main() {}".to_string(),
                language: "rust".to_string(),
                symbol_name: Some("main".to_string()),
                chunk_index: 0,
            },
            embedding: vec![1.0, 0.0, 0.0],
            embedded_at: Utc::now(),
        }
    }

    fn opts(commit_hash: Option<&str>) -> WriteOptions {
        WriteOptions {
            repo_id: "octocat/demo".to_string(),
            commit_hash: commit_hash.map(str::to_string),
            default_branch: "main".to_string(),
            size_kb: 1,
            file_count: 1,
            embedding_model: "jina-v2".to_string(),
        }
    }

    #[tokio::test]
    async fn full_reindex_then_identical_commit_is_skipped() {
        let store = InMemoryVectorStore::new();
        let chunks = vec![chunk("c1", "a.rs")];

        let first = store.write(&chunks, &opts(Some("sha1"))).await.unwrap();
        assert_eq!(first.strategy, WriteStrategy::FullReindex);
        assert_eq!(first.chunks_written, 1);

        let second = store.write(&chunks, &opts(Some("sha1"))).await.unwrap();
        assert_eq!(second.strategy, WriteStrategy::Skipped);
        assert_eq!(second.chunks_written, 0);
    }

    #[tokio::test]
    async fn differing_commit_hash_triggers_full_reindex() {
        let store = InMemoryVectorStore::new();
        let chunks = vec![chunk("c1", "a.rs")];
        store.write(&chunks, &opts(Some("sha1"))).await.unwrap();

        let result = store.write(&chunks, &opts(Some("sha2"))).await.unwrap();
        assert_eq!(result.strategy, WriteStrategy::FullReindex);
        assert_eq!(result.chunks_deleted, 1);
    }

    #[tokio::test]
    async fn absent_commit_hash_upserts_by_chunk_id() {
        let store = InMemoryVectorStore::new();
        let chunks = vec![chunk("c1", "a.rs")];
        store.write(&chunks, &opts(None)).await.unwrap();
        store.write(&chunks, &opts(None)).await.unwrap();

        assert_eq!(store.chunk_count("octocat/demo"), 1);
    }

    #[tokio::test]
    async fn search_drops_candidates_below_similarity_floor() {
        let store = InMemoryVectorStore::new();
        let mut far = chunk("c1", "a.rs");
        far.embedding = vec![0.0, 1.0, 0.0]; // orthogonal to query
        store.write(&[far], &opts(None)).await.unwrap();

        let results = store
            .search(&[1.0, 0.0, 0.0], "octocat/demo", 8)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_is_scoped_to_repo_id() {
        let store = InMemoryVectorStore::new();
        store.write(&[chunk("c1", "a.rs")], &opts(None)).await.unwrap();

        let results = store
            .search(&[1.0, 0.0, 0.0], "other/repo", 8)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
