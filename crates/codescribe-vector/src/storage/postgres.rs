//! `PostgreSQL`/pgvector-backed [`VectorStore`] implementation.
//!
//! Shares its connection pool with [`codescribe_meta::DataClient`], which
//! also owns the `repo_index` row this module reads and updates as part of
//! strategy selection and the crash-safety invariant in `write`.

use crate::error::VectorDataError;
use crate::models::{EmbeddedChunk, RetrievedChunk, WriteOptions, WriteResult, WriteStrategy};
use crate::storage::traits::VectorStore;
use crate::VectorDataResult;
use async_trait::async_trait;
use chrono::Utc;
use codescribe_meta::{DataClient, RepoIndex, RepoIndexStore};
use pgvector::Vector;
use sqlx::{PgPool, QueryBuilder, Row};
use std::sync::Arc;
use std::time::Instant;

/// Candidates below this similarity are dropped by [`PgVectorStore::search`].
pub const SIMILARITY_FLOOR: f32 = 0.5;

/// Chunks are written/deleted/read in batches of this size per statement.
const BATCH_SIZE: usize = 50;

/// `code_chunks`-table-backed store, built over the pool shared with
/// [`codescribe_meta::DataClient`].
#[derive(Clone)]
pub struct PgVectorStore {
    data: Arc<DataClient>,
}

impl PgVectorStore {
    /// Construct a store over the shared meta-data client's pool.
    #[must_use]
    pub fn new(data: Arc<DataClient>) -> Self {
        Self { data }
    }

    fn pool(&self) -> &PgPool {
        self.data.pool()
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    #[tracing::instrument(skip(self, embedded), fields(repo_id = %opts.repo_id, chunk_count = embedded.len()))]
    async fn write(
        &self,
        embedded: &[EmbeddedChunk],
        opts: &WriteOptions,
    ) -> VectorDataResult<WriteResult> {
        let started = Instant::now();
        let existing = self.data.get_repo_index(&opts.repo_id).await?;

        let strategy = select_strategy(opts.commit_hash.as_deref(), existing.as_ref());

        let (chunks_written, chunks_deleted) = match strategy {
            WriteStrategy::Skipped => (0, 0),
            WriteStrategy::FullReindex => {
                let deleted = delete_repo_chunks(self.pool(), &opts.repo_id).await?;
                let written = insert_batches(self.pool(), &opts.repo_id, embedded, true).await?;
                self.upsert_index(opts, embedded.len(), opts.commit_hash.clone())
                    .await?;
                (written, deleted)
            }
            WriteStrategy::Upsert => {
                let written = insert_batches(self.pool(), &opts.repo_id, embedded, false).await?;
                let carried_hash = existing.as_ref().and_then(|r| r.commit_hash.clone());
                self.upsert_index(opts, embedded.len(), carried_hash).await?;
                (written, 0)
            }
        };

        tracing::debug!(?strategy, chunks_written, chunks_deleted, "vector store write complete");

        Ok(WriteResult {
            strategy,
            chunks_written,
            chunks_deleted,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    #[tracing::instrument(skip(self, query_embedding), fields(repo_id, top_k))]
    async fn search(
        &self,
        query_embedding: &[f32],
        repo_id: &str,
        top_k: usize,
    ) -> VectorDataResult<Vec<RetrievedChunk>> {
        let query_vector = Vector::from(query_embedding.to_vec());
        let rows = sqlx::query(
            "SELECT file_path, start_line, end_line, symbol_name, content, language, \
             1 - (embedding <=> $1) AS score \
             FROM code_chunks WHERE repo_id = $2 \
             ORDER BY embedding <=> $1 \
             LIMIT $3",
        )
        .bind(&query_vector)
        .bind(repo_id)
        .bind(top_k as i64)
        .fetch_all(self.pool())
        .await
        .map_err(|e| VectorDataError::Storage(format!("similarity search failed: {e}")))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let score: f32 = row
                .try_get("score")
                .map_err(|e| VectorDataError::Storage(e.to_string()))?;
            if score < SIMILARITY_FLOOR {
                continue;
            }
            results.push(RetrievedChunk {
                file_path: row
                    .try_get("file_path")
                    .map_err(|e| VectorDataError::Storage(e.to_string()))?,
                start_line: row
                    .try_get::<i32, _>("start_line")
                    .map_err(|e| VectorDataError::Storage(e.to_string()))? as usize,
                end_line: row
                    .try_get::<i32, _>("end_line")
                    .map_err(|e| VectorDataError::Storage(e.to_string()))? as usize,
                symbol_name: row
                    .try_get("symbol_name")
                    .map_err(|e| VectorDataError::Storage(e.to_string()))?,
                content: row
                    .try_get("content")
                    .map_err(|e| VectorDataError::Storage(e.to_string()))?,
                language: row
                    .try_get("language")
                    .map_err(|e| VectorDataError::Storage(e.to_string()))?,
                score,
            });
        }

        Ok(results)
    }
}

impl PgVectorStore {
    async fn upsert_index(
        &self,
        opts: &WriteOptions,
        chunk_count: usize,
        commit_hash: Option<String>,
    ) -> VectorDataResult<()> {
        let index = RepoIndex {
            repo_id: opts.repo_id.clone(),
            commit_hash,
            default_branch: opts.default_branch.clone(),
            size_kb: opts.size_kb,
            file_count: opts.file_count,
            chunk_count: chunk_count as i32,
            embedding_model: opts.embedding_model.clone(),
            updated_at: Utc::now(),
        };
        self.data
            .upsert_repo_index(&index)
            .await
            .map_err(|e| VectorDataError::Storage(e.to_string()))
    }
}

/// Picks the write strategy per the commit-hash comparison against the
/// stored `RepoIndex`.
fn select_strategy(commit_hash: Option<&str>, existing: Option<&RepoIndex>) -> WriteStrategy {
    match commit_hash {
        None => WriteStrategy::Upsert,
        Some(hash) => {
            let matches_stored = existing
                .and_then(|r| r.commit_hash.as_deref())
                .is_some_and(|stored| stored == hash);
            if matches_stored {
                WriteStrategy::Skipped
            } else {
                WriteStrategy::FullReindex
            }
        }
    }
}

async fn delete_repo_chunks(pool: &PgPool, repo_id: &str) -> VectorDataResult<usize> {
    let result = sqlx::query("DELETE FROM code_chunks WHERE repo_id = $1")
        .bind(repo_id)
        .execute(pool)
        .await
        .map_err(|e| VectorDataError::Storage(format!("failed to delete prior chunks: {e}")))?;
    Ok(result.rows_affected() as usize)
}

/// Inserts `embedded` in batches of [`BATCH_SIZE`]. `on_conflict_do_nothing`
/// selects the full-reindex conflict policy; otherwise an upsert updates
/// `content`, `embedding`, `embedded_at` in place.
async fn insert_batches(
    pool: &PgPool,
    repo_id: &str,
    embedded: &[EmbeddedChunk],
    on_conflict_do_nothing: bool,
) -> VectorDataResult<usize> {
    let mut written = 0_usize;
    for batch in embedded.chunks(BATCH_SIZE) {
        if batch.is_empty() {
            continue;
        }
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "INSERT INTO code_chunks (id, repo_id, file_path, language, content, start_line, \
             end_line, symbol_name, chunk_index, embedding, embedded_at) ",
        );
        qb.push_values(batch, |mut b, ec| {
            b.push_bind(ec.chunk.id.clone())
                .push_bind(repo_id)
                .push_bind(ec.chunk.path.clone())
                .push_bind(ec.chunk.language.clone())
                .push_bind(ec.chunk.content.clone())
                .push_bind(ec.chunk.start_line as i32)
                .push_bind(ec.chunk.end_line as i32)
                .push_bind(ec.chunk.symbol_name.clone())
                .push_bind(ec.chunk.chunk_index as i32)
                .push_bind(Vector::from(ec.embedding.clone()))
                .push_bind(ec.embedded_at);
        });

        if on_conflict_do_nothing {
            qb.push(" ON CONFLICT (id) DO NOTHING");
        } else {
            qb.push(
                " ON CONFLICT (id) DO UPDATE SET content = EXCLUDED.content, \
                 embedding = EXCLUDED.embedding, embedded_at = EXCLUDED.embedded_at",
            );
        }

        let result = qb
            .build()
            .execute(pool)
            .await
            .map_err(|e| VectorDataError::Storage(format!("failed to write chunk batch: {e}")))?;
        written += result.rows_affected() as usize;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_when_commit_hash_matches_stored() {
        let existing = RepoIndex {
            repo_id: "octocat/demo".into(),
            commit_hash: Some("abc123".into()),
            default_branch: "main".into(),
            size_kb: 1,
            file_count: 1,
            chunk_count: 1,
            embedding_model: "jina-v2".into(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            select_strategy(Some("abc123"), Some(&existing)),
            WriteStrategy::Skipped
        );
    }

    #[test]
    fn full_reindex_when_commit_hash_differs_or_absent_index() {
        let existing = RepoIndex {
            repo_id: "octocat/demo".into(),
            commit_hash: Some("old".into()),
            default_branch: "main".into(),
            size_kb: 1,
            file_count: 1,
            chunk_count: 1,
            embedding_model: "jina-v2".into(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            select_strategy(Some("new"), Some(&existing)),
            WriteStrategy::FullReindex
        );
        assert_eq!(select_strategy(Some("new"), None), WriteStrategy::FullReindex);
    }

    #[test]
    fn upsert_when_commit_hash_absent() {
        assert_eq!(select_strategy(None, None), WriteStrategy::Upsert);
    }
}
