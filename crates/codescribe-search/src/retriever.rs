//! Retriever (C6): embeds a query and runs per-repo cosine similarity search.

use crate::error::{SearchError, SearchResult};
use async_trait::async_trait;
use codescribe_embeddings::EmbeddingService;
use codescribe_vector::{RetrievedChunk, VectorStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Default `topK` per the retriever contract.
pub const DEFAULT_TOP_K: usize = 8;

/// Result of one [`Retriever::retrieve`] call.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
    pub total_candidates: usize,
    pub duration_ms: u64,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, repo_id: &str, top_k: usize) -> SearchResult<RetrievalResult>;
}

/// Default retriever: embed the query with the same model used at indexing
/// time, then search the vector store. Transient failures are retried with
/// exponential backoff before the whole call times out.
pub struct DefaultRetriever {
    embedding_service: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    max_retries: usize,
    retry_delay: Duration,
    search_timeout: Duration,
}

impl DefaultRetriever {
    #[must_use]
    pub fn new(embedding_service: Arc<dyn EmbeddingService>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding_service,
            vector_store,
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            search_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_retry_config(
        embedding_service: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        max_retries: usize,
        retry_delay: Duration,
        search_timeout: Duration,
    ) -> Self {
        Self {
            embedding_service,
            vector_store,
            max_retries,
            retry_delay,
            search_timeout,
        }
    }

    async fn try_retrieve(&self, query: &str, repo_id: &str, top_k: usize) -> SearchResult<Vec<RetrievedChunk>> {
        tokio::time::timeout(self.search_timeout, async {
            let embeddings = self.embedding_service.generate_embeddings(vec![query]).await?;
            let query_embedding = embeddings
                .into_iter()
                .next()
                .ok_or_else(|| SearchError::EmbeddingFailed {
                    query: query.to_string(),
                })?;

            let chunks = self
                .vector_store
                .search(&query_embedding, repo_id, top_k)
                .await?;
            Ok(chunks)
        })
        .await
        .map_err(|_| SearchError::SearchTimeout {
            query: query.to_string(),
            timeout_ms: self.search_timeout.as_millis() as u64,
        })?
    }
}

#[async_trait]
impl Retriever for DefaultRetriever {
    #[tracing::instrument(skip(self), fields(repo_id, top_k))]
    async fn retrieve(&self, query: &str, repo_id: &str, top_k: usize) -> SearchResult<RetrievalResult> {
        let started = Instant::now();

        for attempt in 0..=self.max_retries {
            match self.try_retrieve(query, repo_id, top_k).await {
                Ok(chunks) => {
                    return Ok(RetrievalResult {
                        total_candidates: chunks.len(),
                        chunks,
                        duration_ms: started.elapsed().as_millis() as u64,
                    });
                }
                Err(e) if attempt < self.max_retries => {
                    let delay = self.retry_delay * 2_u32.pow(attempt as u32);
                    tracing::warn!(attempt, ?delay, error = %e, "retrieval attempt failed, retrying");
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("loop always returns or errors")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codescribe_embeddings::embedding::service::MockEmbeddingProvider;
    use codescribe_embeddings::DefaultEmbeddingService;
    use codescribe_vector::{EmbeddedChunk, InMemoryVectorStore, WriteOptions};
    use codescribe_parsing::CodeChunk;
    use chrono::Utc;

    fn embedded_chunk() -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: CodeChunk {
                id: "c1".to_string(),
                repo_id: "octocat/demo".to_string(),
                path: "src/a.rs".to_string(),
                start_line: 1,
                end_line: 3,
                content: "fn main() {}".to_string(),
                language: "rust".to_string(),
                symbol_name: Some("main".to_string()),
                chunk_index: 0,
            },
            embedding: vec![0.1; 768],
            embedded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn retrieve_returns_matches_from_the_store() {
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .write(
                &[embedded_chunk()],
                &WriteOptions {
                    repo_id: "octocat/demo".to_string(),
                    commit_hash: None,
                    default_branch: "main".to_string(),
                    size_kb: 1,
                    file_count: 1,
                    embedding_model: "mock".to_string(),
                },
            )
            .await
            .unwrap();

        let embedding_service = Arc::new(DefaultEmbeddingService::with_provider(
            Arc::new(MockEmbeddingProvider::new(768)),
            8,
        ));
        let retriever = DefaultRetriever::new(embedding_service, store);

        let result = retriever
            .retrieve("what does main do", "octocat/demo", DEFAULT_TOP_K)
            .await
            .unwrap();
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.total_candidates, 1);
    }
}
