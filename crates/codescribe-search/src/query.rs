//! Query Service (C10): validates a query, runs retrieve → assemble → LLM,
//! and returns a grounded answer with citations.

use crate::context::{self, Citation};
use crate::error::{SearchError, SearchResult};
use crate::llm::LlmClient;
use crate::retriever::{Retriever, DEFAULT_TOP_K};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const NO_RESULTS_ANSWER: &str = "No relevant code was found in the indexed repository for this question.";
const MIN_QUERY_LEN: usize = 3;

/// A retrieved chunk projected down to what a client needs to display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkProjection {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol_name: Option<String>,
    pub language: String,
    pub score: f32,
}

/// Counters describing how an answer was produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeta {
    pub total_candidates: usize,
    pub chunks_used: usize,
    pub retrieval_duration_ms: u64,
    pub token_estimate: usize,
}

/// Response returned by [`QueryService::query`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub citations: BTreeMap<String, Citation>,
    pub chunks: Vec<ChunkProjection>,
    pub meta: QueryMeta,
}

/// Orchestrates C6 (retrieve) → C7 (assemble) → LLM generation.
pub struct QueryService {
    retriever: Arc<dyn Retriever>,
    llm_client: Arc<dyn LlmClient>,
}

impl QueryService {
    #[must_use]
    pub fn new(retriever: Arc<dyn Retriever>, llm_client: Arc<dyn LlmClient>) -> Self {
        Self { retriever, llm_client }
    }

    /// Validates `repo_id`/`query`, then runs the full retrieve → assemble →
    /// generate pipeline. Returns a fixed "no relevant code found" answer
    /// with empty citations when retrieval finds nothing, without calling
    /// the LLM.
    pub async fn query(&self, repo_id: &str, query: &str, top_k: Option<usize>) -> SearchResult<QueryResponse> {
        if repo_id.trim().is_empty() {
            return Err(SearchError::EmptyRepoId);
        }
        let trimmed = query.trim();
        if trimmed.len() < MIN_QUERY_LEN {
            return Err(SearchError::QueryTooShort);
        }

        metrics::counter!("rag_query_requests_total").increment(1);

        let top_k = top_k.unwrap_or(DEFAULT_TOP_K);
        let retrieval = self.retriever.retrieve(trimmed, repo_id, top_k).await?;
        metrics::histogram!("rag_retrieval_duration_ms").record(retrieval.duration_ms as f64);

        if retrieval.chunks.is_empty() {
            metrics::counter!("rag_query_empty_results_total").increment(1);
            return Ok(QueryResponse {
                answer: NO_RESULTS_ANSWER.to_string(),
                citations: BTreeMap::new(),
                chunks: Vec::new(),
                meta: QueryMeta {
                    total_candidates: retrieval.total_candidates,
                    chunks_used: 0,
                    retrieval_duration_ms: retrieval.duration_ms,
                    token_estimate: 0,
                },
            });
        }

        let assembled = context::assemble(trimmed, &retrieval.chunks, repo_id);
        let answer = self
            .llm_client
            .generate(&assembled.system_prompt, &assembled.user_prompt)
            .await?;

        let chunks = retrieval
            .chunks
            .iter()
            .map(|c| ChunkProjection {
                file_path: c.file_path.clone(),
                start_line: c.start_line,
                end_line: c.end_line,
                symbol_name: c.symbol_name.clone(),
                language: c.language.clone(),
                score: round_to_4_decimals(c.score),
            })
            .collect::<Vec<_>>();
        let chunks_used = chunks.len();

        Ok(QueryResponse {
            answer,
            citations: assembled.citation_map,
            chunks,
            meta: QueryMeta {
                total_candidates: retrieval.total_candidates,
                chunks_used,
                retrieval_duration_ms: retrieval.duration_ms,
                token_estimate: assembled.token_estimate,
            },
        })
    }
}

fn round_to_4_decimals(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingLlmClient, FixedLlmClient, StaticRetriever};
    use codescribe_vector::RetrievedChunk;

    fn chunk(file_path: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            file_path: file_path.to_string(),
            start_line: 1,
            end_line: 10,
            symbol_name: Some("foo".to_string()),
            content: "fn foo() {}".to_string(),
            language: "rust".to_string(),
            score,
        }
    }

    #[tokio::test]
    async fn rejects_empty_repo_id() {
        let service = QueryService::new(
            Arc::new(StaticRetriever::new(vec![])),
            Arc::new(FixedLlmClient::new("unused")),
        );
        let err = service.query("", "what does this do", None).await.unwrap_err();
        assert!(matches!(err, SearchError::EmptyRepoId));
    }

    #[tokio::test]
    async fn rejects_query_shorter_than_three_chars() {
        let service = QueryService::new(
            Arc::new(StaticRetriever::new(vec![])),
            Arc::new(FixedLlmClient::new("unused")),
        );
        let err = service.query("octocat/demo", " hi ", None).await.unwrap_err();
        assert!(matches!(err, SearchError::QueryTooShort));
    }

    #[tokio::test]
    async fn returns_fixed_answer_when_retrieval_is_empty() {
        let service = QueryService::new(
            Arc::new(StaticRetriever::new(vec![])),
            Arc::new(FixedLlmClient::new("unused")),
        );
        let response = service.query("octocat/demo", "what does main do", None).await.unwrap();
        assert_eq!(response.answer, NO_RESULTS_ANSWER);
        assert!(response.citations.is_empty());
        assert!(response.chunks.is_empty());
    }

    #[tokio::test]
    async fn assembles_context_and_returns_projected_chunks() {
        let service = QueryService::new(
            Arc::new(StaticRetriever::new(vec![chunk("a.rs", 0.987_654)])),
            Arc::new(FixedLlmClient::new("the answer is [1]")),
        );
        let response = service.query("octocat/demo", "what does foo do", None).await.unwrap();
        assert_eq!(response.answer, "the answer is [1]");
        assert_eq!(response.chunks.len(), 1);
        assert_eq!(response.chunks[0].score, 0.9877);
        assert_eq!(response.citations.len(), 1);
    }

    #[tokio::test]
    async fn propagates_llm_failure() {
        let service = QueryService::new(
            Arc::new(StaticRetriever::new(vec![chunk("a.rs", 0.9)])),
            Arc::new(FailingLlmClient),
        );
        let result = service.query("octocat/demo", "what does foo do", None).await;
        assert!(result.is_err());
    }
}
