//! Mock implementations of this crate's trait seams, for downstream tests.

use crate::error::{SearchError, SearchResult};
use crate::llm::LlmClient;
use crate::retriever::{RetrievalResult, Retriever};
use async_trait::async_trait;
use codescribe_vector::RetrievedChunk;

/// Retriever that always returns a fixed set of chunks, ignoring the query.
pub struct StaticRetriever {
    chunks: Vec<RetrievedChunk>,
}

impl StaticRetriever {
    #[must_use]
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, _repo_id: &str, top_k: usize) -> SearchResult<RetrievalResult> {
        let chunks: Vec<_> = self.chunks.iter().take(top_k).cloned().collect();
        Ok(RetrievalResult {
            total_candidates: chunks.len(),
            chunks,
            duration_ms: 0,
        })
    }
}

/// Retriever that always fails, for exercising error propagation.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(&self, query: &str, _repo_id: &str, _top_k: usize) -> SearchResult<RetrievalResult> {
        Err(SearchError::SearchTimeout {
            query: query.to_string(),
            timeout_ms: 0,
        })
    }
}

/// LLM client that always returns a fixed string, ignoring the prompts.
pub struct FixedLlmClient {
    answer: String,
}

impl FixedLlmClient {
    #[must_use]
    pub fn new(answer: impl Into<String>) -> Self {
        Self { answer: answer.into() }
    }
}

#[async_trait]
impl LlmClient for FixedLlmClient {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> SearchResult<String> {
        Ok(self.answer.clone())
    }
}

/// LLM client that always fails, for exercising error propagation.
pub struct FailingLlmClient;

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> SearchResult<String> {
        Err(SearchError::LlmFailed("mock failure".to_string()))
    }
}
