//! Common test utilities for API tests
//!
//! [`mock_app_state`] wires an in-memory [`MockDataClient`] and a
//! [`QueryService`] backed by `codescribe-search`'s test doubles into a
//! real [`AppState`], so route handlers can be exercised end-to-end with
//! `tower::ServiceExt::oneshot` without a database or network access.

use std::sync::Arc;

use codescribe_meta::MockDataClient;
use codescribe_search::test_utils::{FixedLlmClient, StaticRetriever};
use codescribe_search::QueryService;

use crate::state::AppState;

/// Standard test result type for all test functions
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Build an [`AppState`] over an empty in-memory job queue and a query
/// service whose retriever always returns no chunks, so `/api/rag/query`
/// falls back to the fixed "no relevant code" answer without calling an LLM.
#[must_use]
pub fn mock_app_state() -> AppState {
    let job_queue = Arc::new(MockDataClient::new()) as Arc<dyn codescribe_meta::JobQueue>;
    let query_service = Arc::new(QueryService::new(
        Arc::new(StaticRetriever::new(vec![])),
        Arc::new(FixedLlmClient::new("unused")),
    ));
    AppState::new(job_queue, query_service, None)
}
