//! Shared setup for integration tests under `tests/`.

use std::sync::Arc;

use codescribe_api::AppState;
use codescribe_meta::MockDataClient;
use codescribe_search::test_utils::{FixedLlmClient, StaticRetriever};
use codescribe_search::QueryService;

/// Build an [`AppState`] over an empty in-memory job queue and a query
/// service whose retriever always returns no chunks.
#[must_use]
pub fn mock_app_state() -> AppState {
    let job_queue = Arc::new(MockDataClient::new()) as Arc<dyn codescribe_meta::JobQueue>;
    let query_service = Arc::new(QueryService::new(
        Arc::new(StaticRetriever::new(vec![])),
        Arc::new(FixedLlmClient::new("unused")),
    ));
    AppState::new(job_queue, query_service, None)
}
