//! Application state for Axum handlers
//!
//! Contains shared resources that are initialized once at startup and passed
//! to all handlers via dependency injection.

use std::sync::Arc;
use std::time::SystemTime;

use codescribe_meta::JobQueue;
use codescribe_search::QueryService;
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state containing all shared services
///
/// This state is initialized once at application startup and passed to all
/// Axum handlers, avoiding expensive pool/service creation on every request.
///
/// Indexing itself does not live here: the [`codescribe_indexing::Orchestrator`]
/// runs as a standalone background task the binary spawns alongside the HTTP
/// server, draining the same durable queue `job_queue` only enqueues into.
#[derive(Clone)]
pub struct AppState {
    /// Producer side of the durable `"index-repo"` queue; also the read
    /// path for `GET /api/index/status/:jobId`.
    pub job_queue: Arc<dyn JobQueue>,
    /// Retrieve → assemble → generate pipeline backing `/api/rag/query`.
    pub query_service: Arc<QueryService>,
    /// Server-wide `GITHUB_TOKEN`, attached to jobs enqueued by `/api/index`
    /// so workers authenticate fetches at the boosted rate limit.
    pub github_token: Option<String>,
    /// Process start time, for `/health`'s uptime field.
    pub start_time: SystemTime,
    /// Renders the process's recorded `metrics` counters/histograms as
    /// Prometheus text exposition for `GET /metrics`. `None` in tests,
    /// where nothing installs a global recorder.
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state with all services
    #[must_use]
    pub fn new(job_queue: Arc<dyn JobQueue>, query_service: Arc<QueryService>, github_token: Option<String>) -> Self {
        Self {
            job_queue,
            query_service,
            github_token,
            start_time: SystemTime::now(),
            metrics_handle: None,
        }
    }

    /// Attach a Prometheus recorder handle, for `GET /metrics`.
    #[must_use]
    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
