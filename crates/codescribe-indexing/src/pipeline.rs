//! Ingestion Pipeline (C8): fetch → filter → chunk, each phase's output
//! feeding the next. Pure data-transform over I/O; no persistence here.

use crate::error::IndexerResult;
use crate::fetcher::{RepoFetcher, RepoMeta};
use codescribe_parsing::{chunk, filter, CodeChunk};
use std::time::Instant;

/// Timing and count statistics for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub files_fetched: usize,
    pub files_accepted: usize,
    pub files_rejected: usize,
    pub chunks_emitted: usize,
    pub fetch_duration_ms: u64,
    pub filter_duration_ms: u64,
    pub chunk_duration_ms: u64,
}

/// Runs fetch → filter → chunk for `url`, returning the repo id, the
/// emitted chunks, repo metadata, and phase statistics.
pub async fn run(fetcher: &RepoFetcher, url: &str) -> IndexerResult<(Vec<CodeChunk>, RepoMeta, PipelineStats)> {
    let mut stats = PipelineStats::default();

    let fetch_started = Instant::now();
    let (raw_files, repo_meta) = fetcher.fetch(url).await?;
    stats.files_fetched = raw_files.len();
    stats.fetch_duration_ms = fetch_started.elapsed().as_millis() as u64;

    let filter_started = Instant::now();
    let filtered = filter(raw_files);
    stats.files_accepted = filtered.accepted.len();
    stats.files_rejected = filtered.rejected.len();
    stats.filter_duration_ms = filter_started.elapsed().as_millis() as u64;

    for rejected in &filtered.rejected {
        tracing::debug!(path = %rejected.path, reason = %rejected.reason, "file rejected by filter");
    }

    let chunk_started = Instant::now();
    let mut chunks = Vec::new();
    for file in &filtered.accepted {
        let result = chunk(&repo_meta.repo_id, &file.path, &file.content);
        chunks.extend(result.chunks);
    }
    stats.chunks_emitted = chunks.len();
    stats.chunk_duration_ms = chunk_started.elapsed().as_millis() as u64;

    Ok((chunks, repo_meta, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::RepoFetcher;

    #[tokio::test]
    async fn run_fetches_filters_and_chunks_accepted_files() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/octocat/demo"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"default_branch": "main", "size": 1})),
            )
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/octocat/demo/git/trees/main"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree": [
                    {"path": "src/main.ts", "type": "blob", "sha": "abc", "size": 30},
                    {"path": "src/tiny.ts", "type": "blob", "sha": "def", "size": 2},
                    {"path": "node_modules/dep/index.js", "type": "blob", "sha": "ghi", "size": 30},
                ]
            })))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/octocat/demo/contents/src/main.ts"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("function main() {\n    console.log(\"hi\");\n}\n"))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/octocat/demo/contents/src/tiny.ts"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("hi"))
            .mount(&server)
            .await;

        let fetcher = RepoFetcher::new(None).with_api_base_url(server.uri());
        let (chunks, repo_meta, stats) = run(&fetcher, "https://github.com/octocat/demo").await.unwrap();

        // `node_modules/dep/index.js` never reaches this point at all: the
        // fetcher pre-filters denied directories before fetching blobs, so
        // only the two `src/` entries are counted as fetched.
        assert_eq!(repo_meta.repo_id, "octocat/demo");
        assert_eq!(stats.files_fetched, 2);
        assert_eq!(stats.files_accepted, 1);
        assert_eq!(stats.files_rejected, 1);
        assert_eq!(stats.chunks_emitted, chunks.len());
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].repo_id, "octocat/demo");
    }

    #[tokio::test]
    async fn run_returns_no_chunks_for_an_empty_repo() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/octocat/empty"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"default_branch": "main", "size": 0})),
            )
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/repos/octocat/empty/git/trees/main"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"tree": []})))
            .mount(&server)
            .await;

        let fetcher = RepoFetcher::new(None).with_api_base_url(server.uri());
        let (chunks, _repo_meta, stats) = run(&fetcher, "https://github.com/octocat/empty").await.unwrap();

        assert!(chunks.is_empty());
        assert_eq!(stats.files_fetched, 0);
    }
}
