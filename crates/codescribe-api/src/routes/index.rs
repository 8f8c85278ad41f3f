//! `POST /api/index` and `GET /api/index/status/:jobId`: enqueue a repo
//! indexing job and poll its progress.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use codescribe_indexing::parse_github_url;
use codescribe_meta::{IndexRepoJobData, IndexRepoJobResult, JobStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::state::AppState;

/// Request body for `POST /api/index`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexRequest {
    pub github_url: String,
}

/// Response body for `POST /api/index`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    pub message: String,
    pub job_id: Uuid,
    pub github_url: String,
}

/// Response body for `GET /api/index/status/:jobId`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub state: JobStatus,
    pub progress: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<IndexRepoJobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
}

/// `POST /api/index` — enqueue a GitHub repository for indexing.
///
/// Validates the URL before enqueuing; an invalid URL never reaches the
/// durable queue.
#[utoipa::path(
    post,
    path = "/api/index",
    request_body = IndexRequest,
    responses(
        (status = 202, description = "Job enqueued", body = IndexResponse),
        (status = 400, description = "Invalid GitHub URL"),
    ),
    tag = "index"
)]
pub async fn enqueue_handler(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> Result<(axum::http::StatusCode, Json<IndexResponse>)> {
    parse_github_url(&request.github_url).map_err(|_| Error::InvalidInput("Invalid GitHub URL".to_string()))?;

    let job_id = state
        .job_queue
        .enqueue(IndexRepoJobData {
            github_url: request.github_url.clone(),
            github_token: state.github_token.clone(),
            requested_by: None,
        })
        .await
        .map_err(Error::from)?;

    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(IndexResponse {
            message: "indexing job enqueued".to_string(),
            job_id,
            github_url: request.github_url,
        }),
    ))
}

/// `GET /api/index/status/:jobId` — poll an indexing job's progress.
#[utoipa::path(
    get,
    path = "/api/index/status/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job id returned by POST /api/index")),
    responses(
        (status = 200, description = "Job status", body = JobStatusResponse),
        (status = 404, description = "Unknown job id"),
    ),
    tag = "index"
)]
pub async fn status_handler(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> Result<Json<JobStatusResponse>> {
    let job = state
        .job_queue
        .get(job_id)
        .await
        .map_err(Error::from)?
        .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;

    Ok(Json(JobStatusResponse {
        job_id: job.job_id,
        state: job.state,
        progress: job.progress,
        result: job.return_value,
        fail_reason: job.fail_reason,
    }))
}

/// Create indexing routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/index", post(enqueue_handler))
        .route("/api/index/status/{job_id}", get(status_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_app_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn enqueue_accepts_a_valid_github_url() {
        let state = mock_app_state();
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/index")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"githubUrl":"https://github.com/octocat/Hello-World"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn enqueue_rejects_an_invalid_url() {
        let state = mock_app_state();
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/index")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"githubUrl":"not-a-url"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_returns_404_for_unknown_job() {
        let state = mock_app_state();
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/index/status/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_reflects_a_queued_job() {
        let state = mock_app_state();
        let job_id = state
            .job_queue
            .enqueue(IndexRepoJobData {
                github_url: "https://github.com/octocat/Hello-World".to_string(),
                github_token: None,
                requested_by: None,
            })
            .await
            .unwrap();
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/index/status/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: JobStatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.job_id, job_id);
        assert_eq!(parsed.state, JobStatus::Queued);
    }
}
