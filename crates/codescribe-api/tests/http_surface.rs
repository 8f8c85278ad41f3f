//! End-to-end coverage of the HTTP surface against an in-memory [`AppState`].

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use codescribe_api::routes;
use common::mock_app_state;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_reports_ok() {
    let app = routes::create_router(mock_app_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = routes::create_router(mock_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn index_then_status_round_trip() {
    let app = routes::create_router(mock_app_state());

    let enqueue = app
        .clone()
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
    assert_eq!(enqueue.status(), StatusCode::ACCEPTED);

    let body = axum::body::to_bytes(enqueue.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let job_id = parsed["jobId"].as_str().unwrap();

    let status = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/index/status/{job_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
}

#[tokio::test]
async fn query_rejects_empty_repo_id() {
    let app = routes::create_router(mock_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/rag/query")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"repoId":"","query":"where is main?"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
