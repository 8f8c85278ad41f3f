//! `POST /api/rag/query`: the Query Service's (C10) HTTP surface —
//! retrieve → assemble → generate, grounded with citations.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use codescribe_search::QueryResponse;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::Result;
use crate::state::AppState;

/// Request body for `POST /api/rag/query`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub repo_id: String,
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// `POST /api/rag/query` — answer a question grounded in an indexed repo's chunks.
#[utoipa::path(
    post,
    path = "/api/rag/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Grounded answer"),
        (status = 400, description = "Invalid repoId or query"),
        (status = 500, description = "Retrieval or LLM failure"),
    ),
    tag = "query"
)]
pub async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let response = state
        .query_service
        .query(&request.repo_id, &request.query, request.top_k)
        .await?;
    Ok(Json(response))
}

/// Create query routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/rag/query", post(query_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_app_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn rejects_a_query_shorter_than_three_characters() {
        let state = mock_app_state();
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/rag/query")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"repoId":"o/r","query":"ok"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn returns_the_fixed_no_results_answer_for_an_unindexed_repo() {
        let state = mock_app_state();
        let app = routes().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/rag/query")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"repoId":"ghost/missing","query":"where is auth?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed["answer"].as_str().unwrap().contains("No relevant code was found"));
        assert!(parsed["citations"].as_object().unwrap().is_empty());
    }
}
