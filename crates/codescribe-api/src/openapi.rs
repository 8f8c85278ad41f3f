//! `OpenAPI` documentation generation and Swagger UI setup

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// `OpenAPI` documentation for the RAG service.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::index::enqueue_handler,
        crate::routes::index::status_handler,
        crate::routes::query::query_handler,
        crate::routes::health::health_handler,
    ),
    components(
        schemas(
            crate::routes::index::IndexRequest,
            crate::routes::index::IndexResponse,
            crate::routes::index::JobStatusResponse,
            crate::routes::query::QueryRequest,
            crate::routes::health::HealthResponse,
            codescribe_meta::JobStatus,
            codescribe_meta::IndexRepoJobResult,
        )
    ),
    tags(
        (name = "index", description = "Repository indexing jobs"),
        (name = "query", description = "Grounded question answering over an indexed repository"),
        (name = "health", description = "Liveness and monitoring"),
    ),
    info(
        title = "Codescribe RAG API",
        version = "0.1.0",
        description = "Retrieval-augmented question answering over indexed GitHub repositories",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server"),
    )
)]
pub struct ApiDoc;

/// Returns configured Swagger UI service
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Returns `OpenAPI` JSON as a response
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
