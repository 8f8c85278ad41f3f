//! Error taxonomy for the HTTP surface (§7 of the design): every error
//! maps to a stable HTTP status and a `{error, detail?}` JSON body.
//! `detail` only appears on `500`s, and only as a correlation id plus a
//! generic message — full context is logged server-side instead.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use codescribe_common::CommonError;
use codescribe_common::error_sanitizer::sanitize_error;
use codescribe_search::SearchError;
use serde::Serialize;
use thiserror::Error;

/// The main error type for Codetriever API request handlers.
#[derive(Debug, Error)]
pub enum Error {
    /// Request failed validation (bad URL, short query, empty repo id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource (a job) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Error surfaced from the query pipeline (C6/C7/C10).
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Error surfaced from the ingestion/orchestration pipeline (C2/C8/C9).
    #[error("indexing error: {0}")]
    Indexer(#[from] codescribe_indexing::IndexerError),

    /// Error surfaced from the metadata store (repo index / job queue).
    #[error("metadata error: {0}")]
    Meta(#[from] codescribe_meta::MetaError),

    /// Configuration was invalid at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Catch-all for errors that don't fit a named category.
    #[error("{0}")]
    Other(String),
}

impl CommonError for Error {
    fn io_error(msg: impl Into<String>) -> Self {
        Self::Other(format!("io error: {}", msg.into()))
    }

    fn config_error(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    fn parse_error(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn other_error(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// A specialized `Result` type for Codetriever API request handlers.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Search(SearchError::QueryTooShort | SearchError::EmptyRepoId) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Search(SearchError::QueryTooShort) => "query must be at least 3 characters".to_string(),
            Self::Search(SearchError::EmptyRepoId) => "repoId must not be empty".to_string(),
            _ => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
            let detail = sanitize_error(&self, "api_request");
            ErrorBody {
                error: self.user_message(),
                detail: Some(detail),
            }
        } else {
            ErrorBody {
                error: self.user_message(),
                detail: None,
            }
        };
        (status, Json(body)).into_response()
    }
}
