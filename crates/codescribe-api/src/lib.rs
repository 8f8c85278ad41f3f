//! HTTP surface for the RAG service: enqueues indexing jobs, polls their
//! status, and answers grounded questions over an indexed repository.
//!
//! [`bootstrap`] wires the concrete crates (`codescribe-meta`,
//! `codescribe-vector`, `codescribe-embeddings`, `codescribe-search`,
//! `codescribe-indexing`) into an [`AppState`] plus a standalone
//! [`codescribe_indexing::Orchestrator`] the binary runs as a background
//! task; [`routes`] exposes `/api/index`, `/api/rag/query`, `/health`, and
//! `/metrics`; [`openapi`] generates the Swagger document from route
//! annotations.

pub mod bootstrap;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

#[cfg(test)]
pub mod test_utils;

pub use error::{Error, Result};
pub use state::AppState;
