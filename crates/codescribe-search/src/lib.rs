//! Retrieval and question-answering: embeds a query, finds similar code
//! chunks, assembles a grounded prompt, and calls an LLM for an answer.
//!
//! Three components compose into the query pipeline: the [`retriever`]
//! (C6) embeds the query and searches the vector store, [`context`] (C7)
//! turns the results into a numbered-citation prompt under a character
//! budget, and [`query`] (C10) validates input and ties the two together
//! with an [`llm::LlmClient`] call.

pub mod context;
pub mod error;
pub mod llm;
pub mod query;
pub mod retriever;

pub use context::{assemble, AssembledContext, Citation, MAX_CONTEXT_CHARS};
pub use error::{SearchError, SearchResult};
pub use llm::{GeminiLlmClient, LlmClient, UnconfiguredLlmClient};
pub use query::{ChunkProjection, QueryMeta, QueryResponse, QueryService};
pub use retriever::{DefaultRetriever, RetrievalResult, Retriever, DEFAULT_TOP_K};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
