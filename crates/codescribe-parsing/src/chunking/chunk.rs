//! Chunk model shared by every chunking strategy.

use serde::{Deserialize, Serialize};

/// Which strategy produced a chunk (or a whole file's chunks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStrategy {
    /// Symbol boundaries detected by language-specific heuristics.
    Ast,
    /// Fixed-size overlapping windows, used when no symbols were found or
    /// the file's language has no symbol-aware chunker.
    SlidingWindow,
}

/// A single chunk of source code ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Deterministic id: `"{safe(repoId)}__{safe(path)}__L{startLine}"`.
    pub id: String,
    /// `"{owner}/{repo}"` the chunk was extracted from.
    pub repo_id: String,
    /// Repo-relative path the chunk was extracted from.
    pub path: String,
    /// 1-indexed first line of the chunk, inclusive.
    pub start_line: usize,
    /// 1-indexed last line of the chunk, inclusive.
    pub end_line: usize,
    /// Chunk text.
    pub content: String,
    /// Language tag for syntax highlighting / fenced code blocks.
    pub language: String,
    /// Detected symbol name, if the chunk came from symbol-aware chunking.
    pub symbol_name: Option<String>,
    /// 0-based position within the file's emission order.
    pub chunk_index: usize,
}

/// The result of chunking a single file.
#[derive(Debug, Clone)]
pub struct ChunkingResult {
    /// Chunks extracted from the file, in ascending `start_line` order.
    pub chunks: Vec<CodeChunk>,
    /// Which strategy actually produced `chunks`.
    pub strategy: ChunkStrategy,
}

/// Replaces every non-alphanumeric character with `_`, for building
/// deterministic, collision-free chunk ids out of arbitrary repo ids and paths.
#[must_use]
pub fn safe(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Builds the deterministic chunk id for a given repo, path and start line.
#[must_use]
pub fn chunk_id(repo_id: &str, path: &str, start_line: usize) -> String {
    format!("{}__{}__L{start_line}", safe(repo_id), safe(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_replaces_non_alphanumeric_characters() {
        assert_eq!(safe("octocat/Hello-World"), "octocat_Hello_World");
    }

    #[test]
    fn chunk_id_is_deterministic() {
        let id = chunk_id("octocat/Hello-World", "src/index.ts", 42);
        assert_eq!(id, "octocat_Hello_World__src_index_ts__L42");
        assert_eq!(id, chunk_id("octocat/Hello-World", "src/index.ts", 42));
    }
}
