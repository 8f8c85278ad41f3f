//! Chunker (C3) dispatch: picks a symbol-aware strategy by extension, falls
//! through to sliding window when no symbols are found or none applies.

use super::chunk::{chunk_id, ChunkStrategy, ChunkingResult, CodeChunk};
use super::languages::{extension_of, language_for_extension};
use super::sliding_window::{chunk_sliding_window, MIN_CHUNK_LINES, SLIDING_WINDOW_OVERLAP};
use super::symbol::{find_python_boundaries, find_ts_js_boundaries, SymbolBoundary};

/// A symbol's block exceeding this many lines is split into overlapping
/// sub-windows rather than emitted as one oversized chunk.
pub const MAX_CHUNK_LINES: usize = 150;

/// Chunks a single file's content, dispatching on its extension.
#[must_use]
pub fn chunk(repo_id: &str, path: &str, content: &str) -> ChunkingResult {
    let extension = extension_of(path);
    let lines: Vec<&str> = content.lines().collect();

    let boundaries = match extension {
        "ts" | "tsx" | "js" | "jsx" | "mjs" => find_ts_js_boundaries(content),
        "py" => find_python_boundaries(content),
        _ => Vec::new(),
    };

    if boundaries.is_empty() {
        return ChunkingResult {
            chunks: chunk_sliding_window(repo_id, path, extension, &lines),
            strategy: ChunkStrategy::SlidingWindow,
        };
    }

    let chunks = chunk_symbol_blocks(repo_id, path, extension, &lines, &boundaries);
    ChunkingResult {
        chunks,
        strategy: ChunkStrategy::Ast,
    }
}

fn chunk_symbol_blocks(
    repo_id: &str,
    path: &str,
    extension: &str,
    lines: &[&str],
    boundaries: &[SymbolBoundary],
) -> Vec<CodeChunk> {
    let language = language_for_extension(extension).to_string();
    let mut chunks = Vec::new();
    let mut chunk_index = 0_usize;

    for (i, boundary) in boundaries.iter().enumerate() {
        let block_start = boundary.start_line; // 1-indexed
        let block_end = boundaries
            .get(i + 1)
            .map_or(lines.len(), |next| next.start_line - 1);
        let block_len = block_end.saturating_sub(block_start) + 1;

        if block_len < MIN_CHUNK_LINES {
            continue;
        }

        if block_len <= MAX_CHUNK_LINES {
            chunks.push(make_chunk(
                repo_id,
                path,
                &language,
                lines,
                block_start,
                block_end,
                Some(boundary.symbol_name.clone()),
                chunk_index,
            ));
            chunk_index += 1;
            continue;
        }

        // Split the oversized block into MAX_CHUNK_LINES sub-windows with
        // SLIDING_WINDOW_OVERLAP lines of overlap, each part numbered.
        let step = MAX_CHUNK_LINES - SLIDING_WINDOW_OVERLAP;
        let mut sub_start = block_start;
        let mut part = 1_usize;
        loop {
            let sub_end = (sub_start + MAX_CHUNK_LINES - 1).min(block_end);
            chunks.push(make_chunk(
                repo_id,
                path,
                &language,
                lines,
                sub_start,
                sub_end,
                Some(format!("{} [part {part}]", boundary.symbol_name)),
                chunk_index,
            ));
            chunk_index += 1;
            if sub_end >= block_end {
                break;
            }
            sub_start += step;
            part += 1;
        }
    }

    chunks
}

#[allow(clippy::too_many_arguments)]
fn make_chunk(
    repo_id: &str,
    path: &str,
    language: &str,
    lines: &[&str],
    start_line: usize,
    end_line: usize,
    symbol_name: Option<String>,
    chunk_index: usize,
) -> CodeChunk {
    let content = lines
        .get(start_line - 1..end_line)
        .unwrap_or_default()
        .join("\n");
    CodeChunk {
        id: chunk_id(repo_id, path, start_line),
        repo_id: repo_id.to_string(),
        path: path.to_string(),
        start_line,
        end_line,
        content,
        language: language.to_string(),
        symbol_name,
        chunk_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::chunk::ChunkStrategy;

    #[test]
    fn symbol_aware_chunking_picks_up_functions() {
        let content = "export function a() {\n  return 1;\n}\n\nexport function b() {\n  return 2;\n}\n";
        let result = chunk("octocat/demo", "src/index.ts", content);
        assert_eq!(result.strategy, ChunkStrategy::Ast);
        assert_eq!(result.chunks.len(), 2);
        assert_eq!(result.chunks[0].symbol_name.as_deref(), Some("a"));
        assert_eq!(result.chunks[1].symbol_name.as_deref(), Some("b"));
    }

    #[test]
    fn falls_through_to_sliding_window_without_symbols() {
        let content = "const x = 1;\nconst y = 2;\nconsole.log(x + y);\n";
        let result = chunk("octocat/demo", "src/constants.ts", content);
        assert_eq!(result.strategy, ChunkStrategy::SlidingWindow);
        assert_eq!(result.chunks.len(), 1);
        assert!(result.chunks[0].symbol_name.is_none());
    }

    #[test]
    fn unsupported_extension_always_uses_sliding_window() {
        let content = "# Title\n\nSome docs.\n";
        let result = chunk("octocat/demo", "README.md", content);
        assert_eq!(result.strategy, ChunkStrategy::SlidingWindow);
    }

    #[test]
    fn oversized_symbol_block_splits_into_numbered_parts() {
        let mut content = String::from("export function big() {\n");
        for i in 0..200 {
            content.push_str(&format!("  const v{i} = {i};\n"));
        }
        content.push_str("}\n");

        let result = chunk("octocat/demo", "src/big.ts", &content);
        assert_eq!(result.strategy, ChunkStrategy::Ast);
        assert!(result.chunks.len() > 1);
        assert_eq!(result.chunks[0].symbol_name.as_deref(), Some("big [part 1]"));
        assert_eq!(result.chunks[1].symbol_name.as_deref(), Some("big [part 2]"));
    }

    #[test]
    fn tiny_trailing_block_is_skipped() {
        let content = "export function a() {\n  return 1;\n}\nexport function b() {\n}\n";
        let result = chunk("octocat/demo", "src/tiny.ts", content);
        // `b`'s block is only 2 lines (< MIN_CHUNK_LINES) and is skipped.
        assert!(result.chunks.iter().all(|c| c.symbol_name.as_deref() != Some("b")));
        let _ = MIN_CHUNK_LINES;
    }

    #[test]
    fn python_symbols_are_detected() {
        let content = "class Foo:\n    def bar(self):\n        return 1\n\n\ndef baz():\n    return 2\n";
        let result = chunk("octocat/demo", "pkg/mod.py", content);
        assert_eq!(result.strategy, ChunkStrategy::Ast);
        assert!(result.chunks.iter().any(|c| c.symbol_name.as_deref() == Some("Foo")));
        assert!(result.chunks.iter().any(|c| c.symbol_name.as_deref() == Some("baz")));
    }
}
