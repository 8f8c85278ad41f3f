//! Context Assembler (C7): groups retrieved chunks by file and builds a
//! numbered-citation prompt pair under a fixed character budget.

use codescribe_vector::RetrievedChunk;
use std::collections::BTreeMap;

/// Maximum character count the assembled blocks may accumulate to before
/// further chunks are dropped (~3k tokens).
pub const MAX_CONTEXT_CHARS: usize = 12_000;

const SYSTEM_PROMPT: &str = "You are a code assistant answering questions about a codebase. \
Answer only using the provided context. Cite every claim with a bracketed \
marker like [1] referencing the source block it came from. Always include \
the file path and line numbers for anything you cite. If the context does \
not contain enough information to answer, say so plainly instead of \
guessing. Be concise.";

/// One entry of the assembled prompt's citation map, keyed by `"[N]"`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol_name: Option<String>,
}

/// Result of [`assemble`].
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub system_prompt: String,
    pub user_prompt: String,
    pub citation_map: BTreeMap<String, Citation>,
    pub token_estimate: usize,
}

/// Groups `chunks` by `filePath` (insertion order preserved across groups,
/// ascending `startLine` within each group), emits numbered citation blocks
/// until [`MAX_CONTEXT_CHARS`] is exceeded, and assembles the system/user
/// prompt pair. Pure function: no I/O, no network, no repo_id-based
/// filtering (the retriever already scoped `chunks` to one repo).
#[must_use]
pub fn assemble(query: &str, chunks: &[RetrievedChunk], _repo_id: &str) -> AssembledContext {
    let groups = group_by_file(chunks);

    let mut blocks: Vec<String> = Vec::new();
    let mut citation_map = BTreeMap::new();
    let mut accumulated_chars = 0usize;
    let mut citation_number = 1usize;
    let mut budget_exceeded = false;

    for (file_path, file_chunks) in &groups {
        if budget_exceeded {
            break;
        }

        let mut file_blocks: Vec<String> = Vec::new();
        for chunk in file_chunks {
            let label = "[".to_string() + &citation_number.to_string() + "]";
            let header = match &chunk.symbol_name {
                Some(sym) => format!("{label} `{sym}` (lines {}–{})", chunk.start_line, chunk.end_line),
                None => format!("{label} lines {}–{}", chunk.start_line, chunk.end_line),
            };
            let block = format!("{header}\n```{}\n{}\n```", chunk.language, chunk.content);

            citation_map.insert(
                label,
                Citation {
                    file_path: file_path.clone(),
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    symbol_name: chunk.symbol_name.clone(),
                },
            );
            citation_number += 1;

            accumulated_chars += block.len();
            file_blocks.push(block);

            if accumulated_chars > MAX_CONTEXT_CHARS {
                budget_exceeded = true;
                break;
            }
        }

        if !file_blocks.is_empty() {
            blocks.push(file_blocks.join("\n\n"));
        }
    }

    let body = blocks.join("\n\n---\n\n");
    let user_prompt = format!(
        "## Codebase Context\n\n{body}\n\n---\n\n## Question\n\n{query}\n\n## Answer (cite sources with [N] markers)"
    );
    let token_estimate = (SYSTEM_PROMPT.len() + user_prompt.len()).div_ceil(4);

    AssembledContext {
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt,
        citation_map,
        token_estimate,
    }
}

/// Groups chunks by `filePath`, preserving first-seen file order, and sorts
/// each group's chunks by `startLine` ascending.
fn group_by_file(chunks: &[RetrievedChunk]) -> Vec<(String, Vec<RetrievedChunk>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Vec<RetrievedChunk>> = BTreeMap::new();

    for chunk in chunks {
        if !groups.contains_key(&chunk.file_path) {
            order.push(chunk.file_path.clone());
        }
        groups.entry(chunk.file_path.clone()).or_default().push(chunk.clone());
    }

    for group in groups.values_mut() {
        group.sort_by_key(|c| c.start_line);
    }

    order
        .into_iter()
        .map(|path| {
            let chunks = groups.remove(&path).unwrap_or_default();
            (path, chunks)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(file_path: &str, start: usize, end: usize, symbol: Option<&str>) -> RetrievedChunk {
        RetrievedChunk {
            file_path: file_path.to_string(),
            start_line: start,
            end_line: end,
            symbol_name: symbol.map(str::to_string),
            content: "fn example() {}".to_string(),
            language: "rust".to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn groups_by_file_and_sorts_by_start_line() {
        let chunks = vec![
            chunk("b.rs", 10, 20, None),
            chunk("a.rs", 30, 40, Some("foo")),
            chunk("a.rs", 1, 5, Some("bar")),
        ];
        let assembled = assemble("what does foo do", &chunks, "octocat/demo");
        let bar_pos = assembled.user_prompt.find("bar").unwrap();
        let foo_pos = assembled.user_prompt.find("foo").unwrap();
        assert!(bar_pos < foo_pos, "a.rs chunks should be ordered by startLine");
    }

    #[test]
    fn citation_map_is_complete_and_numbered_in_order() {
        let chunks = vec![chunk("a.rs", 1, 5, Some("bar")), chunk("b.rs", 10, 20, None)];
        let assembled = assemble("q", &chunks, "r");
        assert_eq!(assembled.citation_map.len(), 2);
        let c1 = assembled.citation_map.get("[1]").unwrap();
        assert_eq!(c1.file_path, "a.rs");
        assert_eq!(c1.symbol_name.as_deref(), Some("bar"));
        let c2 = assembled.citation_map.get("[2]").unwrap();
        assert_eq!(c2.file_path, "b.rs");
        assert!(assembled.user_prompt.contains("[1] `bar` (lines 1–5)"));
        assert!(assembled.user_prompt.contains("[2] lines 10–20"));
    }

    #[test]
    fn stops_emitting_once_budget_exceeded() {
        let big_content = "x".repeat(MAX_CONTEXT_CHARS);
        let mut big_chunk = chunk("a.rs", 1, 5, None);
        big_chunk.content = big_content;
        let chunks = vec![big_chunk, chunk("b.rs", 1, 5, None)];
        let assembled = assemble("q", &chunks, "r");
        assert_eq!(assembled.citation_map.len(), 1);
        assert!(!assembled.user_prompt.contains("b.rs"));
    }

    #[test]
    fn token_estimate_matches_rounded_up_quarter_of_length() {
        let chunks = vec![chunk("a.rs", 1, 5, None)];
        let assembled = assemble("q", &chunks, "r");
        let expected = (assembled.system_prompt.len() + assembled.user_prompt.len()).div_ceil(4);
        assert_eq!(assembled.token_estimate, expected);
    }
}
