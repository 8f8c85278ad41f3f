//! Sliding-window chunking: the fallback strategy for files with no detected
//! symbols, and for languages with no symbol-aware chunker at all.

use super::chunk::{chunk_id, CodeChunk};
use super::languages::language_for_extension;

/// Chunks carry at most this many lines.
pub const SLIDING_WINDOW_SIZE: usize = 60;
/// Consecutive windows overlap by this many lines.
pub const SLIDING_WINDOW_OVERLAP: usize = 15;
/// Chunks shorter than this are dropped rather than emitted.
pub const MIN_CHUNK_LINES: usize = 3;

const STEP: usize = SLIDING_WINDOW_SIZE - SLIDING_WINDOW_OVERLAP;

/// Splits `lines` into overlapping windows of up to [`SLIDING_WINDOW_SIZE`]
/// lines, stepping by `SLIDING_WINDOW_SIZE - SLIDING_WINDOW_OVERLAP`. The
/// final window is dropped if shorter than [`MIN_CHUNK_LINES`].
#[must_use]
pub fn chunk_sliding_window(
    repo_id: &str,
    path: &str,
    extension: &str,
    lines: &[&str],
) -> Vec<CodeChunk> {
    let language = language_for_extension(extension).to_string();
    let mut chunks = Vec::new();
    if lines.is_empty() {
        return chunks;
    }

    let mut start = 0_usize;
    let mut chunk_index = 0_usize;
    loop {
        let end = (start + SLIDING_WINDOW_SIZE).min(lines.len());
        let window_len = end - start;
        if window_len < MIN_CHUNK_LINES {
            break;
        }
        let start_line = start + 1;
        let end_line = end;
        chunks.push(CodeChunk {
            id: chunk_id(repo_id, path, start_line),
            repo_id: repo_id.to_string(),
            path: path.to_string(),
            start_line,
            end_line,
            content: lines[start..end].join("\n"),
            language: language.clone(),
            symbol_name: None,
            chunk_index,
        });
        chunk_index += 1;
        if end >= lines.len() {
            break;
        }
        start += STEP;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn short_file_yields_a_single_chunk() {
        let text = "a\nb\nc\nd\ne\n";
        let lines = lines_of(text);
        let chunks = chunk_sliding_window("r", "f.txt", "txt", &lines);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 5);
    }

    #[test]
    fn long_file_produces_overlapping_windows() {
        let text = (1..=150)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let lines = lines_of(&text);
        let chunks = chunk_sliding_window("r", "f.txt", "txt", &lines);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 60);
        assert_eq!(chunks[1].start_line, 46);
        assert_eq!(chunks[1].end_line, 105);
    }

    #[test]
    fn final_short_window_is_dropped() {
        // 61 lines: first window [1..=60], next window starts at 46, would be
        // [46..=61] (16 lines) which is >= MIN_CHUNK_LINES so it is kept.
        // Use 47 lines so the second window is only 2 lines and gets dropped.
        let text = (1..=47)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let lines = lines_of(&text);
        let chunks = chunk_sliding_window("r", "f.txt", "txt", &lines);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        let chunks = chunk_sliding_window("r", "f.txt", "txt", &[]);
        assert!(chunks.is_empty());
    }
}
