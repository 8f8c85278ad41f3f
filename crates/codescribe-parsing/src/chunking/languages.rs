//! Fixed extension-to-language-tag map used to label chunks for the context
//! assembler's fenced code blocks. Not a parser registry: chunking never
//! inspects language grammar, only line patterns (see [`super::symbol`]).

/// Returns the language tag used for a chunk's fenced code block, given its
/// file extension (without the leading dot). Falls back to the extension
/// itself so unknown-but-allowed extensions still get *a* tag.
#[must_use]
pub fn language_for_extension(extension: &str) -> &str {
    match extension {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "md" | "mdx" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        other => other,
    }
}

/// Extracts the extension (without the leading dot) from a repo-relative path.
#[must_use]
pub fn extension_of(path: &str) -> &str {
    let basename = path.rsplit('/').next().unwrap_or(path);
    basename.rsplit_once('.').map_or("", |(_, ext)| ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions() {
        assert_eq!(language_for_extension("ts"), "typescript");
        assert_eq!(language_for_extension("py"), "python");
        assert_eq!(language_for_extension("md"), "markdown");
    }

    #[test]
    fn falls_back_to_the_raw_extension() {
        assert_eq!(language_for_extension("toml"), "toml");
    }

    #[test]
    fn extension_of_handles_nested_paths() {
        assert_eq!(extension_of("src/lib/foo.test.ts"), "ts");
        assert_eq!(extension_of("README"), "");
    }
}
