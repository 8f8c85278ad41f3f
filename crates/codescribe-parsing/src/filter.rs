//! File Filter (C1): a pure, side-effect-free function that decides which
//! fetched files are worth chunking and embedding.

use std::collections::HashSet;
use std::sync::LazyLock;

/// A file as produced by a repo fetcher, before filtering.
#[derive(Debug, Clone)]
pub struct RawFile {
    /// Repo-relative path, forward-slash separated.
    pub path: String,
    /// Raw file bytes.
    pub content: Vec<u8>,
}

/// A file that passed all filter rules, with its content decoded to text.
#[derive(Debug, Clone)]
pub struct AcceptedFile {
    /// Repo-relative path.
    pub path: String,
    /// UTF-8 text content.
    pub content: String,
}

/// A file rejected by the filter, with the reason it failed.
#[derive(Debug, Clone)]
pub struct RejectedFile {
    /// Repo-relative path.
    pub path: String,
    /// Human-readable, stable rejection reason.
    pub reason: String,
}

/// Outcome of [`filter`]: files worth chunking, and files rejected with reasons.
#[derive(Debug, Clone, Default)]
pub struct FilterResult {
    /// Files that passed every rule.
    pub accepted: Vec<AcceptedFile>,
    /// Files that failed on the first rule that applied, kept for auditability.
    pub rejected: Vec<RejectedFile>,
}

const MIN_SIZE_BYTES: usize = 10;
const MAX_SIZE_BYTES: usize = 512_000;

const DENIED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    ".output",
    ".cache",
    "__pycache__",
    ".pytest_cache",
    "vendor",
    "venv",
    ".venv",
    "env",
    "__pypackages__",
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    "coverage",
    ".nyc_output",
    "htmlcov",
    "tmp",
    "temp",
    "logs",
    ".pnp",
];

const DENIED_FILENAMES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Pipfile.lock",
    "composer.lock",
    ".DS_Store",
    "Thumbs.db",
    ".env",
    ".env.local",
    ".env.production",
    ".gitignore",
    ".gitattributes",
    ".editorconfig",
    ".prettierrc",
];

static ALLOWED_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "md", "mdx", "json", "yaml", "yml", "toml",
    ]
    .into_iter()
    .collect()
});

/// Apply the C1 rules to a batch of raw files, in order, first failure wins.
#[must_use]
pub fn filter(files: Vec<RawFile>) -> FilterResult {
    let mut result = FilterResult::default();
    for file in files {
        match check(&file) {
            Ok(()) => match decode(&file.content) {
                Ok(content) => result.accepted.push(AcceptedFile {
                    path: file.path,
                    content,
                }),
                Err(reason) => {
                    tracing::debug!(path = %file.path, %reason, "rejecting file");
                    result.rejected.push(RejectedFile {
                        path: file.path,
                        reason,
                    });
                }
            },
            Err(reason) => {
                tracing::debug!(path = %file.path, %reason, "rejecting file");
                result.rejected.push(RejectedFile {
                    path: file.path,
                    reason,
                });
            }
        }
    }
    tracing::debug!(
        accepted = result.accepted.len(),
        rejected = result.rejected.len(),
        "filtered batch"
    );
    result
}

fn check(file: &RawFile) -> Result<(), String> {
    check_path(&file.path)?;
    check_size(file.content.len())?;
    check_binary(&file.content)?;
    Ok(())
}

fn check_path(path: &str) -> Result<(), String> {
    check_directory_denylist(path)?;
    check_filename_denylist(path)?;
    check_extension_allowlist(path)?;
    Ok(())
}

/// Applies the path/extension rules alone — the directory denylist,
/// filename denylist, and extension allowlist — without the content-based
/// size and binary checks. Lets a fetcher discard obviously-unwanted blobs
/// (denied directories, lockfiles, unsupported extensions) before it ever
/// downloads their content.
#[must_use]
pub fn path_is_admissible(path: &str) -> bool {
    check_path(path).is_ok()
}

fn check_directory_denylist(path: &str) -> Result<(), String> {
    let segments: Vec<&str> = path.split('/').collect();
    let dir_segments = segments.split_last().map_or(&[][..], |(_, rest)| rest);
    for segment in dir_segments {
        if DENIED_DIRS.contains(&segment) || segment.ends_with(".egg-info") {
            return Err(format!("path segment '{segment}' is in the directory denylist"));
        }
    }
    Ok(())
}

fn check_filename_denylist(path: &str) -> Result<(), String> {
    let basename = basename(path);
    if DENIED_FILENAMES.contains(&basename)
        || basename.starts_with(".eslintrc")
        || basename.starts_with("jest.config.")
        || basename == "vitest.config.ts"
    {
        return Err(format!("filename '{basename}' is in the filename denylist"));
    }
    Ok(())
}

fn check_extension_allowlist(path: &str) -> Result<(), String> {
    let ext = extension(path).ok_or_else(|| "no file extension".to_string())?;
    if ALLOWED_EXTENSIONS.contains(ext) {
        Ok(())
    } else {
        Err(format!("extension '.{ext}' is not in the allowlist"))
    }
}

fn check_size(size_bytes: usize) -> Result<(), String> {
    if (MIN_SIZE_BYTES..=MAX_SIZE_BYTES).contains(&size_bytes) {
        Ok(())
    } else {
        Err(format!(
            "size {size_bytes} bytes is outside [{MIN_SIZE_BYTES}, {MAX_SIZE_BYTES}]"
        ))
    }
}

fn check_binary(content: &[u8]) -> Result<(), String> {
    if content.contains(&0) {
        Err("content contains a NUL byte".to_string())
    } else {
        Ok(())
    }
}

/// Decode file bytes as UTF-8, probing a couple of common legacy encodings
/// before giving up and rejecting the file as binary. Never panics.
fn decode(bytes: &[u8]) -> Result<String, String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }
    // Lossless re-encode attempt: Latin-1 bytes map 1:1 onto the first 256
    // Unicode scalar values, so this never fails, but we only accept it if
    // the result still looks like text (no embedded NUL, as above).
    let latin1: String = bytes.iter().map(|&b| b as char).collect();
    if latin1.contains('\0') {
        Err("content is not valid UTF-8 and contains a NUL byte after re-encoding".to_string())
    } else {
        Ok(latin1)
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension(path: &str) -> Option<&str> {
    let name = basename(path);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext == name {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(path: &str, content: &str) -> RawFile {
        RawFile {
            path: path.to_string(),
            content: content.as_bytes().to_vec(),
        }
    }

    #[test]
    fn accepts_a_plain_typescript_file() {
        let result = filter(vec![raw("src/index.ts", "export const x = 1;\n")]);
        assert_eq!(result.accepted.len(), 1);
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn rejects_files_under_denied_directories() {
        let result = filter(vec![raw("node_modules/lodash/index.js", "module.exports = {};")]);
        assert!(result.accepted.is_empty());
        assert_eq!(result.rejected.len(), 1);
        assert!(result.rejected[0].reason.contains("node_modules"));
    }

    #[test]
    fn rejects_denylisted_filenames() {
        let result = filter(vec![raw("package-lock.json", "{}dummydummydummy")]);
        assert!(result.accepted.is_empty());
    }

    #[test]
    fn rejects_extensions_outside_the_allowlist() {
        let result = filter(vec![raw("image.png", "not really a png but long enough")]);
        assert!(result.accepted.is_empty());
        assert!(result.rejected[0].reason.contains("allowlist"));
    }

    #[test]
    fn rejects_files_below_minimum_size() {
        let result = filter(vec![raw("a.ts", "x")]);
        assert!(result.accepted.is_empty());
        assert!(result.rejected[0].reason.contains("outside"));
    }

    #[test]
    fn rejects_files_above_maximum_size() {
        let content = "a".repeat(MAX_SIZE_BYTES + 1);
        let result = filter(vec![raw("big.ts", &content)]);
        assert!(result.accepted.is_empty());
    }

    #[test]
    fn rejects_content_with_a_nul_byte() {
        let result = filter(vec![RawFile {
            path: "bin.ts".to_string(),
            content: b"const x = 1;\0\0\0\0\0\0\0".to_vec(),
        }]);
        assert!(result.accepted.is_empty());
        assert!(result.rejected[0].reason.contains("NUL"));
    }

    #[test]
    fn decodes_latin1_bytes_instead_of_crashing() {
        let mut content = b"const name = \"caf".to_vec();
        content.push(0xE9); // 'e' with acute accent in Latin-1, invalid UTF-8 alone
        content.extend_from_slice(b"\";\nconsole.log(name);\n");
        let result = filter(vec![RawFile {
            path: "latin1.ts".to_string(),
            content,
        }]);
        assert_eq!(result.accepted.len(), 1);
    }

    #[test]
    fn egg_info_directories_are_denied() {
        let result = filter(vec![raw("foo.egg-info/PKG-INFO.md", "# package info here")]);
        assert!(result.accepted.is_empty());
    }
}
