//! Symbol-start detection for the two symbol-aware chunkers (A: TS/JS, B:
//! Python). Each detector only needs to locate the *start* of a symbol and
//! its name; [`super::chunker`] turns a list of boundaries into chunks.

use regex::Regex;
use std::sync::LazyLock;

/// A detected symbol boundary: the 1-indexed line it starts on, and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolBoundary {
    /// 1-indexed line the symbol's declaration starts on.
    pub start_line: usize,
    /// The symbol's name, as captured from the declaration.
    pub symbol_name: String,
}

static TS_JS_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

static TS_JS_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)")
        .unwrap()
});

static TS_JS_ARROW_CONST: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r"^\s*export\s+(?:default\s+)?const\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s*)?\(",
    )
    .unwrap()
});

/// Chunker A: scans TypeScript/JavaScript source for function declarations,
/// class declarations, and exported consts assigned to arrow functions.
#[must_use]
pub fn find_ts_js_boundaries(content: &str) -> Vec<SymbolBoundary> {
    let mut boundaries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let start_line = idx + 1;
        if let Some(caps) = TS_JS_FUNCTION.captures(line) {
            push_match(&mut boundaries, start_line, &caps);
        } else if let Some(caps) = TS_JS_CLASS.captures(line) {
            push_match(&mut boundaries, start_line, &caps);
        } else if let Some(caps) = TS_JS_ARROW_CONST.captures(line) {
            push_match(&mut boundaries, start_line, &caps);
        }
    }
    boundaries
}

static PY_DEF: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(").unwrap()
});

static PY_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\s*class\s+([A-Za-z_]\w*)").unwrap()
});

/// Chunker B: scans Python source for `def`/`async def` and `class` lines.
#[must_use]
pub fn find_python_boundaries(content: &str) -> Vec<SymbolBoundary> {
    let mut boundaries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let start_line = idx + 1;
        if let Some(caps) = PY_DEF.captures(line) {
            push_match(&mut boundaries, start_line, &caps);
        } else if let Some(caps) = PY_CLASS.captures(line) {
            push_match(&mut boundaries, start_line, &caps);
        }
    }
    boundaries
}

fn push_match(boundaries: &mut Vec<SymbolBoundary>, start_line: usize, caps: &regex::Captures) {
    if let Some(name) = caps.get(1) {
        boundaries.push(SymbolBoundary {
            start_line,
            symbol_name: name.as_str().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_function_declarations() {
        let boundaries = find_ts_js_boundaries("export function add(a, b) {\n  return a + b;\n}\n");
        assert_eq!(boundaries, vec![SymbolBoundary { start_line: 1, symbol_name: "add".to_string() }]);
    }

    #[test]
    fn finds_exported_arrow_consts() {
        let boundaries =
            find_ts_js_boundaries("export const handler = async (req, res) => {\n  return res;\n};\n");
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].symbol_name, "handler");
    }

    #[test]
    fn finds_classes() {
        let boundaries = find_ts_js_boundaries("export default class Widget {\n  render() {}\n}\n");
        assert_eq!(boundaries[0].symbol_name, "Widget");
    }

    #[test]
    fn finds_python_defs_and_async_defs() {
        let boundaries = find_python_boundaries("def foo():\n    pass\n\nasync def bar():\n    pass\n");
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].symbol_name, "foo");
        assert_eq!(boundaries[1].symbol_name, "bar");
    }

    #[test]
    fn finds_python_classes() {
        let boundaries = find_python_boundaries("class Foo:\n    def bar(self):\n        pass\n");
        assert_eq!(boundaries[0].symbol_name, "Foo");
    }

    #[test]
    fn returns_empty_when_no_symbols_present() {
        assert!(find_ts_js_boundaries("const x = 1;\nconsole.log(x);\n").is_empty());
        assert!(find_python_boundaries("x = 1\nprint(x)\n").is_empty());
    }
}
