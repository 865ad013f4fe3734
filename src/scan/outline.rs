//! Per-file structure outlines: function/class/async-definition boundaries
//! with line numbers.
//!
//! Rust files get a proper syntax tree via `syn`; every other language uses
//! a regex boundary table generalizing the teacher's original code-chunking
//! patterns (see `DESIGN.md`).

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// One structural entry in a file's outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Kind of structure (`fn`, `class`, `async fn`, `struct`, …).
    pub kind: String,
    /// Identifier name, if one could be extracted.
    pub name: String,
    /// 1-indexed line the structure starts on.
    pub line: usize,
    /// 1-indexed line the structure's body ends on, inclusive.
    pub end_line: usize,
}

/// Produces a structure outline for `content`, given its detected language.
///
/// # Errors
/// Returns [`ScanError::OutlineFailed`] if Rust source fails to parse as a
/// syntax tree (regex-based languages never fail; they just find nothing).
pub fn outline(path: &str, content: &str, language: Option<&str>) -> Result<Vec<OutlineEntry>, ScanError> {
    match language {
        Some("Rust") => outline_rust(path, content),
        Some(lang) => Ok(outline_regex(content, lang)),
        None => Ok(Vec::new()),
    }
}

fn outline_rust(path: &str, content: &str) -> Result<Vec<OutlineEntry>, ScanError> {
    let file = syn::parse_file(content).map_err(|e| ScanError::OutlineFailed {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    let mut entries = Vec::new();
    for item in &file.items {
        collect_item(item, content, &mut entries);
    }
    Ok(entries)
}

fn collect_item(item: &syn::Item, content: &str, out: &mut Vec<OutlineEntry>) {
    use syn::spanned::Spanned;
    use syn::Item;
    match item {
        Item::Fn(f) => {
            let kind = if f.sig.asyncness.is_some() {
                "async fn"
            } else {
                "fn"
            };
            push_entry(out, kind, &f.sig.ident.to_string(), f.sig.ident.span(), item.span(), content);
        }
        Item::Struct(s) => push_entry(out, "struct", &s.ident.to_string(), s.ident.span(), item.span(), content),
        Item::Enum(e) => push_entry(out, "enum", &e.ident.to_string(), e.ident.span(), item.span(), content),
        Item::Trait(t) => push_entry(out, "trait", &t.ident.to_string(), t.ident.span(), item.span(), content),
        Item::Mod(m) => push_entry(out, "mod", &m.ident.to_string(), m.ident.span(), item.span(), content),
        Item::Impl(i) => {
            for inner in &i.items {
                if let syn::ImplItem::Fn(f) = inner {
                    let kind = if f.sig.asyncness.is_some() {
                        "async fn"
                    } else {
                        "fn"
                    };
                    push_entry(out, kind, &f.sig.ident.to_string(), f.sig.ident.span(), inner.span(), content);
                }
            }
        }
        _ => {}
    }
}

fn push_entry(
    out: &mut Vec<OutlineEntry>,
    kind: &str,
    name: &str,
    ident_span: proc_macro2::Span,
    item_span: proc_macro2::Span,
    content: &str,
) {
    // `syn`'s default (non-`proc-macro2/span-locations`) spans all report line 1;
    // fall back to a text search for the identifier when that happens so the
    // outline still carries a useful line number.
    let reported = ident_span.start().line;
    let line = if reported > 1 {
        reported
    } else {
        locate_identifier(content, kind, name).unwrap_or(1)
    };

    // The whole item's span covers its body too, so its end line is the
    // function/struct/etc.'s actual closing brace rather than the next
    // item's start.
    let reported_end = item_span.end().line;
    let end_line = if reported_end > 1 && reported_end >= line {
        reported_end
    } else {
        line
    };

    out.push(OutlineEntry {
        kind: kind.to_string(),
        name: name.to_string(),
        line,
        end_line,
    });
}

fn locate_identifier(content: &str, kind: &str, name: &str) -> Option<usize> {
    let keyword = kind.split_whitespace().last().unwrap_or(kind);
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.contains(keyword) && trimmed.contains(name) {
            return Some(idx + 1);
        }
    }
    None
}

fn outline_regex(content: &str, language: &str) -> Vec<OutlineEntry> {
    let lines: Vec<&str> = content.lines().collect();
    let mut entries = Vec::new();
    for pattern in patterns_for(language) {
        let re = pattern.regex();
        for m in re.find_iter(content) {
            let line = content[..m.start()].matches('\n').count() + 1;
            let name = pattern
                .name_regex()
                .captures(m.as_str())
                .and_then(|c| c.get(1))
                .map_or_else(String::new, |g| g.as_str().to_string());
            let end_line = pattern.body_end_line(&lines, line);
            entries.push(OutlineEntry {
                kind: pattern.label().to_string(),
                name,
                line,
                end_line,
            });
        }
    }
    entries.sort_by_key(|e| e.line);
    entries
}

/// Scans forward from `start_line` (1-indexed) counting braces, returning
/// the line the opening brace's match closes on. Naive (doesn't skip
/// braces inside string/char literals or comments), same tradeoff as the
/// rest of this module's regex boundary table.
fn brace_body_end_line(lines: &[&str], start_line: usize) -> usize {
    let start_idx = start_line - 1;
    let mut depth = 0i32;
    let mut seen_open = false;
    for (offset, line) in lines[start_idx..].iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    seen_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return start_idx + offset + 1;
        }
    }
    lines.len().max(start_line)
}

/// Scans forward from `start_line` (1-indexed) for the first non-blank
/// line dedented to or past the definition's own indentation, returning
/// the line just before it (the last line of the indented body).
fn indent_body_end_line(lines: &[&str], start_line: usize) -> usize {
    let start_idx = start_line - 1;
    let base_indent = lines[start_idx].chars().take_while(|c| c.is_whitespace()).count();
    for (offset, line) in lines[start_idx + 1..].iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = line.chars().take_while(|c| c.is_whitespace()).count();
        if indent <= base_indent {
            return start_idx + offset + 1;
        }
    }
    lines.len().max(start_line)
}

#[derive(Debug, Clone, Copy)]
enum Boundary {
    PythonDef,
    PythonClass,
    PythonAsyncDef,
    JsFunction,
    JsClass,
    GoFunc,
    GoType,
    JavaClass,
    JavaMethod,
    CFunction,
    CppClass,
    RubyDef,
    RubyClass,
    PhpFunction,
    PhpClass,
    Generic,
}

fn patterns_for(language: &str) -> &'static [Boundary] {
    use Boundary::{
        CFunction, CppClass, Generic, GoFunc, GoType, JavaClass, JavaMethod, JsClass, JsFunction,
        PhpClass, PhpFunction, PythonAsyncDef, PythonClass, PythonDef, RubyClass, RubyDef,
    };
    match language {
        "Python" => &[PythonDef, PythonClass, PythonAsyncDef],
        "JavaScript" | "JavaScript (JSX)" | "TypeScript" | "TypeScript (TSX)" => {
            &[JsFunction, JsClass]
        }
        "Go" => &[GoFunc, GoType],
        "Java" => &[JavaClass, JavaMethod],
        "C" | "C Header" | "C++" | "C++ Header" => &[CFunction, CppClass],
        "Ruby" => &[RubyDef, RubyClass],
        "PHP" => &[PhpFunction, PhpClass],
        _ => &[Generic],
    }
}

impl Boundary {
    fn label(self) -> &'static str {
        match self {
            Self::PythonDef | Self::JsFunction | Self::GoFunc | Self::CFunction | Self::RubyDef
            | Self::PhpFunction | Self::Generic => "function",
            Self::PythonClass | Self::JsClass | Self::JavaClass | Self::CppClass
            | Self::RubyClass | Self::PhpClass => "class",
            Self::PythonAsyncDef => "async function",
            Self::GoType => "type",
            Self::JavaMethod => "method",
        }
    }

    fn regex(self) -> &'static Regex {
        macro_rules! static_regex {
            ($name:ident, $pattern:expr) => {{
                static $name: OnceLock<Regex> = OnceLock::new();
                $name.get_or_init(|| Regex::new($pattern).expect("valid boundary regex"))
            }};
        }
        match self {
            Self::PythonDef => static_regex!(PY_DEF, r"(?m)^[ \t]*def\s+(\w+)"),
            Self::PythonClass => static_regex!(PY_CLASS, r"(?m)^[ \t]*class\s+(\w+)"),
            Self::PythonAsyncDef => static_regex!(PY_ASYNC, r"(?m)^[ \t]*async\s+def\s+(\w+)"),
            Self::JsFunction => static_regex!(
                JS_FN,
                r"(?m)^[ \t]*(?:export\s+)?(?:async\s+)?function\s*\*?\s*(\w+)"
            ),
            Self::JsClass => static_regex!(JS_CLASS, r"(?m)^[ \t]*(?:export\s+)?class\s+(\w+)"),
            Self::GoFunc => static_regex!(GO_FN, r"(?m)^func\s+(?:\([^)]+\)\s*)?(\w+)"),
            Self::GoType => static_regex!(GO_TYPE, r"(?m)^type\s+(\w+)\s+(?:struct|interface)"),
            Self::JavaClass => static_regex!(
                JAVA_CLASS,
                r"(?m)^[ \t]*(?:public|private|protected)?\s*(?:abstract\s+)?class\s+(\w+)"
            ),
            Self::JavaMethod => static_regex!(
                JAVA_METHOD,
                r"(?m)^[ \t]*(?:public|private|protected)\s+(?:static\s+)?\S+\s+(\w+)\s*\([^)]*\)\s*\{"
            ),
            Self::CFunction => static_regex!(C_FN, r"(?m)^[ \t]*\w[\w\s*]*\s+(\w+)\s*\([^)]*\)\s*\{"),
            Self::CppClass => static_regex!(CPP_CLASS, r"(?m)^[ \t]*(?:class|struct)\s+(\w+)"),
            Self::RubyDef => static_regex!(RUBY_DEF, r"(?m)^[ \t]*def\s+(\w+)"),
            Self::RubyClass => static_regex!(RUBY_CLASS, r"(?m)^[ \t]*class\s+(\w+)"),
            Self::PhpFunction => static_regex!(
                PHP_FN,
                r"(?m)^[ \t]*(?:public|private|protected)?\s*(?:static\s+)?function\s+(\w+)"
            ),
            Self::PhpClass => static_regex!(PHP_CLASS, r"(?m)^[ \t]*class\s+(\w+)"),
            Self::Generic => static_regex!(
                GENERIC,
                r"(?m)^[ \t]*(?:function|def|fn|func|sub|proc)\s+(\w+)"
            ),
        }
    }

    /// Same pattern, used to pull the captured name back out of a whole match.
    fn name_regex(self) -> &'static Regex {
        self.regex()
    }

    /// Finds the body's real end line (1-indexed, inclusive) for a match
    /// starting on `start_line`, using brace-depth counting for
    /// brace-delimited languages and indentation for indent-delimited ones.
    fn body_end_line(self, lines: &[&str], start_line: usize) -> usize {
        match self {
            Self::PythonDef | Self::PythonClass | Self::PythonAsyncDef | Self::RubyDef | Self::RubyClass => {
                indent_body_end_line(lines, start_line)
            }
            Self::JsFunction
            | Self::JsClass
            | Self::GoFunc
            | Self::GoType
            | Self::JavaClass
            | Self::JavaMethod
            | Self::CFunction
            | Self::CppClass
            | Self::PhpFunction
            | Self::PhpClass
            | Self::Generic => brace_body_end_line(lines, start_line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_outline_finds_functions_and_structs() {
        let src = "fn alpha() {}\n\nstruct Beta {\n    x: i32,\n}\n\nasync fn gamma() {}\n";
        let entries = outline("a.rs", src, Some("Rust")).expect("outline");
        let kinds: Vec<&str> = entries.iter().map(|e| e.kind.as_str()).collect();
        assert!(kinds.contains(&"fn"));
        assert!(kinds.contains(&"struct"));
        assert!(kinds.contains(&"async fn"));
    }

    #[test]
    fn python_outline_regex_path() {
        let src = "def alpha():\n    pass\n\nclass Beta:\n    def method(self):\n        pass\n";
        let entries = outline("a.py", src, Some("Python")).expect("outline");
        assert!(entries.iter().any(|e| e.name == "alpha"));
        assert!(entries.iter().any(|e| e.name == "Beta"));
    }

    #[test]
    fn unknown_language_yields_empty_outline() {
        let entries = outline("a.xyz", "whatever", None).expect("outline");
        assert!(entries.is_empty());
    }

    #[test]
    fn invalid_rust_source_is_an_error_not_a_panic() {
        let result = outline("bad.rs", "fn (((", Some("Rust"));
        assert!(result.is_err());
    }

    #[test]
    fn rust_outline_reports_real_body_end_not_next_items_start() {
        // Mirrors the worked example: a function starting at line 5 with a
        // body ending at line 20, followed (with a gap) by another starting
        // at line 30 ending at line 55, in a 60-line file.
        let mut src = String::new();
        for _ in 0..4 {
            src.push_str("// pad\n");
        }
        src.push_str("fn first() {\n");
        for _ in 0..14 {
            src.push_str("    1;\n");
        }
        src.push_str("}\n");
        while src.lines().count() < 29 {
            src.push_str("// pad\n");
        }
        src.push_str("fn second() {\n");
        for _ in 0..24 {
            src.push_str("    2;\n");
        }
        src.push_str("}\n");

        let entries = outline("a.rs", &src, Some("Rust")).expect("outline");
        let first = entries.iter().find(|e| e.name == "first").expect("first");
        let second = entries.iter().find(|e| e.name == "second").expect("second");
        assert_eq!(first.line, 5);
        assert_eq!(first.end_line, 20);
        assert_eq!(second.line, 30);
        assert_eq!(second.end_line, 55);
    }

    #[test]
    fn python_outline_uses_indentation_for_body_end() {
        let src = "def alpha():\n    one()\n    two()\n\ndef beta():\n    three()\n";
        let entries = outline("a.py", src, Some("Python")).expect("outline");
        let alpha = entries.iter().find(|e| e.name == "alpha").expect("alpha");
        assert_eq!(alpha.line, 1);
        assert_eq!(alpha.end_line, 3);
    }
}
