//! Extension-to-language table used for the scanner's language breakdown
//! and to pick a structure-outline strategy.

/// Maps a lowercase file extension (without the dot) to a language name.
///
/// Covers well over 40 extensions, generalizing the teacher's per-language
/// boundary-pattern table in the original code chunker.
#[must_use]
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext.to_ascii_lowercase().as_str() {
        "rs" => "Rust",
        "py" | "pyi" | "pyw" => "Python",
        "js" | "mjs" | "cjs" => "JavaScript",
        "jsx" => "JavaScript (JSX)",
        "ts" | "mts" | "cts" => "TypeScript",
        "tsx" => "TypeScript (TSX)",
        "go" => "Go",
        "java" => "Java",
        "c" => "C",
        "h" => "C Header",
        "cc" | "cpp" | "cxx" => "C++",
        "hh" | "hpp" | "hxx" => "C++ Header",
        "rb" => "Ruby",
        "php" => "PHP",
        "cs" => "C#",
        "swift" => "Swift",
        "kt" | "kts" => "Kotlin",
        "scala" => "Scala",
        "m" => "Objective-C",
        "mm" => "Objective-C++",
        "sh" | "bash" | "zsh" => "Shell",
        "ps1" => "PowerShell",
        "pl" | "pm" => "Perl",
        "lua" => "Lua",
        "r" => "R",
        "jl" => "Julia",
        "hs" => "Haskell",
        "ex" | "exs" => "Elixir",
        "erl" => "Erlang",
        "clj" | "cljs" => "Clojure",
        "ml" | "mli" => "OCaml",
        "fs" | "fsi" | "fsx" => "F#",
        "dart" => "Dart",
        "zig" => "Zig",
        "nim" => "Nim",
        "sql" => "SQL",
        "proto" => "Protocol Buffers",
        "graphql" | "gql" => "GraphQL",
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "scss" | "sass" => "Sass",
        "less" => "Less",
        "vue" => "Vue",
        "svelte" => "Svelte",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "xml" => "XML",
        "md" | "markdown" => "Markdown",
        "rst" => "reStructuredText",
        "txt" => "Plain Text",
        "dockerfile" => "Dockerfile",
        "makefile" | "mk" => "Makefile",
        "tf" => "Terraform",
        "vim" => "VimScript",
        "el" => "Emacs Lisp",
        "asm" | "s" => "Assembly",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(language_for_extension("rs"), Some("Rust"));
        assert_eq!(language_for_extension("PY"), Some("Python"));
        assert_eq!(language_for_extension("tsx"), Some("TypeScript (TSX)"));
    }

    #[test]
    fn unknown_extension_is_none() {
        assert_eq!(language_for_extension("xyz123"), None);
    }

    #[test]
    fn covers_at_least_forty_extensions() {
        let exts = [
            "rs", "py", "pyi", "pyw", "js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx", "go",
            "java", "c", "h", "cc", "cpp", "cxx", "hh", "hpp", "hxx", "rb", "php", "cs", "swift",
            "kt", "kts", "scala", "m", "mm", "sh", "bash", "zsh", "ps1", "pl", "pm", "lua", "r",
            "jl", "hs", "ex", "exs", "erl", "clj", "cljs", "ml", "mli", "fs", "fsi", "fsx", "dart",
            "zig", "nim", "sql", "proto", "graphql", "gql", "html", "htm", "css", "scss", "sass",
            "less", "vue", "svelte", "json", "yaml", "yml", "toml", "xml", "md", "markdown", "rst",
            "txt",
        ];
        assert!(exts.len() >= 40);
        for ext in exts {
            assert!(
                language_for_extension(ext).is_some(),
                "missing mapping for .{ext}"
            );
        }
    }
}
