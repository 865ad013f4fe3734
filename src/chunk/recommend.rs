//! Recommendation engine: simple predicates over scan metadata producing an
//! ordered `(strategy, rationale)` list.

use crate::scan::ScanResult;

/// One recommended strategy with a one-line rationale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    /// Strategy name (see [`super::STRATEGY_NAMES`]).
    pub strategy: &'static str,
    /// Why this strategy fits, in one line.
    pub rationale: String,
}

/// Recommends chunking strategies for a scan result, most-suitable first.
#[must_use]
pub fn recommend(scan: &ScanResult) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let file_count = scan.file_count();
    let by_language = scan.by_language();
    let markdown_heavy = by_language.iter().any(|(lang, count)| *lang == "Markdown" && *count > 0);
    let has_structure = !scan.outlines.is_empty();

    if file_count > 1 {
        let dir_count = scan
            .skeleton
            .iter()
            .filter(|e| e.is_dir)
            .count();
        if dir_count > 1 {
            out.push(Recommendation {
                strategy: "files_directory",
                rationale: format!("{file_count} files across {dir_count} directories; group by directory"),
            });
        }
        if by_language.len() > 1 {
            out.push(Recommendation {
                strategy: "files_language",
                rationale: format!("{} distinct languages detected; group by language", by_language.len()),
            });
        }
        out.push(Recommendation {
            strategy: "files_balanced",
            rationale: format!("{file_count} files; balance into equal-size groups for parallel review"),
        });
    }

    if file_count == 1 && has_structure {
        out.push(Recommendation {
            strategy: "functions",
            rationale: "single file with detectable function/class structure".to_string(),
        });
    }

    if markdown_heavy {
        out.push(Recommendation {
            strategy: "headings",
            rationale: "markdown content; split at heading boundaries".to_string(),
        });
    }

    if file_count <= 1 && !has_structure {
        out.push(Recommendation {
            strategy: "semantic",
            rationale: "unstructured content; coalesce into adaptively sized blocks".to_string(),
        });
        out.push(Recommendation {
            strategy: "lines",
            rationale: "fallback: fixed line windows with overlap".to_string(),
        });
    }

    if out.is_empty() {
        out.push(Recommendation {
            strategy: "lines",
            rationale: "no stronger signal found; fixed line windows are always safe".to_string(),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{ScannedFile, SkeletonEntry};
    use std::path::PathBuf;

    fn file(path: &str, lang: Option<&'static str>) -> ScannedFile {
        ScannedFile {
            path: PathBuf::from(path),
            size: 100,
            lines: Some(10),
            language: lang,
        }
    }

    #[test]
    fn multi_directory_recommends_files_directory_first() {
        let mut scan = ScanResult::default();
        scan.files = vec![file("a/x.rs", Some("Rust")), file("b/y.rs", Some("Rust"))];
        scan.skeleton = vec![
            SkeletonEntry { path: PathBuf::from("a"), depth: 1, is_dir: true },
            SkeletonEntry { path: PathBuf::from("b"), depth: 1, is_dir: true },
        ];
        let recs = recommend(&scan);
        assert_eq!(recs[0].strategy, "files_directory");
    }

    #[test]
    fn single_unstructured_file_recommends_semantic() {
        let mut scan = ScanResult::default();
        scan.files = vec![file("notes.txt", None)];
        let recs = recommend(&scan);
        assert!(recs.iter().any(|r| r.strategy == "semantic"));
    }

    #[test]
    fn empty_scan_still_returns_a_fallback() {
        let scan = ScanResult::default();
        let recs = recommend(&scan);
        assert!(!recs.is_empty());
    }
}
