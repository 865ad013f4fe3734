//! The extractor: targeted retrieval in three mutually exclusive modes —
//! line range, chunk id via manifest, and regex with context.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::chunk::{Chunk, ChunkSpan, Manifest};
use crate::error::ExtractError;

/// Result of an extraction: the text plus where it came from.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The extracted, newline-normalized text.
    pub text: String,
    /// First line included (1-indexed), if known.
    pub start_line: Option<usize>,
    /// Last line included (1-indexed), if known.
    pub end_line: Option<usize>,
}

/// Extracts an inclusive, 1-indexed line range from `path`. Out-of-range
/// requests clamp to the file's actual bounds.
///
/// # Errors
/// Returns [`ExtractError::FileNotFound`] if `path` cannot be read.
pub fn extract_lines(path: &Path, start: usize, end: usize) -> Result<Extraction, ExtractError> {
    let content = fs::read_to_string(path).map_err(|_| ExtractError::FileNotFound {
        path: path.display().to_string(),
    })?;
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Ok(Extraction {
            text: String::new(),
            start_line: None,
            end_line: None,
        });
    }

    let start = start.max(1).min(lines.len());
    let end = end.max(start).min(lines.len());
    let text = lines[start - 1..end].join("\n");
    Ok(Extraction {
        text,
        start_line: Some(start),
        end_line: Some(end),
    })
}

/// Extracts the slice described by `chunk_id` in `manifest`.
///
/// # Errors
/// Returns [`ExtractError::ChunkNotFound`] if no chunk in the manifest has
/// that id, or [`ExtractError::FileNotFound`] if the chunk's source file
/// cannot be read.
pub fn extract_chunk(manifest: &Manifest, chunk_id: &str, root: &Path) -> Result<Extraction, ExtractError> {
    let chunk = manifest
        .iter()
        .find(|c| c.id == chunk_id)
        .ok_or_else(|| ExtractError::ChunkNotFound {
            id: chunk_id.to_string(),
        })?;

    match &chunk.span {
        ChunkSpan::Lines { start, end } => extract_lines(&root.join(&chunk.source), *start, *end),
        ChunkSpan::Files { paths } => {
            let mut parts = Vec::new();
            for p in paths {
                let full = root.join(p);
                let content = fs::read_to_string(&full).map_err(|_| ExtractError::FileNotFound {
                    path: full.display().to_string(),
                })?;
                parts.push(format!("--- {} ---\n{content}", p.display()));
            }
            Ok(Extraction {
                text: parts.join("\n\n"),
                start_line: None,
                end_line: None,
            })
        }
    }
}

/// One context window around a regex match.
#[derive(Debug, Clone)]
pub struct GrepHunk {
    /// First line of the window (1-indexed).
    pub start_line: usize,
    /// Last line of the window (1-indexed).
    pub end_line: usize,
    /// Window text with each line prefixed by its line number.
    pub text: String,
}

/// Applies `pattern` to `path` with `context` lines of symmetric context
/// around each match, deduplicating overlapping windows and preserving
/// source order.
///
/// # Errors
/// Returns [`ExtractError::FileNotFound`] if `path` cannot be read, or
/// [`ExtractError::InvalidPattern`] if `pattern` fails to compile.
pub fn grep(path: &Path, pattern: &str, context: usize) -> Result<Vec<GrepHunk>, ExtractError> {
    let content = fs::read_to_string(path).map_err(|_| ExtractError::FileNotFound {
        path: path.display().to_string(),
    })?;
    let re = Regex::new(pattern)?;
    let lines: Vec<&str> = content.lines().collect();

    let mut match_lines: Vec<usize> = Vec::new(); // 0-indexed
    for (idx, line) in lines.iter().enumerate() {
        if re.is_match(line) {
            match_lines.push(idx);
        }
    }

    let mut hunks = Vec::new();
    let mut covered: HashSet<usize> = HashSet::new();
    for &m in &match_lines {
        let start = m.saturating_sub(context);
        let end = (m + context).min(lines.len().saturating_sub(1));
        if (start..=end).all(|i| covered.contains(&i)) {
            continue;
        }
        for i in start..=end {
            covered.insert(i);
        }
        let text = lines[start..=end]
            .iter()
            .enumerate()
            .map(|(i, l)| format!("{}: {l}", start + i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        hunks.push(GrepHunk {
            start_line: start + 1,
            end_line: end + 1,
            text,
        });
    }

    Ok(hunks)
}

/// Applies the bounded-output gate; use this for every result headed to the
/// orchestrator. Results destined for a subordinate agent skip this.
#[must_use]
pub fn extraction_for_orchestrator(extraction: &Extraction) -> String {
    crate::gate::gate("extract", &extraction.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_tmp(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("f.txt");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn extract_lines_round_trips_exact_range() {
        let (_dir, path) = write_tmp("a\nb\nc\nd\ne\n");
        let extraction = extract_lines(&path, 2, 4).expect("extract");
        assert_eq!(extraction.text, "b\nc\nd");
    }

    #[test]
    fn extract_lines_clamps_out_of_range() {
        let (_dir, path) = write_tmp("a\nb\nc\n");
        let extraction = extract_lines(&path, 0, 100).expect("extract");
        assert_eq!(extraction.text, "a\nb\nc");
    }

    #[test]
    fn grep_finds_matches_with_context() {
        let (_dir, path) = write_tmp("alpha\nbeta\nPASSWORD=secret\nbeta\nalpha\n");
        let hunks = grep(&path, "PASSWORD", 1).expect("grep");
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].start_line, 2);
        assert_eq!(hunks[0].end_line, 4);
    }

    #[test]
    fn grep_is_idempotent() {
        let (_dir, path) = write_tmp("one\ntwo\nthree\ntwo\n");
        let first = grep(&path, "two", 0).expect("grep");
        let second = grep(&path, "two", 0).expect("grep");
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.text, b.text);
        }
    }

    #[test]
    fn grep_dedupes_overlapping_windows() {
        let (_dir, path) = write_tmp("x\nmatch\nmatch\ny\n");
        let hunks = grep(&path, "match", 2).expect("grep");
        assert_eq!(hunks.len(), 1);
    }

    #[test]
    fn grep_empty_match_set_is_not_an_error() {
        let (_dir, path) = write_tmp("nothing here\n");
        let hunks = grep(&path, "zzz", 0).expect("grep");
        assert!(hunks.is_empty());
    }

    #[test]
    fn extract_chunk_not_found_errors() {
        let manifest: Manifest = vec![Chunk {
            id: "abc".to_string(),
            source: "f.txt".to_string(),
            span: ChunkSpan::Lines { start: 1, end: 2 },
            char_count: 10,
            preview: None,
            language: None,
        }];
        let err = extract_chunk(&manifest, "does-not-exist", Path::new(".")).unwrap_err();
        assert!(matches!(err, ExtractError::ChunkNotFound { .. }));
    }
}
