//! The scanner: filesystem metadata, language detection, and per-file
//! structure outlines, all without reading content into the caller's
//! working context beyond what's needed to outline it.

pub mod languages;
pub mod outline;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::ScanError;
use languages::language_for_extension;
pub use outline::{outline, OutlineEntry};

/// One file discovered by the scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedFile {
    /// Path relative to the scan root.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Line count, if the file was readable as text.
    pub lines: Option<usize>,
    /// Detected language, if the extension is known.
    pub language: Option<&'static str>,
}

/// Per-file structure outline, keyed by relative path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutline {
    /// Path relative to the scan root.
    pub path: PathBuf,
    /// Extracted structural entries.
    pub entries: Vec<OutlineEntry>,
}

/// A directory-tree skeleton entry (path + depth), omitting file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonEntry {
    /// Path relative to the scan root.
    pub path: PathBuf,
    /// Depth from the scan root (root's direct children are depth 1).
    pub depth: usize,
    /// Whether this entry is a directory.
    pub is_dir: bool,
}

/// Full result of a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Every file discovered.
    pub files: Vec<ScannedFile>,
    /// Directory skeleton up to the requested depth.
    pub skeleton: Vec<SkeletonEntry>,
    /// Structure outlines for files whose language supports one.
    pub outlines: Vec<FileOutline>,
    /// Paths that could not be read, with a reason; the scan continues past these.
    pub errors: Vec<ScanError>,
    /// Total bytes across all discovered files.
    pub total_bytes: u64,
    /// Total lines across all readable text files.
    pub total_lines: usize,
}

impl ScanResult {
    /// File count discovered by the scan.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Breakdown of file count by detected language, sorted by count descending.
    #[must_use]
    pub fn by_language(&self) -> Vec<(&'static str, usize)> {
        let mut counts: std::collections::HashMap<&'static str, usize> =
            std::collections::HashMap::new();
        for file in &self.files {
            if let Some(lang) = file.language {
                *counts.entry(lang).or_insert(0) += 1;
            }
        }
        let mut out: Vec<_> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out
    }
}

/// Scans `root` up to `max_depth` (`None` means unbounded), producing a
/// [`ScanResult`]. Unreadable paths are recorded in `errors` rather than
/// aborting the scan.
///
/// # Errors
/// Returns [`ScanError::PathNotFound`] if `root` does not exist.
pub fn scan(root: &Path, max_depth: Option<usize>) -> Result<ScanResult, ScanError> {
    if !root.exists() {
        return Err(ScanError::PathNotFound {
            path: root.display().to_string(),
        });
    }

    let mut result = ScanResult::default();
    let walker = match max_depth {
        Some(d) => WalkDir::new(root).max_depth(d),
        None => WalkDir::new(root),
    };

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                result.errors.push(ScanError::Unreadable {
                    path: e.path().map(|p| p.display().to_string()).unwrap_or_default(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf();
        let depth = entry.depth();

        if entry.file_type().is_dir() {
            if depth > 0 {
                result.skeleton.push(SkeletonEntry {
                    path: rel,
                    depth,
                    is_dir: true,
                });
            }
            continue;
        }

        if !entry.file_type().is_file() {
            continue;
        }

        result.skeleton.push(SkeletonEntry {
            path: rel.clone(),
            depth,
            is_dir: false,
        });

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                result.errors.push(ScanError::Unreadable {
                    path: rel.display().to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let size = metadata.len();
        result.total_bytes += size;

        let language = rel
            .extension()
            .and_then(|e| e.to_str())
            .and_then(language_for_extension);

        let lines = fs::read_to_string(entry.path()).ok().map(|s| s.lines().count());
        if let Some(l) = lines {
            result.total_lines += l;
        }

        if let (Some(lang), Ok(content)) = (language, fs::read_to_string(entry.path())) {
            match outline(&rel.display().to_string(), &content, Some(lang)) {
                Ok(entries) if !entries.is_empty() => {
                    result.outlines.push(FileOutline { path: rel.clone(), entries });
                }
                Ok(_) => {}
                Err(e) => result.errors.push(e),
            }
        }

        result.files.push(ScannedFile {
            path: rel,
            size,
            lines,
            language,
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_missing_path_errors() {
        let result = scan(Path::new("/nonexistent/path/xyz"), None);
        assert!(matches!(result, Err(ScanError::PathNotFound { .. })));
    }

    #[test]
    fn scan_counts_files_and_languages() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("a.rs"), "fn main() {}\n").unwrap();
        fs::write(tmp.path().join("b.py"), "def f():\n    pass\n").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/c.rs"), "fn g() {}\n").unwrap();

        let result = scan(tmp.path(), None).expect("scan");
        assert_eq!(result.file_count(), 3);
        let by_lang = result.by_language();
        assert!(by_lang.contains(&("Rust", 2)));
        assert!(by_lang.contains(&("Python", 1)));
    }

    #[test]
    fn scan_produces_outlines_for_known_languages() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("a.rs"), "fn alpha() {}\nfn beta() {}\n").unwrap();
        let result = scan(tmp.path(), None).expect("scan");
        assert_eq!(result.outlines.len(), 1);
        assert_eq!(result.outlines[0].entries.len(), 2);
    }

    #[test]
    fn scan_respects_max_depth() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("a/b/deep.rs"), "fn x() {}\n").unwrap();
        fs::write(tmp.path().join("top.rs"), "fn y() {}\n").unwrap();

        let shallow = scan(tmp.path(), Some(1)).expect("scan");
        assert_eq!(shallow.file_count(), 1);
    }
}
