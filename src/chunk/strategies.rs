//! The seven chunking strategies.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::ChunkingError;
use crate::scan::{outline, ScannedFile};

use super::hash::{file_group_id, line_range_id};
use super::{Chunk, ChunkConfig, ChunkSpan, ChunkTarget, Manifest};

/// A named chunking strategy.
pub trait Strategy: Send + Sync {
    /// Stable strategy name, as used on the CLI (`--strategy <name>`).
    fn name(&self) -> &'static str;

    /// One-line description, used in recommendation rationale and help text.
    fn description(&self) -> &'static str;

    /// Produces a manifest for `target` under `config`.
    ///
    /// # Errors
    /// Returns [`ChunkingError`] if `target` doesn't fit this strategy's
    /// input shape or `config` is invalid.
    fn chunk(&self, target: &ChunkTarget<'_>, config: &ChunkConfig) -> Result<Manifest, ChunkingError>;
}

/// Every strategy name this crate supports, in the order `recommend`
/// considers them.
pub const STRATEGY_NAMES: &[&str] = &[
    "lines",
    "files_directory",
    "files_language",
    "files_balanced",
    "functions",
    "headings",
    "semantic",
];

/// Builds a strategy by name.
///
/// # Errors
/// Returns [`ChunkingError::UnknownStrategy`] for any other name.
pub fn create_strategy(name: &str) -> Result<Box<dyn Strategy>, ChunkingError> {
    match name {
        "lines" => Ok(Box::new(LinesStrategy)),
        "files_directory" => Ok(Box::new(FilesDirectoryStrategy)),
        "files_language" => Ok(Box::new(FilesLanguageStrategy)),
        "files_balanced" => Ok(Box::new(FilesBalancedStrategy)),
        "functions" => Ok(Box::new(FunctionsStrategy)),
        "headings" => Ok(Box::new(HeadingsStrategy)),
        "semantic" => Ok(Box::new(SemanticStrategy)),
        other => Err(ChunkingError::UnknownStrategy {
            name: other.to_string(),
        }),
    }
}

/// Lists every supported strategy name.
#[must_use]
pub fn available_strategies() -> &'static [&'static str] {
    STRATEGY_NAMES
}

fn text_target<'a>(target: &'a ChunkTarget<'_>) -> Result<(&'a str, &'a str), ChunkingError> {
    match target {
        ChunkTarget::Text { source, content, .. } => Ok((source, content)),
        ChunkTarget::Files { .. } => Err(ChunkingError::InvalidConfig {
            reason: "this strategy requires single-file text input".to_string(),
        }),
    }
}

fn files_target<'a>(target: &'a ChunkTarget<'_>) -> Result<&'a [ScannedFile], ChunkingError> {
    match target {
        ChunkTarget::Files { files } => Ok(files),
        ChunkTarget::Text { .. } => Err(ChunkingError::InvalidConfig {
            reason: "this strategy requires a scanned file list".to_string(),
        }),
    }
}

/// Fixed line windows with overlap.
pub struct LinesStrategy;

impl Strategy for LinesStrategy {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn description(&self) -> &'static str {
        "Fixed line windows with overlap"
    }

    fn chunk(&self, target: &ChunkTarget<'_>, config: &ChunkConfig) -> Result<Manifest, ChunkingError> {
        config.validate()?;
        let (source, content) = text_target(target)?;
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut manifest = Vec::new();
        let mut start = 0usize; // 0-indexed
        let step = config.chunk_size - config.overlap;
        while start < lines.len() {
            let end = (start + config.chunk_size).min(lines.len());
            let slice = &lines[start..end];
            let char_count = slice.iter().map(|l| l.len() + 1).sum();
            manifest.push(Chunk {
                id: line_range_id(source, start + 1, end),
                source: source.to_string(),
                span: ChunkSpan::Lines {
                    start: start + 1,
                    end,
                },
                char_count,
                preview: slice.first().map(|s| s.to_string()),
                language: None,
            });
            if end == lines.len() {
                break;
            }
            start += step;
        }
        Ok(manifest)
    }
}

/// Groups files by parent directory.
pub struct FilesDirectoryStrategy;

impl Strategy for FilesDirectoryStrategy {
    fn name(&self) -> &'static str {
        "files_directory"
    }

    fn description(&self) -> &'static str {
        "Group files by parent directory"
    }

    fn chunk(&self, target: &ChunkTarget<'_>, _config: &ChunkConfig) -> Result<Manifest, ChunkingError> {
        let files = files_target(target)?;
        let mut groups: BTreeMap<String, Vec<ScannedFile>> = BTreeMap::new();
        for file in files {
            let dir = file
                .path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            groups.entry(dir).or_default().push(file.clone());
        }
        Ok(groups_to_manifest(groups))
    }
}

/// Groups files by detected language.
pub struct FilesLanguageStrategy;

impl Strategy for FilesLanguageStrategy {
    fn name(&self) -> &'static str {
        "files_language"
    }

    fn description(&self) -> &'static str {
        "Group files by detected language"
    }

    fn chunk(&self, target: &ChunkTarget<'_>, _config: &ChunkConfig) -> Result<Manifest, ChunkingError> {
        let files = files_target(target)?;
        let mut groups: BTreeMap<String, Vec<ScannedFile>> = BTreeMap::new();
        for file in files {
            let lang = file.language.unwrap_or("Unknown").to_string();
            groups.entry(lang).or_default().push(file.clone());
        }
        Ok(groups_to_manifest(groups))
    }
}

fn groups_to_manifest(groups: BTreeMap<String, Vec<ScannedFile>>) -> Manifest {
    groups
        .into_iter()
        .map(|(name, files)| {
            let char_count = files.iter().map(|f| f.size as usize).sum();
            let paths = files.into_iter().map(|f| f.path).collect::<Vec<_>>();
            Chunk {
                id: file_group_id(&name, paths.len()),
                source: name,
                span: ChunkSpan::Files { paths },
                char_count,
                preview: None,
                language: None,
            }
        })
        .collect()
}

/// Partitions files into groups of approximately equal total bytes.
///
/// Deterministic across hosts for identical inputs: files are sorted by
/// `(size descending, path ascending)` before a greedy longest-processing-
/// time-first bin pack, so walk order never affects the result (see
/// `DESIGN.md`, open question on cross-host determinism).
pub struct FilesBalancedStrategy;

impl Strategy for FilesBalancedStrategy {
    fn name(&self) -> &'static str {
        "files_balanced"
    }

    fn description(&self) -> &'static str {
        "Partition files into groups of approximately equal total size"
    }

    fn chunk(&self, target: &ChunkTarget<'_>, config: &ChunkConfig) -> Result<Manifest, ChunkingError> {
        let files = files_target(target)?;
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut sorted: Vec<ScannedFile> = files.to_vec();
        sorted.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));

        let target_size = config.target_size.max(1) as u64;
        let mut bins: Vec<(u64, Vec<ScannedFile>)> = Vec::new();
        for file in sorted {
            if let Some(bin) = bins
                .iter_mut()
                .find(|(total, _)| *total + file.size <= target_size)
            {
                bin.0 += file.size;
                bin.1.push(file);
            } else {
                bins.push((file.size, vec![file]));
            }
        }

        Ok(bins
            .into_iter()
            .enumerate()
            .map(|(idx, (total, files))| {
                let name = format!("group_{idx:03}");
                let paths = files.into_iter().map(|f| f.path).collect::<Vec<_>>();
                Chunk {
                    id: file_group_id(&name, paths.len()),
                    source: name,
                    span: ChunkSpan::Files { paths },
                    char_count: total as usize,
                    preview: None,
                    language: None,
                }
            })
            .collect())
    }
}

/// Splits at function/class boundaries from the structure outline.
pub struct FunctionsStrategy;

impl Strategy for FunctionsStrategy {
    fn name(&self) -> &'static str {
        "functions"
    }

    fn description(&self) -> &'static str {
        "Split at function/class boundaries"
    }

    fn chunk(&self, target: &ChunkTarget<'_>, _config: &ChunkConfig) -> Result<Manifest, ChunkingError> {
        let (source, content) = text_target(target)?;
        let language = match target {
            ChunkTarget::Text { language, .. } => *language,
            ChunkTarget::Files { .. } => unreachable!(),
        };

        let entries = outline::outline(source, content, language)
            .map_err(|e| ChunkingError::InvalidConfig { reason: e.to_string() })?;
        let total_lines = content.lines().count();
        if entries.is_empty() || total_lines == 0 {
            return Ok(Vec::new());
        }

        let mut spans: Vec<(usize, usize)> = entries.iter().map(|e| (e.line, e.end_line)).collect();
        spans.sort_unstable();
        spans.dedup();

        let mut manifest = Vec::new();
        for (start, end) in spans {
            let lines: Vec<&str> = content.lines().skip(start - 1).take(end - start + 1).collect();
            let char_count = lines.iter().map(|l| l.len() + 1).sum();
            manifest.push(Chunk {
                id: line_range_id(source, start, end),
                source: source.to_string(),
                span: ChunkSpan::Lines { start, end },
                char_count,
                preview: lines.first().map(|s| s.to_string()),
                language: language.map(str::to_string),
            });
        }
        Ok(manifest)
    }
}

/// Splits at markdown heading boundaries.
pub struct HeadingsStrategy;

impl Strategy for HeadingsStrategy {
    fn name(&self) -> &'static str {
        "headings"
    }

    fn description(&self) -> &'static str {
        "Split at markdown heading boundaries"
    }

    fn chunk(&self, target: &ChunkTarget<'_>, config: &ChunkConfig) -> Result<Manifest, ChunkingError> {
        let (source, content) = text_target(target)?;
        let level_prefix = "#".repeat(config.heading_level.max(1) as usize);
        let lines: Vec<&str> = content.lines().collect();

        let mut starts: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                let t = l.trim_start();
                t.starts_with(&level_prefix)
                    && t.as_bytes().get(level_prefix.len()).is_none_or(|b| *b != b'#')
            })
            .map(|(i, _)| i + 1)
            .collect();

        if starts.is_empty() {
            if lines.is_empty() {
                return Ok(Vec::new());
            }
            starts.push(1);
        }

        let total = lines.len();
        let mut manifest = Vec::new();
        for (idx, &start) in starts.iter().enumerate() {
            let end = starts.get(idx + 1).map_or(total, |next| next - 1);
            let slice = &lines[start - 1..end];
            let char_count = slice.iter().map(|l| l.len() + 1).sum();
            manifest.push(Chunk {
                id: line_range_id(source, start, end),
                source: source.to_string(),
                span: ChunkSpan::Lines { start, end },
                char_count,
                preview: slice.first().map(|s| s.to_string()),
                language: Some("Markdown".to_string()),
            });
        }
        Ok(manifest)
    }
}

/// Coalesces blank-line-separated blocks into adaptively sized chunks.
pub struct SemanticStrategy;

impl Strategy for SemanticStrategy {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn description(&self) -> &'static str {
        "Coalesce blank-line-separated blocks into adaptively sized chunks"
    }

    fn chunk(&self, target: &ChunkTarget<'_>, config: &ChunkConfig) -> Result<Manifest, ChunkingError> {
        let (source, content) = text_target(target)?;
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        // Split into blank-line-delimited blocks first.
        let mut blocks: Vec<(usize, usize)> = Vec::new(); // (start_1indexed, end_1indexed)
        let mut block_start: Option<usize> = None;
        for (idx, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                if let Some(s) = block_start.take() {
                    blocks.push((s + 1, idx));
                }
            } else if block_start.is_none() {
                block_start = Some(idx);
            }
        }
        if let Some(s) = block_start {
            blocks.push((s + 1, lines.len()));
        }

        // Coalesce adjacent blocks until each chunk is near target_size bytes.
        let mut manifest = Vec::new();
        let mut cur_start = None;
        let mut cur_end = 0;
        let mut cur_bytes = 0usize;

        let flush = |manifest: &mut Manifest, start: usize, end: usize, bytes: usize| {
            let slice = &lines[start - 1..end];
            manifest.push(Chunk {
                id: line_range_id(source, start, end),
                source: source.to_string(),
                span: ChunkSpan::Lines { start, end },
                char_count: bytes,
                preview: slice.first().map(|s| s.to_string()),
                language: None,
            });
        };

        for (start, end) in blocks {
            let block_bytes: usize = lines[start - 1..end].iter().map(|l| l.len() + 1).sum();
            if cur_start.is_none() {
                cur_start = Some(start);
            }
            cur_end = end;
            cur_bytes += block_bytes;
            if cur_bytes >= config.target_size {
                flush(&mut manifest, cur_start.unwrap(), cur_end, cur_bytes);
                cur_start = None;
                cur_bytes = 0;
            }
        }
        if let Some(s) = cur_start {
            flush(&mut manifest, s, cur_end, cur_bytes);
        }
        Ok(manifest)
    }
}

/// Chunks a whole repository's worth of scanned files in parallel using
/// `files_language`, one of the strategies whose unit of work (one
/// language group) is independent across groups.
#[must_use]
pub fn chunk_files_language_parallel(files: &[ScannedFile]) -> Vec<(String, usize)> {
    let mut groups: BTreeMap<String, Vec<&ScannedFile>> = BTreeMap::new();
    for file in files {
        groups
            .entry(file.language.unwrap_or("Unknown").to_string())
            .or_default()
            .push(file);
    }
    groups
        .into_par_iter()
        .map(|(name, files)| (name, files.len()))
        .collect()
}
