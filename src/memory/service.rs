//! Memory service: the higher-level contract atop [`super::db::MemoryDb`].

use std::collections::HashSet;

use uuid::Uuid;

use crate::chunk::Manifest;
use crate::error::MemoryError;
use crate::extract;

use super::db::{Entry, EntryMeta, MemoryDb, SearchHit};

/// Size hint derived from `char_count`, mandatory on every recall hit so the
/// orchestrator can pick direct-read vs. grep pre-filter vs. recursive
/// analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// Fewer than 2048 chars.
    Small,
    /// Fewer than 10240 chars.
    Medium,
    /// Fewer than 51200 chars.
    Large,
    /// 51200 chars or more.
    Huge,
}

impl SizeClass {
    /// Classifies `char_count` into a [`SizeClass`].
    #[must_use]
    pub const fn classify(char_count: usize) -> Self {
        if char_count < 2048 {
            Self::Small
        } else if char_count < 10_240 {
            Self::Medium
        } else if char_count < 51_200 {
            Self::Large
        } else {
            Self::Huge
        }
    }

    /// Lowercase label used in formatted output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Huge => "huge",
        }
    }
}

/// A recall hit with its size hint attached.
#[derive(Debug, Clone)]
pub struct RecallHit {
    /// Entry metadata and rank.
    pub hit: SearchHit,
    /// Size classification of the entry's content.
    pub size: SizeClass,
}

/// Generates a memory entry id: `m_` + 12 hex chars from a random UUID.
#[must_use]
pub fn new_entry_id() -> String {
    let uuid = Uuid::new_v4();
    format!("m_{}", &uuid.simple().to_string()[..12])
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being", "to",
    "of", "in", "on", "for", "with", "as", "at", "by", "this", "that", "it", "from", "its", "into",
    "not", "no", "so", "if", "then", "than", "which", "who", "what", "when", "where", "how",
];

fn derive_tags(content: &str) -> Vec<String> {
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for token in content.split(|c: char| !c.is_alphanumeric()) {
        let token = token.to_lowercase();
        if token.len() < 3 || STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        *counts.entry(token).or_insert(0) += 1;
    }
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(6).map(|(tag, _)| tag).collect::<Vec<_>>()
}

fn derive_summary(content: &str) -> String {
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    if first_line.chars().count() <= 80 {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(77).collect();
        format!("{cut}...")
    }
}

/// Stores new content, generating tags and a summary when not supplied.
///
/// # Errors
/// Returns [`MemoryError`] on a database error.
pub fn remember(
    db: &MemoryDb,
    content: &str,
    tags: Option<Vec<String>>,
    summary: Option<String>,
    source: &str,
    source_name: Option<String>,
    now: f64,
) -> Result<String, MemoryError> {
    let tags = tags.unwrap_or_else(|| derive_tags(content));
    let mut seen = HashSet::new();
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.to_lowercase())
        .filter(|t| seen.insert(t.clone()))
        .collect();
    let summary = summary.unwrap_or_else(|| derive_summary(content));

    let id = new_entry_id();
    db.insert(&Entry {
        id: id.clone(),
        summary,
        tags,
        timestamp: now,
        source: source.to_string(),
        source_name,
        char_count: content.chars().count(),
        content: content.to_string(),
    })?;
    Ok(id)
}

/// Searches the memory store, classifying each hit's size so the caller can
/// decide how to follow up.
///
/// # Errors
/// Returns [`MemoryError`] on a database error.
pub fn recall(db: &MemoryDb, query: &str, tags: &[String], max: usize) -> Result<Vec<RecallHit>, MemoryError> {
    let hits = db.search(query, tags, max)?;
    Ok(hits
        .into_iter()
        .map(|hit| {
            let size = SizeClass::classify(hit.meta.char_count);
            RecallHit { hit, size }
        })
        .collect())
}

/// Formats recall hits as bounded text for the orchestrator.
#[must_use]
pub fn recall_for_orchestrator(hits: &[RecallHit]) -> String {
    let mut lines = Vec::new();
    for r in hits {
        lines.push(format!(
            "{} [{}] {} (tags: {})",
            r.hit.meta.id,
            r.size.label(),
            r.hit.meta.summary,
            r.hit.meta.tags.join(", ")
        ));
    }
    crate::gate::gate("recall", &lines.join("\n"))
}

/// Extracted content from a memory entry, for a subordinate agent — not
/// gated, since gating is the caller's responsibility when forwarding to
/// the orchestrator instead.
pub enum MemoryExtraction {
    /// The entry's full content.
    Full(String),
    /// Grep hunks over the entry's content.
    Grep(Vec<extract::GrepHunk>),
    /// A chunk's text, looked up via a previously-saved manifest.
    Chunk(String),
}

/// Retrieves content from entry `id` in one of three modes: whole content,
/// grep-with-context, or chunk-id lookup against `manifest`.
///
/// # Errors
/// Returns [`MemoryError::EntryNotFound`] if `id` is absent, or propagates
/// extractor errors wrapped as [`MemoryError::Database`].
pub fn memory_extract(
    db: &MemoryDb,
    id: &str,
    grep: Option<&str>,
    context: usize,
    chunk_id: Option<&str>,
    manifest: Option<&Manifest>,
) -> Result<MemoryExtraction, MemoryError> {
    let entry = db.get(id)?;

    if let Some(pattern) = grep {
        let hunks = grep_content(&entry.content, pattern, context)
            .map_err(|e| MemoryError::Database(e.to_string()))?;
        return Ok(MemoryExtraction::Grep(hunks));
    }

    if let Some(cid) = chunk_id {
        let manifest = manifest.ok_or_else(|| MemoryError::Database("no manifest supplied".to_string()))?;
        let chunk = manifest
            .iter()
            .find(|c| c.id == cid)
            .ok_or_else(|| MemoryError::Database(format!("chunk {cid} not in manifest")))?;
        let text = slice_content_for_chunk(&entry.content, chunk);
        return Ok(MemoryExtraction::Chunk(text));
    }

    Ok(MemoryExtraction::Full(entry.content))
}

fn slice_content_for_chunk(content: &str, chunk: &crate::chunk::Chunk) -> String {
    match &chunk.span {
        crate::chunk::ChunkSpan::Lines { start, end } => {
            let lines: Vec<&str> = content.lines().collect();
            if lines.is_empty() {
                return String::new();
            }
            let start = (*start).max(1).min(lines.len());
            let end = (*end).max(start).min(lines.len());
            lines[start - 1..end].join("\n")
        }
        crate::chunk::ChunkSpan::Files { .. } => content.to_string(),
    }
}

fn grep_content(content: &str, pattern: &str, context: usize) -> Result<Vec<extract::GrepHunk>, regex::Error> {
    let re = regex::Regex::new(pattern)?;
    let lines: Vec<&str> = content.lines().collect();
    let mut match_lines = Vec::new();
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
        hunks.push(extract::GrepHunk {
            start_line: start + 1,
            end_line: end + 1,
            text,
        });
    }
    Ok(hunks)
}

/// Deletes entry `id`. No-op if absent.
///
/// # Errors
/// Returns [`MemoryError`] on a database error.
pub fn forget(db: &MemoryDb, id: &str) -> Result<(), MemoryError> {
    db.delete(id)
}

/// Lists entries, newest first.
///
/// # Errors
/// Returns [`MemoryError`] on a database error.
pub fn list(db: &MemoryDb, tags: &[String], offset: usize, limit: usize) -> Result<Vec<EntryMeta>, MemoryError> {
    db.list(tags, offset, limit)
}

/// Default window, in seconds, within which a matching session-tagged
/// content hash is treated as a duplicate rather than a replacement.
pub const DEDUP_WINDOW_SECONDS: f64 = 60.0;

/// Deduplicates a would-be entry against the most recent entry tagged with
/// `session_id`: identical content hash within [`DEDUP_WINDOW_SECONDS`] is a
/// no-op; a matching session tag with different content replaces the older
/// entry (the transcript grew).
///
/// # Errors
/// Returns [`MemoryError`] on a database error.
pub fn deduplicate(
    db: &MemoryDb,
    session_id: &str,
    content: &str,
    source: &str,
    now: f64,
) -> Result<Option<String>, MemoryError> {
    let content_hash = crate::chunk::hash::stable_hash(content);
    let session_tag = format!("session:{session_id}");
    let candidates = db.list(&[session_tag.clone()], 0, 1)?;

    let Some(existing) = candidates.into_iter().next() else {
        return remember(
            db,
            content,
            Some(vec![session_tag]),
            None,
            source,
            Some(session_id.to_string()),
            now,
        )
        .map(Some);
    };

    let existing_full = db.get(&existing.id)?;
    let existing_hash = crate::chunk::hash::stable_hash(&existing_full.content);
    let age = now - existing.timestamp;

    if existing_hash == content_hash && age < DEDUP_WINDOW_SECONDS {
        return Ok(None);
    }

    db.delete(&existing.id)?;
    remember(
        db,
        content,
        Some(vec![session_tag]),
        Some(existing_full.summary),
        source,
        Some(session_id.to_string()),
        now,
    )
    .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_without_tags_derives_them() {
        let db = MemoryDb::in_memory().expect("open");
        let id = remember(
            &db,
            "Deploying the migration runner requires a staging pass first.",
            None,
            None,
            "text",
            None,
            1.0,
        )
        .expect("remember");
        let entry = db.get(&id).expect("get");
        assert!(!entry.tags.is_empty());
        assert!(entry.summary.contains("Deploying"));
    }

    #[test]
    fn remember_id_has_expected_shape() {
        let db = MemoryDb::in_memory().expect("open");
        let id = remember(&db, "content", Some(vec!["x".into()]), Some("s".into()), "text", None, 1.0).unwrap();
        assert!(id.starts_with("m_"));
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn recall_classifies_size() {
        let db = MemoryDb::in_memory().expect("open");
        remember(&db, &"x".repeat(100), Some(vec!["t".into()]), Some("s".into()), "text", None, 1.0).unwrap();
        let hits = recall(&db, "x", &[], 20).expect("recall");
        assert_eq!(hits[0].size, SizeClass::Small);
    }

    #[test]
    fn memory_extract_grep_finds_pattern() {
        let db = MemoryDb::in_memory().expect("open");
        let id = remember(&db, "alpha\nPASSWORD=x\nbeta", Some(vec!["t".into()]), Some("s".into()), "text", None, 1.0).unwrap();
        let result = memory_extract(&db, &id, Some("PASSWORD"), 0, None, None).expect("extract");
        match result {
            MemoryExtraction::Grep(hunks) => assert_eq!(hunks.len(), 1),
            _ => panic!("expected grep variant"),
        }
    }

    #[test]
    fn deduplicate_is_noop_within_window_for_identical_content() {
        let db = MemoryDb::in_memory().expect("open");
        let first = deduplicate(&db, "sess1", "same transcript", "transcript", 1.0).unwrap();
        assert!(first.is_some());
        let second = deduplicate(&db, "sess1", "same transcript", "transcript", 30.0).unwrap();
        assert!(second.is_none());
        assert_eq!(db.list(&[], 0, 10).unwrap().len(), 1);
    }

    #[test]
    fn deduplicate_replaces_when_content_grew() {
        let db = MemoryDb::in_memory().expect("open");
        deduplicate(&db, "sess1", "short", "transcript", 1.0).unwrap();
        deduplicate(&db, "sess1", "short and now longer", "transcript", 30.0).unwrap();
        let all = db.list(&[], 0, 10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].char_count, "short and now longer".chars().count());
    }

    #[test]
    fn deduplicate_replaces_after_window_even_if_identical() {
        let db = MemoryDb::in_memory().expect("open");
        deduplicate(&db, "sess1", "same", "transcript", 1.0).unwrap();
        let result = deduplicate(&db, "sess1", "same", "transcript", 1000.0).unwrap();
        assert!(result.is_some());
        assert_eq!(db.list(&[], 0, 10).unwrap().len(), 1);
    }

    #[test]
    fn forget_then_get_is_not_found() {
        let db = MemoryDb::in_memory().expect("open");
        let id = remember(&db, "content", Some(vec!["t".into()]), Some("s".into()), "text", None, 1.0).unwrap();
        forget(&db, &id).unwrap();
        assert!(matches!(db.get(&id).unwrap_err(), MemoryError::EntryNotFound { .. }));
    }
}
