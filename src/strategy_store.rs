//! The strategy store: a free-text learned-patterns document plus an
//! append-only performance log, read/written directly as files — no
//! database involved, per SPEC_FULL.md §4.9.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// One recorded recall-session performance entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfRecord {
    /// Seconds since epoch.
    pub timestamp: f64,
    /// The original query.
    pub query: String,
    /// Search terms actually used.
    pub search_terms: Vec<String>,
    /// Entries the search surfaced.
    pub entries_found: usize,
    /// Of those, how many were actually relevant.
    pub entries_relevant: usize,
    /// How many subagents the orchestrator dispatched.
    pub subagents: usize,
    /// Free-text notes.
    pub notes: String,
}

/// Returns the learned-patterns document verbatim, bounded-output-gated.
///
/// # Errors
/// Returns [`StrategyError::Io`] if the file exists but
/// cannot be read. A missing document is not an error — an empty string
/// (no patterns learned yet) is returned instead.
pub fn show(patterns_path: &Path) -> Result<String, StrategyError> {
    let content = match fs::read_to_string(patterns_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(StrategyError::Io(e.to_string())),
    };
    Ok(crate::gate::gate("strategy show", &content))
}

/// Returns the last `n` performance records, newest first, bounded-output
/// gated once formatted.
///
/// # Errors
/// Returns [`StrategyError::Io`] if the log exists but contains unreadable bytes.
pub fn log(perf_log_path: &Path, n: usize) -> Result<Vec<PerfRecord>, StrategyError> {
    let content = match fs::read_to_string(perf_log_path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StrategyError::Io(e.to_string())),
    };

    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(record) = serde_json::from_str::<PerfRecord>(line) {
            records.push(record);
        }
    }
    records.reverse();
    records.truncate(n);
    Ok(records)
}

/// Formats the last `n` performance records as bounded text.
#[must_use]
pub fn log_for_orchestrator(records: &[PerfRecord]) -> String {
    let mut lines = Vec::new();
    for r in records {
        lines.push(format!(
            "{:.0} | {} | found={} relevant={} subagents={} | {}",
            r.timestamp, r.query, r.entries_found, r.entries_relevant, r.subagents, r.notes
        ));
    }
    crate::gate::gate("strategy log", &lines.join("\n"))
}

/// Appends a performance record to the log.
///
/// # Errors
/// Returns [`StrategyError::Io`] if the record cannot be
/// serialized or the log cannot be written.
pub fn perf(perf_log_path: &Path, record: &PerfRecord) -> Result<(), StrategyError> {
    if let Some(parent) = perf_log_path.parent() {
        fs::create_dir_all(parent).map_err(|e| StrategyError::Io(e.to_string()))?;
    }
    let line = serde_json::to_string(record).map_err(|e| StrategyError::Io(e.to_string()))?;
    use std::io::Write;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(perf_log_path)
        .map_err(|e| StrategyError::Io(e.to_string()))?;
    writeln!(file, "{line}").map_err(|e| StrategyError::Io(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_on_missing_document_is_empty_not_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("learned_patterns.md");
        let content = show(&path).expect("show");
        assert!(content.is_empty());
    }

    #[test]
    fn show_returns_document_contents() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("learned_patterns.md");
        fs::write(&path, "# Patterns\n\nPrefer grep before full reads.").unwrap();
        let content = show(&path).expect("show");
        assert!(content.contains("Prefer grep"));
    }

    fn record(ts: f64, query: &str) -> PerfRecord {
        PerfRecord {
            timestamp: ts,
            query: query.to_string(),
            search_terms: vec!["x".to_string()],
            entries_found: 5,
            entries_relevant: 2,
            subagents: 1,
            notes: "note".to_string(),
        }
    }

    #[test]
    fn perf_appends_and_log_reads_newest_first() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("performance.jsonl");
        perf(&path, &record(1.0, "first")).expect("perf");
        perf(&path, &record(2.0, "second")).expect("perf");
        let records = log(&path, 10).expect("log");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query, "second");
    }

    #[test]
    fn log_respects_n_limit() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("performance.jsonl");
        for i in 0..5 {
            perf(&path, &record(f64::from(i), &format!("q{i}"))).expect("perf");
        }
        let records = log(&path, 2).expect("log");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query, "q4");
    }

    #[test]
    fn log_on_missing_file_is_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("performance.jsonl");
        let records = log(&path, 10).expect("log");
        assert!(records.is_empty());
    }
}
