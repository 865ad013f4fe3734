//! Output formatting for CLI commands.
//!
//! Supports text, JSON, and NDJSON output formats. Formatting never bypasses
//! the bounded-output gate — callers pass already-gated text in; this
//! module only shapes it.

use std::fmt::Write;

use serde::Serialize;
use serde_json::json;

use crate::chunk::Manifest;
use crate::memory::service::RecallHit;
use crate::memory::EntryMeta;
use crate::scan::ScanResult;
use crate::session::SessionState;
use crate::strategy_store::PerfRecord;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
    /// Newline-delimited JSON (NDJSON) for streaming.
    /// Each record is a single JSON object on its own line.
    Ndjson,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" | "stream" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Returns true if this format is a streaming format.
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::Ndjson)
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats a scan result.
#[must_use]
pub fn format_scan(scan: &ScanResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "Scanned {} files, {} bytes, {} lines", scan.file_count(), scan.total_bytes, scan.total_lines);
            if !scan.errors.is_empty() {
                let _ = writeln!(out, "  {} unreadable paths (see --format json for detail)", scan.errors.len());
            }
            for (lang, count) in scan.by_language() {
                let _ = writeln!(out, "  {lang}: {count}");
            }
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(scan),
    }
}

/// Formats recall hits.
#[must_use]
pub fn format_recall(hits: &[RecallHit], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => crate::memory::recall_for_orchestrator(hits),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let rows: Vec<_> = hits
                .iter()
                .map(|h| {
                    json!({
                        "id": h.hit.meta.id,
                        "summary": h.hit.meta.summary,
                        "tags": h.hit.meta.tags,
                        "size": h.size.label(),
                        "rank": h.hit.rank,
                    })
                })
                .collect();
            format_json(&rows)
        }
    }
}

/// Formats a memory-entry listing.
#[must_use]
pub fn format_memory_list(entries: &[EntryMeta], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for e in entries {
                let _ = writeln!(out, "{} [{}] {}", e.id, e.tags.join(","), e.summary);
            }
            crate::gate::gate("memory-list", &out)
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(entries),
    }
}

/// Formats a tag histogram.
#[must_use]
pub fn format_tag_histogram(histogram: &[(String, usize)], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for (tag, count) in histogram {
                let _ = writeln!(out, "{tag}: {count}");
            }
            crate::gate::gate("memory-tags", &out)
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(histogram),
    }
}

/// Formats a chunk manifest.
#[must_use]
pub fn format_manifest(manifest: &Manifest, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for c in manifest {
                let _ = writeln!(out, "{} {} ({} chars)", c.id, c.source, c.char_count);
            }
            crate::gate::gate("chunk", &out)
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(manifest),
    }
}

/// Formats an analysis-session state.
#[must_use]
pub fn format_session(state: &SessionState, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "session {}", state.id);
            let _ = writeln!(out, "  query: {}", state.query);
            let _ = writeln!(out, "  status: {:?}", state.status);
            let _ = writeln!(out, "  results: {}", state.results.len());
            if let Some(answer) = &state.answer {
                let _ = writeln!(out, "  answer: {answer}");
            }
            crate::gate::gate("status", &out)
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(state),
    }
}

/// Formats performance-log records.
#[must_use]
pub fn format_perf_log(records: &[PerfRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => crate::strategy_store::log_for_orchestrator(records),
        OutputFormat::Json | OutputFormat::Ndjson => format_json(records),
    }
}

/// Formats an error for output.
///
/// When format is JSON, returns a structured error object.
/// When format is Text, returns the error message string.
#[must_use]
pub fn format_error(error: &crate::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = json!({
                "success": false,
                "error": {
                    "kind": format!("{:?}", error.kind()),
                    "message": error.to_string(),
                }
            });
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_all_three_formats() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("ndjson"), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::parse("anything-else"), OutputFormat::Text);
    }

    #[test]
    fn format_error_text_is_the_display_message() {
        let err = crate::Error::InvalidState {
            message: "bad state".to_string(),
        };
        assert_eq!(format_error(&err, OutputFormat::Text), err.to_string());
    }

    #[test]
    fn format_error_json_includes_kind() {
        let err = crate::Error::InvalidState {
            message: "bad state".to_string(),
        };
        let out = format_error(&err, OutputFormat::Json);
        assert!(out.contains("\"kind\""));
    }
}
