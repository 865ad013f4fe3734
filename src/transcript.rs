//! Transcript export: turns a line-delimited session log into a compact
//! plain-text transcript.
//!
//! Grounded on [`crate::session`]'s JSON-lines discipline: each record is
//! parsed independently, and a malformed line degrades the export instead
//! of failing it outright.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::TranscriptError;

/// One line of export diagnostics (a skipped record).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// 1-indexed line number in the raw log.
    pub line: usize,
    /// Why the line was skipped.
    pub reason: String,
}

/// Result of exporting a transcript.
#[derive(Debug, Clone)]
pub struct Export {
    /// The plain-text transcript.
    pub text: String,
    /// Records skipped along the way.
    pub diagnostics: Vec<Diagnostic>,
    /// `raw_bytes / text.len()`, rounded down; 0 if `text` is empty.
    pub compression_ratio: u64,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    role: Option<String>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    stream_id: Option<String>,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
    #[serde(rename = "type")]
    #[serde(default)]
    kind: Option<String>,
}

fn content_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn shorten_argument(value: &Value) -> String {
    let text = content_text(value);
    if text.chars().count() <= 60 {
        text
    } else {
        let cut: String = text.chars().take(57).collect();
        format!("{cut}...")
    }
}

fn is_system_reminder(record: &RawRecord) -> bool {
    record.role.as_deref() == Some("system")
        || record.kind.as_deref() == Some("system_reminder")
        || record.kind.as_deref() == Some("hook_announcement")
}

/// Exports `raw_log` (one JSON object per line) into a plain-text
/// transcript: user/assistant messages preserved in order, streamed
/// assistant tokens with the same `stream_id` collapsed into one message,
/// tool calls reduced to a one-line summary, tool results dropped, and
/// system reminders/hook announcements stripped entirely.
#[must_use]
pub fn export(raw_log: &str) -> Export {
    let mut lines_out: Vec<String> = Vec::new();
    let mut diagnostics = Vec::new();
    let mut pending_stream: Option<(String, String)> = None;

    let flush_stream = |pending: &mut Option<(String, String)>, lines_out: &mut Vec<String>| {
        if let Some((_, text)) = pending.take() {
            lines_out.push(format!("assistant: {text}"));
        }
    };

    for (idx, raw_line) in raw_log.lines().enumerate() {
        let line_no = idx + 1;
        if raw_line.trim().is_empty() {
            continue;
        }

        let parsed: Result<RawRecord, _> = serde_json::from_str(raw_line);
        let record = match parsed {
            Ok(r) => r,
            Err(e) => {
                diagnostics.push(Diagnostic {
                    line: line_no,
                    reason: format!("invalid JSON: {e}"),
                });
                continue;
            }
        };

        let Some(role) = record.role.clone() else {
            diagnostics.push(Diagnostic {
                line: line_no,
                reason: "missing recognizable role".to_string(),
            });
            continue;
        };

        if is_system_reminder(&record) {
            continue;
        }

        match role.as_str() {
            "tool" => {
                flush_stream(&mut pending_stream, &mut lines_out);
                let name = record.tool.as_deref().unwrap_or("unknown");
                let arg = record
                    .arguments
                    .as_ref()
                    .map(shorten_argument)
                    .unwrap_or_default();
                lines_out.push(format!("[tool: {name}] {arg}"));
            }
            "user" => {
                flush_stream(&mut pending_stream, &mut lines_out);
                let text = record.content.as_ref().map(content_text).unwrap_or_default();
                lines_out.push(format!("user: {text}"));
            }
            "assistant" => {
                let text = record.content.as_ref().map(content_text).unwrap_or_default();
                match (&record.stream_id, &mut pending_stream) {
                    (Some(id), Some((pending_id, buf))) if id == pending_id => {
                        buf.push_str(&text);
                    }
                    (Some(id), _) => {
                        flush_stream(&mut pending_stream, &mut lines_out);
                        pending_stream = Some((id.clone(), text));
                    }
                    (None, _) => {
                        flush_stream(&mut pending_stream, &mut lines_out);
                        lines_out.push(format!("assistant: {text}"));
                    }
                }
            }
            "system" | "tool_result" => {
                flush_stream(&mut pending_stream, &mut lines_out);
                // system (non-reminder) and tool_result records are
                // recognized but intentionally dropped, not malformed.
            }
            other => {
                diagnostics.push(Diagnostic {
                    line: line_no,
                    reason: format!("unrecognized role: {other}"),
                });
            }
        }
    }
    flush_stream(&mut pending_stream, &mut lines_out);

    let text = lines_out.join("\n");
    let compression_ratio = if text.is_empty() {
        0
    } else {
        (raw_log.len() / text.len().max(1)) as u64
    };

    Export {
        text,
        diagnostics,
        compression_ratio,
    }
}

/// Reads `log_path` and exports it.
///
/// # Errors
/// Returns [`TranscriptError::LogNotFound`] if `log_path` cannot be read.
pub fn export_file(log_path: &Path) -> Result<Export, TranscriptError> {
    let raw = std::fs::read_to_string(log_path).map_err(|_| TranscriptError::LogNotFound {
        path: log_path.display().to_string(),
    })?;
    Ok(export(&raw))
}

/// Applies the bounded-output gate for orchestrator-facing export summaries.
/// The transcript body itself is written to a file, not returned inline.
#[must_use]
pub fn export_summary_for_orchestrator(export: &Export) -> String {
    let summary = format!(
        "exported {} lines, {} bytes ({}x compression), {} diagnostics",
        export.text.lines().count(),
        export.text.len(),
        export.compression_ratio,
        export.diagnostics.len()
    );
    crate::gate::gate("export-session", &summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_user_and_assistant_in_order() {
        let log = r#"{"role":"user","content":"hello"}
{"role":"assistant","content":"hi there"}"#;
        let export = export(log);
        assert_eq!(export.text, "user: hello\nassistant: hi there");
        assert!(export.diagnostics.is_empty());
    }

    #[test]
    fn collapses_streamed_assistant_tokens() {
        let log = r#"{"role":"assistant","content":"Hel","stream_id":"s1"}
{"role":"assistant","content":"lo","stream_id":"s1"}
{"role":"assistant","content":"!","stream_id":"s1"}"#;
        let export = export(log);
        assert_eq!(export.text, "assistant: Hello!");
    }

    #[test]
    fn summarizes_tool_calls_and_drops_results() {
        let log = r#"{"role":"tool","tool":"grep","arguments":"PASSWORD"}
{"role":"tool_result","content":"line 42: PASSWORD=secret"}"#;
        let export = export(log);
        assert_eq!(export.text, "[tool: grep] PASSWORD");
    }

    #[test]
    fn strips_system_reminders() {
        let log = r#"{"role":"system","type":"system_reminder","content":"ignore this"}
{"role":"user","content":"hi"}"#;
        let export = export(log);
        assert_eq!(export.text, "user: hi");
    }

    #[test]
    fn malformed_line_is_skipped_with_diagnostic_not_fatal() {
        let log = "not json at all\n{\"role\":\"user\",\"content\":\"ok\"}";
        let export = export(log);
        assert_eq!(export.text, "user: ok");
        assert_eq!(export.diagnostics.len(), 1);
        assert_eq!(export.diagnostics[0].line, 1);
    }

    #[test]
    fn missing_role_is_skipped_with_diagnostic() {
        let log = r#"{"content":"no role here"}"#;
        let export = export(log);
        assert!(export.text.is_empty());
        assert_eq!(export.diagnostics.len(), 1);
    }

    #[test]
    fn export_file_on_missing_path_is_log_not_found() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = export_file(&tmp.path().join("missing.jsonl")).unwrap_err();
        assert!(matches!(err, TranscriptError::LogNotFound { .. }));
    }
}
