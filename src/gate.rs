//! The bounded-output gate.
//!
//! Every public textual result the orchestrator may see is routed through
//! [`gate`]. Subagent-destined content (the actual bytes of an extracted
//! chunk handed to a subordinate agent) must never pass through this
//! function — it is the one place the 4 KB cap is enforced.

use crate::io::unicode::find_char_boundary;

/// Hard cap, in bytes, on any orchestrator-facing result.
pub const MAX_OUTPUT_BYTES: usize = 4000;

/// Truncates `text` to [`MAX_OUTPUT_BYTES`] at a valid char boundary and
/// appends a one-line notice naming `operation` when truncation occurred.
#[must_use]
pub fn gate(operation: &str, text: &str) -> String {
    if text.len() <= MAX_OUTPUT_BYTES {
        return text.to_string();
    }

    let notice = format!(
        "\n[... truncated: `{operation}` output exceeds {MAX_OUTPUT_BYTES} bytes. \
         Narrow the request (line range, chunk id, or grep pattern) to see more.]"
    );
    let budget = MAX_OUTPUT_BYTES.saturating_sub(notice.len());
    let cut = find_char_boundary(text, budget);
    let mut out = String::with_capacity(cut + notice.len());
    out.push_str(&text[..cut]);
    out.push_str(&notice);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_passes_through_unchanged() {
        let text = "hello world";
        assert_eq!(gate("status", text), text);
    }

    #[test]
    fn long_text_is_truncated_with_notice() {
        let text = "x".repeat(10_000);
        let out = gate("status", &text);
        assert!(out.len() <= MAX_OUTPUT_BYTES);
        assert!(out.contains("truncated"));
        assert!(out.contains("status"));
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let text = "é".repeat(3000); // 2 bytes each, 6000 bytes total
        let out = gate("recall", &text);
        assert!(std::str::from_utf8(out.as_bytes()).is_ok());
        assert!(out.len() <= MAX_OUTPUT_BYTES);
    }

    #[test]
    fn boundary_exactly_at_cap_is_not_truncated() {
        let text = "a".repeat(MAX_OUTPUT_BYTES);
        assert_eq!(gate("status", &text), text);
    }
}
