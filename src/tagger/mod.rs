//! Semantic tagger: topical tags for a transcript, via an optional
//! LLM-backed client with an always-available keyword fallback.
//!
//! Grounded on the teacher's `agent/prompt.rs` framing of a subordinate
//! call as a narrow, structured request — here scaled down to "give me
//! 5-10 tags for this text" instead of a full extraction pass.

use std::collections::HashSet;

use thiserror::Error as ThisError;

#[cfg(feature = "tagger-llm")]
pub mod llm_client;
#[cfg(feature = "tagger-llm")]
pub use llm_client::OpenAiTagger;

/// Failure calling an external tagger. Always recoverable by falling back
/// to [`KeywordTagger`]; never propagated to the caller.
#[derive(ThisError, Debug)]
#[error("tagger call failed: {0}")]
pub struct TaggerError(pub String);

/// Byte threshold above which a transcript is symmetrically truncated
/// before being sent to a tagger.
pub const TRUNCATE_THRESHOLD_BYTES: usize = 10 * 1024;

/// Requests topical tags for `transcript`.
pub trait TaggerClient {
    /// Returns 5-10 topical tags for `transcript`.
    ///
    /// # Errors
    /// Returns [`TaggerError`] if the call fails or is unavailable.
    fn tag(&self, transcript: &str) -> Result<Vec<String>, TaggerError>;
}

/// Truncates `text` to keep the head 60% and tail 40% when it exceeds
/// [`TRUNCATE_THRESHOLD_BYTES`], joined with an elision marker.
#[must_use]
pub fn truncate_symmetric(text: &str) -> String {
    if text.len() <= TRUNCATE_THRESHOLD_BYTES {
        return text.to_string();
    }
    let head_budget = (TRUNCATE_THRESHOLD_BYTES * 6) / 10;
    let tail_budget = TRUNCATE_THRESHOLD_BYTES - head_budget;

    let head_cut = crate::io::unicode::find_char_boundary(text, head_budget);
    let tail_start_byte = text.len().saturating_sub(tail_budget);
    let tail_cut = crate::io::unicode::find_char_boundary(text, tail_start_byte);

    format!("{}\n...[elided]...\n{}", &text[..head_cut], &text[tail_cut..])
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being", "to",
    "of", "in", "on", "for", "with", "as", "at", "by", "this", "that", "it", "from", "its", "into",
    "not", "no", "so", "if", "then", "than", "which", "who", "what", "when", "where", "how", "you",
    "your", "i", "we", "they", "he", "she",
];

const TECHNICAL_WHITELIST: &[&str] = &[
    "api", "cli", "db", "sql", "http", "json", "rust", "python", "auth", "bug", "fix", "test",
    "deploy", "config", "schema", "migration", "session", "memory", "chunk", "search", "index",
];

/// Always-succeeding fallback: top-K lowercase tokens after stop-word
/// removal, with technical terms given priority.
pub struct KeywordTagger {
    /// How many tags to return.
    pub top_k: usize,
}

impl Default for KeywordTagger {
    fn default() -> Self {
        Self { top_k: 8 }
    }
}

impl TaggerClient for KeywordTagger {
    fn tag(&self, transcript: &str) -> Result<Vec<String>, TaggerError> {
        let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for token in transcript.split(|c: char| !c.is_alphanumeric()) {
            let token = token.to_lowercase();
            if token.len() < 3 || STOPWORDS.contains(&token.as_str()) {
                continue;
            }
            *counts.entry(token).or_insert(0) += 1;
        }

        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|a, b| {
            let a_weight = usize::from(TECHNICAL_WHITELIST.contains(&a.0.as_str()));
            let b_weight = usize::from(TECHNICAL_WHITELIST.contains(&b.0.as_str()));
            (b_weight, b.1).cmp(&(a_weight, a.1)).then_with(|| a.0.cmp(&b.0))
        });

        Ok(ranked.into_iter().take(self.top_k).map(|(tag, _)| tag).collect())
    }
}

/// Base tags applied to every tagged transcript, independent of content.
#[must_use]
pub fn base_tags(project_name: &str, iso_date: &str, session_id: &str) -> Vec<String> {
    vec![
        "conversation".to_string(),
        "session".to_string(),
        project_name.to_lowercase(),
        iso_date.to_string(),
        format!("session:{session_id}"),
    ]
}

/// Tags `transcript`: tries `client`, falling back to [`KeywordTagger`] on
/// any error, then merges with [`base_tags`] (deduplicated, order-preserved).
#[must_use]
pub fn tag_transcript(
    client: &dyn TaggerClient,
    transcript: &str,
    project_name: &str,
    iso_date: &str,
    session_id: &str,
) -> Vec<String> {
    let truncated = truncate_symmetric(transcript);
    let topical = client.tag(&truncated).unwrap_or_else(|_| {
        KeywordTagger::default()
            .tag(&truncated)
            .unwrap_or_default()
    });

    let mut seen = HashSet::new();
    base_tags(project_name, iso_date, session_id)
        .into_iter()
        .chain(topical)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// A tagger client that always fails, used to test the fallback path.
#[cfg(test)]
struct FailingTagger;

#[cfg(test)]
impl TaggerClient for FailingTagger {
    fn tag(&self, _transcript: &str) -> Result<Vec<String>, TaggerError> {
        Err(TaggerError("unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_tagger_prefers_technical_terms() {
        let tagger = KeywordTagger { top_k: 3 };
        let tags = tagger
            .tag("the api returned json and the database schema migration failed the fix the fix")
            .unwrap();
        assert!(tags.contains(&"fix".to_string()) || tags.contains(&"schema".to_string()));
    }

    #[test]
    fn keyword_tagger_never_fails() {
        let tagger = KeywordTagger::default();
        assert!(tagger.tag("").unwrap().is_empty());
    }

    #[test]
    fn truncate_symmetric_preserves_short_text() {
        let text = "short transcript";
        assert_eq!(truncate_symmetric(text), text);
    }

    #[test]
    fn truncate_symmetric_keeps_head_and_tail() {
        let text = "A".repeat(20_000);
        let truncated = truncate_symmetric(&text);
        assert!(truncated.len() < text.len());
        assert!(truncated.contains("[elided]"));
    }

    #[test]
    fn tag_transcript_falls_back_on_client_error() {
        let tags = tag_transcript(&FailingTagger, "api auth fix deploy schema", "myproj", "2026-07-27", "abc123");
        assert!(tags.contains(&"conversation".to_string()));
        assert!(tags.contains(&"myproj".to_string()));
        assert!(tags.len() > 5);
    }

    #[test]
    fn tag_transcript_merges_without_duplicates() {
        let tagger = KeywordTagger::default();
        let tags = tag_transcript(&tagger, "session session session conversation", "p", "2026-01-01", "id1");
        let unique: HashSet<_> = tags.iter().collect();
        assert_eq!(unique.len(), tags.len());
    }
}
