//! The analysis-session store: per-query state persisted atomically across
//! many short-lived CLI invocations.
//!
//! Each operation is a separate OS process, so every write goes to a sibling
//! `.tmp` file followed by a rename, the way the teacher's `io::reader`
//! writers create parent directories before writing — here extended with
//! the rename step so a crash mid-write never leaves a torn `state.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunk::Manifest;
use crate::error::SessionError;

/// One entry in a session's append-only iteration log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Seconds since epoch.
    pub timestamp: f64,
    /// Result key written.
    pub key: String,
    /// Value written.
    pub value: String,
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting `result` writes.
    Active,
    /// Frozen; further `result` writes are a [`SessionError::AlreadyFinalized`].
    Finalized,
}

/// Persisted state for one analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Session id (12 hex chars).
    pub id: String,
    /// The original orchestrator query.
    pub query: String,
    /// The path the query targets.
    pub target: String,
    /// Creation time, seconds since epoch.
    pub created_at: f64,
    /// Append-only iteration log.
    pub iterations: Vec<IterationRecord>,
    /// Last-write-wins keyed results.
    pub results: std::collections::BTreeMap<String, String>,
    /// Final answer, set by `finalize`.
    pub answer: Option<String>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Last chunk manifest stored for this session, if any.
    pub manifest: Option<Manifest>,
}

/// Generates a 12-hex-character session id from a random UUID's bytes.
#[must_use]
pub fn new_session_id() -> String {
    let uuid = Uuid::new_v4();
    uuid.simple().to_string()[..12].to_string()
}

fn state_path(session_dir: &Path) -> PathBuf {
    session_dir.join("state.json")
}

fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Creates a new session rooted at `session_dir`, returning its state.
///
/// # Errors
/// Returns [`SessionError`] if the state file cannot be written.
pub fn init(
    session_dir: &Path,
    session_id: &str,
    query: &str,
    target: &str,
    now: f64,
) -> Result<SessionState, SessionError> {
    let state = SessionState {
        id: session_id.to_string(),
        query: query.to_string(),
        target: target.to_string(),
        created_at: now,
        iterations: Vec::new(),
        results: std::collections::BTreeMap::new(),
        answer: None,
        status: SessionStatus::Active,
        manifest: None,
    };
    save(session_dir, &state)?;
    Ok(state)
}

/// Loads the state for an existing session.
///
/// # Errors
/// Returns [`SessionError::NotFound`] if the session directory has no
/// readable state file, or [`SessionError::CorruptState`] if it can't be
/// parsed.
pub fn load(session_dir: &Path) -> Result<SessionState, SessionError> {
    let path = state_path(session_dir);
    let raw = fs::read_to_string(&path).map_err(|_| SessionError::NotFound {
        id: session_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })?;
    Ok(serde_json::from_str(&raw)?)
}

fn save(session_dir: &Path, state: &SessionState) -> Result<(), SessionError> {
    let json = serde_json::to_string_pretty(state)?;
    write_atomic(&state_path(session_dir), &json).map_err(|e| SessionError::CorruptState {
        reason: e.to_string(),
    })
}

/// Upserts `results[key] = value` and appends an iteration record.
///
/// # Errors
/// Returns [`SessionError::AlreadyFinalized`] if the session was finalized,
/// or propagates load/save errors.
pub fn result(
    session_dir: &Path,
    key: &str,
    value: &str,
    now: f64,
) -> Result<SessionState, SessionError> {
    let mut state = load(session_dir)?;
    if state.status == SessionStatus::Finalized {
        return Err(SessionError::AlreadyFinalized { id: state.id });
    }
    state.results.insert(key.to_string(), value.to_string());
    state.iterations.push(IterationRecord {
        timestamp: now,
        key: key.to_string(),
        value: value.to_string(),
    });
    save(session_dir, &state)?;
    Ok(state)
}

/// Persists `manifest` as the session's last chunk manifest.
///
/// # Errors
/// Propagates load/save errors.
pub fn store_manifest(session_dir: &Path, manifest: Manifest) -> Result<SessionState, SessionError> {
    let mut state = load(session_dir)?;
    state.manifest = Some(manifest);
    save(session_dir, &state)?;
    Ok(state)
}

/// Freezes the session, recording an optional final answer.
///
/// # Errors
/// Propagates load/save errors.
pub fn finalize(
    session_dir: &Path,
    answer: Option<String>,
) -> Result<SessionState, SessionError> {
    let mut state = load(session_dir)?;
    state.status = SessionStatus::Finalized;
    state.answer = answer;
    save(session_dir, &state)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_twelve_hex_chars() {
        let id = new_session_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn init_then_load_round_trips() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let id = new_session_id();
        let dir = tmp.path().join(&id);
        init(&dir, &id, "why is it slow", "/repo", 1000.0).expect("init");
        let loaded = load(&dir).expect("load");
        assert_eq!(loaded.query, "why is it slow");
        assert_eq!(loaded.status, SessionStatus::Active);
    }

    #[test]
    fn result_appends_iteration_log_and_upserts() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let id = new_session_id();
        let dir = tmp.path().join(&id);
        init(&dir, &id, "q", "/t", 1000.0).expect("init");
        result(&dir, "k1", "v1", 1001.0).expect("result");
        let state = result(&dir, "k2", "v2", 1002.0).expect("result");
        assert_eq!(state.results.len(), 2);
        assert_eq!(state.iterations.len(), 2);
    }

    #[test]
    fn finalize_then_result_is_conflict() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let id = new_session_id();
        let dir = tmp.path().join(&id);
        init(&dir, &id, "q", "/t", 1000.0).expect("init");
        finalize(&dir, Some("done".to_string())).expect("finalize");
        let err = result(&dir, "k3", "v3", 1003.0).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyFinalized { .. }));
    }

    #[test]
    fn load_unknown_session_is_not_found() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = load(&tmp.path().join("does-not-exist")).unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }
}
