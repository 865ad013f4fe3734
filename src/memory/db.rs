//! The memory database: a `SQLite`-backed store with a BM25 full-text
//! index, grounded on the teacher's `storage/sqlite.rs` connection/pragma
//! setup.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

use super::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
};

/// A persisted memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque id: `m_` + 12 hex chars.
    pub id: String,
    /// Short human summary.
    pub summary: String,
    /// Lowercase tags, insertion-order deduplicated.
    pub tags: Vec<String>,
    /// Seconds since epoch.
    pub timestamp: f64,
    /// Origin descriptor (`text`, `file`, …).
    pub source: String,
    /// Optional origin name (e.g. a file path or session id).
    pub source_name: Option<String>,
    /// `content.chars().count()`.
    pub char_count: usize,
    /// Full entry content.
    pub content: String,
}

/// Metadata-only view of an entry, returned by search/list (no content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Entry id.
    pub id: String,
    /// Short human summary.
    pub summary: String,
    /// Lowercase tags.
    pub tags: Vec<String>,
    /// Seconds since epoch.
    pub timestamp: f64,
    /// `content.chars().count()`.
    pub char_count: usize,
}

/// A search hit: metadata plus the raw FTS5 rank (ascending, lower is better).
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched entry's metadata.
    pub meta: EntryMeta,
    /// Raw FTS5 `bm25()` rank; lower is a better match.
    pub rank: f64,
}

/// `SQLite`-backed memory store.
pub struct MemoryDb {
    conn: Connection,
    path: Option<PathBuf>,
}

impl MemoryDb {
    /// Opens or creates the database at `path`, running migrations and the
    /// legacy-JSON import if needed.
    ///
    /// # Errors
    /// Returns [`MemoryError`] if the database cannot be opened or migrated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MemoryError::Database(e.to_string()))?;
        }

        let conn = Connection::open(&path)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        let _: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        conn.busy_timeout(std::time::Duration::from_millis(5000))?;

        let db = Self {
            conn,
            path: Some(path),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Opens an in-memory database, useful for tests.
    ///
    /// # Errors
    /// Returns [`MemoryError`] if the database cannot be created.
    pub fn in_memory() -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    /// The on-disk path, or `None` for an in-memory database.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<(), MemoryError> {
        let is_init: i64 = self.conn.query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))?;
        if is_init == 0 {
            self.conn
                .execute_batch(SCHEMA_SQL)
                .map_err(|e| MemoryError::Migration(e.to_string()))?;
            self.conn.execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])?;
        } else {
            let current: Option<String> = self
                .conn
                .query_row(GET_VERSION_SQL, [], |row| row.get(0))
                .optional()?;
            let current: u32 = current.and_then(|v| v.parse().ok()).unwrap_or(0);
            if current < CURRENT_SCHEMA_VERSION {
                for migration in super::schema::get_migrations_from(current) {
                    self.conn
                        .execute_batch(migration.sql)
                        .map_err(|e| MemoryError::Migration(e.to_string()))?;
                }
                self.conn
                    .execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])?;
            }
        }
        self.import_legacy_json_if_present()
    }

    /// Imports the sibling `memory.json`/`memory.json.imported` pair next to
    /// this database's own file, if any legacy JSON is still there. No-op
    /// for in-memory databases. Safe to call on every open: once imported,
    /// the source file is renamed away, so later calls see nothing to do.
    fn import_legacy_json_if_present(&self) -> Result<(), MemoryError> {
        let Some(path) = &self.path else { return Ok(()) };
        let Some(parent) = path.parent() else { return Ok(()) };
        let legacy_json = parent.join("memory.json");
        let imported_marker = parent.join("memory.json.imported");
        self.import_legacy_json(&legacy_json, &imported_marker)?;
        Ok(())
    }

    /// Imports a legacy JSON array-of-entries file once. Renames it to
    /// `<path>.imported` on success so re-runs never re-import.
    ///
    /// # Errors
    /// Returns [`MemoryError`] if the JSON cannot be parsed or an entry
    /// cannot be inserted (conflicts are skipped, not fatal, since a prior
    /// partial import may have already inserted some rows).
    pub fn import_legacy_json(&self, json_path: &Path, imported_path: &Path) -> Result<usize, MemoryError> {
        if !json_path.exists() {
            return Ok(0);
        }
        let raw = std::fs::read_to_string(json_path).map_err(|e| MemoryError::Database(e.to_string()))?;
        let entries: Vec<Entry> =
            serde_json::from_str(&raw).map_err(|e| MemoryError::Migration(e.to_string()))?;

        let mut imported = 0;
        for entry in entries {
            match self.insert(&entry) {
                Ok(()) => imported += 1,
                Err(MemoryError::DuplicateEntry { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        std::fs::rename(json_path, imported_path).map_err(|e| MemoryError::Database(e.to_string()))?;
        Ok(imported)
    }

    /// Inserts `entry`. Rejects a duplicate id.
    ///
    /// # Errors
    /// Returns [`MemoryError::DuplicateEntry`] if `entry.id` already exists.
    pub fn insert(&self, entry: &Entry) -> Result<(), MemoryError> {
        let tags_json = serde_json::to_string(&entry.tags).map_err(|e| MemoryError::Database(e.to_string()))?;
        let result = self.conn.execute(
            "INSERT INTO entries (id, summary, tags_json, timestamp, source, source_name, char_count, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entry.summary,
                tags_json,
                entry.timestamp,
                entry.source,
                entry.source_name,
                entry.char_count as i64,
                entry.content,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(MemoryError::DuplicateEntry {
                    id: entry.id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the entry with `id`. No-op if absent.
    ///
    /// # Errors
    /// Returns [`MemoryError`] on a database error.
    pub fn delete(&self, id: &str) -> Result<(), MemoryError> {
        self.conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Fetches a single entry by id.
    ///
    /// # Errors
    /// Returns [`MemoryError::EntryNotFound`] if no entry has that id.
    pub fn get(&self, id: &str) -> Result<Entry, MemoryError> {
        self.conn
            .query_row(
                "SELECT id, summary, tags_json, timestamp, source, source_name, char_count, content
                 FROM entries WHERE id = ?1",
                params![id],
                row_to_entry,
            )
            .optional()?
            .ok_or_else(|| MemoryError::EntryNotFound { id: id.to_string() })
    }

    /// BM25-ranked full-text search. Ascending rank order (FTS5 convention:
    /// lower is better), tie-broken by newer timestamp. When `tags` is
    /// supplied, results are filtered to entries whose tag set contains
    /// every requested tag (exact element match, not substring).
    ///
    /// # Errors
    /// Returns [`MemoryError`] on a database error.
    pub fn search(&self, query: &str, tags: &[String], limit: usize) -> Result<Vec<SearchHit>, MemoryError> {
        let fts_query = build_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.summary, e.tags_json, e.timestamp, e.char_count, bm25(entries_fts, 3.0, 2.0, 1.0) AS rank
             FROM entries_fts
             JOIN entries e ON e.rowid = entries_fts.rowid
             WHERE entries_fts MATCH ?1
             ORDER BY rank ASC, e.timestamp DESC
             LIMIT ?2",
        )?;

        let overfetch = if tags.is_empty() { limit } else { limit.saturating_mul(4).max(limit) };
        let rows = stmt.query_map(params![fts_query, overfetch as i64], |row| {
            let tags_json: String = row.get(2)?;
            let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
            Ok(SearchHit {
                meta: EntryMeta {
                    id: row.get(0)?,
                    summary: row.get(1)?,
                    tags,
                    timestamp: row.get(3)?,
                    char_count: row.get::<_, i64>(4)? as usize,
                },
                rank: row.get(5)?,
            })
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let hit = row?;
            if tags.iter().all(|t| hit.meta.tags.contains(t)) {
                hits.push(hit);
            }
            if hits.len() >= limit {
                break;
            }
        }
        Ok(hits)
    }

    /// Chronological listing (newest first), optionally filtered by tags.
    ///
    /// # Errors
    /// Returns [`MemoryError`] on a database error.
    pub fn list(&self, tags: &[String], offset: usize, limit: usize) -> Result<Vec<EntryMeta>, MemoryError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, summary, tags_json, timestamp, char_count FROM entries
             ORDER BY timestamp DESC LIMIT ?1 OFFSET ?2",
        )?;
        let fetch_limit = if tags.is_empty() { limit } else { limit.saturating_mul(4).max(limit) };
        let rows = stmt.query_map(params![fetch_limit as i64, offset as i64], |row| {
            let tags_json: String = row.get(2)?;
            let entry_tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
            Ok(EntryMeta {
                id: row.get(0)?,
                summary: row.get(1)?,
                tags: entry_tags,
                timestamp: row.get(3)?,
                char_count: row.get::<_, i64>(4)? as usize,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            let meta = row?;
            if tags.iter().all(|t| meta.tags.contains(t)) {
                out.push(meta);
            }
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    /// Counts entries per tag.
    ///
    /// # Errors
    /// Returns [`MemoryError`] on a database error.
    pub fn tag_histogram(&self) -> Result<Vec<(String, usize)>, MemoryError> {
        let mut stmt = self.conn.prepare("SELECT tags_json FROM entries")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for row in rows {
            let tags_json = row?;
            let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
            for tag in tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        let mut out: Vec<_> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(out)
    }

    /// Verifies the full-text index row count matches the source table.
    ///
    /// # Errors
    /// Returns [`MemoryError::IndexInconsistent`] if the counts diverge.
    pub fn check_index_consistency(&self) -> Result<(), MemoryError> {
        let entries: i64 = self.conn.query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))?;
        let fts: i64 = self.conn.query_row("SELECT COUNT(*) FROM entries_fts", [], |r| r.get(0))?;
        if entries != fts {
            return Err(MemoryError::IndexInconsistent(format!(
                "entries has {entries} rows but entries_fts has {fts}"
            )));
        }
        Ok(())
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    let tags_json: String = row.get(2)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    Ok(Entry {
        id: row.get(0)?,
        summary: row.get(1)?,
        tags,
        timestamp: row.get(3)?,
        source: row.get(4)?,
        source_name: row.get(5)?,
        char_count: row.get::<_, i64>(6)? as usize,
        content: row.get(7)?,
    })
}

/// Builds an FTS5 `MATCH` expression from free text: each whitespace-
/// separated term is individually double-quoted and OR-joined, so callers
/// never compose raw FTS syntax themselves.
fn build_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, summary: &str, tags: &[&str], content: &str, ts: f64) -> Entry {
        Entry {
            id: id.to_string(),
            summary: summary.to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            timestamp: ts,
            source: "text".to_string(),
            source_name: None,
            char_count: content.chars().count(),
            content: content.to_string(),
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let db = MemoryDb::in_memory().expect("open");
        db.insert(&entry("m_aaa", "summary", &["a"], "content", 1.0)).expect("insert");
        let got = db.get("m_aaa").expect("get");
        assert_eq!(got.summary, "summary");
    }

    #[test]
    fn duplicate_insert_is_conflict() {
        let db = MemoryDb::in_memory().expect("open");
        db.insert(&entry("m_aaa", "s", &[], "c", 1.0)).expect("insert");
        let err = db.insert(&entry("m_aaa", "s2", &[], "c2", 2.0)).unwrap_err();
        assert!(matches!(err, MemoryError::DuplicateEntry { .. }));
    }

    #[test]
    fn delete_is_noop_if_absent() {
        let db = MemoryDb::in_memory().expect("open");
        db.delete("m_missing").expect("delete");
    }

    #[test]
    fn fts_index_stays_consistent_across_insert_and_delete() {
        let db = MemoryDb::in_memory().expect("open");
        db.insert(&entry("m_a", "s", &[], "content one", 1.0)).unwrap();
        db.insert(&entry("m_b", "s", &[], "content two", 2.0)).unwrap();
        db.check_index_consistency().expect("consistent after insert");
        db.delete("m_a").unwrap();
        db.check_index_consistency().expect("consistent after delete");
    }

    #[test]
    fn search_finds_entry_by_summary_token() {
        let db = MemoryDb::in_memory().expect("open");
        db.insert(&entry(
            "m_a",
            "Deploy prerequisites",
            &["deploy", "ops"],
            "The deploy requires running migrations first",
            1.0,
        ))
        .unwrap();
        let hits = db.search("migrations deploy", &[], 20).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.id, "m_a");
    }

    #[test]
    fn search_tag_filter_is_exact_not_substring() {
        let db = MemoryDb::in_memory().expect("open");
        db.insert(&entry("m_a", "s", &["mcp"], "text about protocols", 1.0)).unwrap();
        db.insert(&entry("m_b", "s", &["mcp-server"], "text about protocols", 2.0)).unwrap();
        let hits = db.search("protocols", &["mcp".to_string()], 20).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.id, "m_a");
    }

    #[test]
    fn list_filters_by_tag_exactly() {
        let db = MemoryDb::in_memory().expect("open");
        db.insert(&entry("m_a", "s", &["mcp"], "c", 1.0)).unwrap();
        db.insert(&entry("m_b", "s", &["mcp-server"], "c", 2.0)).unwrap();
        let listed = db.list(&["mcp".to_string()], 0, 20).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "m_a");
    }

    #[test]
    fn bm25_rank_does_not_worsen_for_reinforced_term() {
        let db = MemoryDb::in_memory().expect("open");
        db.insert(&entry("m_unrelated", "s", &[], "apples oranges", 1.0)).unwrap();
        db.insert(&entry("m_target", "s", &[], "migration migration migration", 2.0)).unwrap();
        let hits = db.search("migration", &[], 20).expect("search");
        assert_eq!(hits[0].meta.id, "m_target");
    }

    #[test]
    fn legacy_json_import_runs_once() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let json_path = tmp.path().join("memory.json");
        let imported_path = tmp.path().join("memory.json.imported");
        let entries = vec![entry("m_a", "s", &["x"], "c", 1.0), entry("m_b", "s", &["y"], "c2", 2.0)];
        std::fs::write(&json_path, serde_json::to_string(&entries).unwrap()).unwrap();

        let db = MemoryDb::in_memory().expect("open");
        let imported = db.import_legacy_json(&json_path, &imported_path).expect("import");
        assert_eq!(imported, 2);
        assert!(imported_path.exists());
        assert!(!json_path.exists());

        assert_eq!(db.list(&[], 0, 10).unwrap().len(), 2);
    }

    #[test]
    fn open_imports_sibling_legacy_json_unconditionally() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let db_path = tmp.path().join("memory.db");
        let json_path = tmp.path().join("memory.json");
        let entries = vec![entry("m_a", "s", &["x"], "c", 1.0)];
        std::fs::write(&json_path, serde_json::to_string(&entries).unwrap()).unwrap();

        // No caller does anything beyond `open` — the import must happen as
        // part of migration, not a side effect of any particular command.
        let db = MemoryDb::open(&db_path).expect("open");
        assert_eq!(db.list(&[], 0, 10).unwrap().len(), 1);
        assert!(tmp.path().join("memory.json.imported").exists());
        assert!(!json_path.exists());
    }
}
