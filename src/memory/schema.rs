//! Memory database schema and migrations.
//!
//! Grounded on the teacher's `storage/schema.rs`: the same
//! `schema_info`/version/migration machinery, and the same FTS5
//! external-content + trigger pattern, retargeted from `chunks` to `entries`.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    summary TEXT NOT NULL,
    tags_json TEXT NOT NULL,
    timestamp REAL NOT NULL,
    source TEXT NOT NULL,
    source_name TEXT,
    char_count INTEGER NOT NULL,
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON entries(timestamp);

-- FTS5 virtual table for BM25 full-text search over summary/tags/content.
CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
    summary,
    tags,
    content,
    content='entries',
    content_rowid='rowid',
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS entries_ai AFTER INSERT ON entries BEGIN
    INSERT INTO entries_fts(rowid, summary, tags, content)
    VALUES (new.rowid, new.summary, new.tags_json, new.content);
END;

CREATE TRIGGER IF NOT EXISTS entries_ad AFTER DELETE ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, summary, tags, content)
    VALUES('delete', old.rowid, old.summary, old.tags_json, old.content);
END;

CREATE TRIGGER IF NOT EXISTS entries_au AFTER UPDATE ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, summary, tags, content)
    VALUES('delete', old.rowid, old.summary, old.tags_json, old.content);
    INSERT INTO entries_fts(rowid, summary, tags, content)
    VALUES (new.rowid, new.summary, new.tags_json, new.content);
END;
";

/// SQL to check if the schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get the schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set the schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// A schema migration step.
pub struct Migration {
    /// Version this migration upgrades from.
    pub from_version: u32,
    /// Version this migration upgrades to.
    pub to_version: u32,
    /// SQL statements to execute.
    pub sql: &'static str,
}

/// No migrations yet; `entries`/`entries_fts` ship at v1 directly. Kept as
/// an empty, append-only array so future schema changes follow the same
/// pattern the teacher established.
pub const MIGRATIONS: &[Migration] = &[];

/// Gets migrations needed to upgrade from `current_version`.
#[must_use]
pub fn get_migrations_from(current_version: u32) -> Vec<&'static Migration> {
    MIGRATIONS
        .iter()
        .filter(|m| m.from_version >= current_version && m.to_version <= CURRENT_SCHEMA_VERSION)
        .collect()
}
