//! Persistent memory: a `SQLite` + FTS5 store plus the service-level
//! operations (`remember`, `recall`, `memory_extract`, `forget`,
//! `deduplicate`) that sit atop it.

pub mod db;
pub mod schema;
pub mod service;

pub use db::{Entry, EntryMeta, MemoryDb, SearchHit};
pub use service::{
    deduplicate, forget, list, memory_extract, new_entry_id, recall, recall_for_orchestrator,
    remember, MemoryExtraction, RecallHit, SizeClass, DEDUP_WINDOW_SECONDS,
};
