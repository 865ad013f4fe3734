//! # RLM-RS
//!
//! Recursive Language Model REPL for Claude Code.
//!
//! RLM-RS gives an orchestrating LLM bounded, content-free visibility into
//! a large repository or log: scan structure without reading every file,
//! chunk targets into addressable manifests, extract exactly the slice
//! that's needed, and carry findings across sub-agent calls in a
//! persistent memory store — all without ever pushing an unbounded blob
//! back into the orchestrator's context.
//!
//! ## Modules
//!
//! - **Scanner**: filesystem metadata, language detection, structure outlines
//! - **Chunker**: seven content-free chunking strategies plus a recommender
//! - **Extractor**: line-range, chunk-id, and grep-with-context retrieval
//! - **Analysis sessions**: a small atomic, resumable state store
//! - **Memory**: a `SQLite` + FTS5 store for cross-session recall
//! - **Transcript export**: compresses a tool-call log into a text digest
//! - **Semantic tagger**: keyword fallback plus an optional real-LLM client

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod chunk;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod io;
pub mod memory;
pub mod remote;
pub mod scan;
pub mod session;
pub mod strategy_store;
pub mod tagger;
pub mod transcript;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export scan/chunk/extract/session/memory types
pub use chunk::{Chunk, ChunkConfig, ChunkSpan, ChunkTarget, Manifest};
pub use extract::{extract_chunk, extract_lines, grep, Extraction, GrepHunk};
pub use memory::{MemoryDb, SizeClass};
pub use scan::{scan, ScanResult};
pub use session::{SessionState, SessionStatus};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
