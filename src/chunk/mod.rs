//! Chunking: seven content-free strategies over scanned targets, plus a
//! recommendation engine.
//!
//! Every strategy produces a [`Manifest`] of [`Chunk`] descriptors — never
//! the underlying content. A caller later uses the extractor (see
//! [`crate::extract`]) with a chunk id to retrieve the actual bytes.

pub mod hash;
pub mod recommend;
pub mod strategies;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ChunkingError;
use crate::scan::ScannedFile;

pub use recommend::recommend;
pub use strategies::{available_strategies, create_strategy};

/// What a chunk's span describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkSpan {
    /// A 1-indexed, inclusive line range within a single file.
    Lines {
        /// First line, inclusive.
        start: usize,
        /// Last line, inclusive.
        end: usize,
    },
    /// A group of whole files.
    Files {
        /// Paths belonging to this group.
        paths: Vec<PathBuf>,
    },
}

/// A content-free chunk descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic, cross-host-stable id (16 hex chars).
    pub id: String,
    /// Source file path, or group name for file-group chunks.
    pub source: String,
    /// What the chunk spans.
    pub span: ChunkSpan,
    /// Estimated character count of the underlying content.
    pub char_count: usize,
    /// Short preview, if cheaply available.
    pub preview: Option<String>,
    /// Detected language, if known.
    pub language: Option<String>,
}

/// An ordered sequence of chunks over one target.
pub type Manifest = Vec<Chunk>;

/// What a strategy chunks: either the text of a single file, or a list of
/// already-scanned files to be grouped whole.
pub enum ChunkTarget<'a> {
    /// Single-file text input (`lines`, `headings`, `semantic`, `functions`).
    Text {
        /// Source path, used for chunk-id derivation.
        source: &'a str,
        /// Full file content.
        content: &'a str,
        /// Detected language, if known.
        language: Option<&'a str>,
    },
    /// Whole-file grouping input (`files_directory`, `files_language`, `files_balanced`).
    Files {
        /// Previously scanned files to partition.
        files: &'a [ScannedFile],
    },
}

/// Tunable parameters shared across strategies; strategies ignore the ones
/// that don't apply to them.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Target chunk size in lines (`lines` strategy).
    pub chunk_size: usize,
    /// Overlap in lines (`lines` strategy).
    pub overlap: usize,
    /// Markdown heading level to split on (`headings` strategy).
    pub heading_level: u8,
    /// Target chunk size in bytes (`semantic`, `files_balanced`).
    pub target_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
            heading_level: 2,
            target_size: 50_000,
        }
    }
}

impl ChunkConfig {
    /// Validates the configuration, rejecting overlap that would make a
    /// window degenerate.
    ///
    /// # Errors
    /// Returns [`ChunkingError::OverlapTooLarge`] when `overlap >= chunk_size`.
    pub fn validate(&self) -> std::result::Result<(), ChunkingError> {
        if self.overlap >= self.chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: self.overlap,
                size: self.chunk_size,
            });
        }
        Ok(())
    }
}
