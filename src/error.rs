//! Error types for the memory and analysis engine.
//!
//! A layered `thiserror` hierarchy: one top-level [`Error`] wraps a
//! per-subsystem enum via `#[from]`. [`ErrorKind`] groups every variant into
//! the seven kinds the external interface promises (see the error-handling
//! design notes) so CLI and remote-tool formatting can react uniformly
//! without matching every concrete variant.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type returned by every public operation.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Scanner failures.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Chunking failures.
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// Extraction failures.
    #[error("extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Analysis-session store failures.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Memory DB / memory service failures.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    /// Strategy store failures.
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    /// Transcript export failures.
    #[error("transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI / remote-tool dispatch errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Invalid internal state, not attributable to a single subsystem.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the invalid state.
        message: String,
    },

    /// Configuration errors (bad base dir, unreadable config).
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// The seven error kinds the external interface is specified against.
///
/// Multiple concrete variants across the subsystem enums below map to the
/// same kind; this is the classification the CLI and remote-tool layers use
/// to decide exit codes and retry/fallback behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown id, missing file, absent session.
    NotFound,
    /// Malformed input: bad regex, bad line range, unknown strategy.
    InvalidArgument,
    /// Full-text index drifted from its source table; store needs repair.
    IndexInconsistency,
    /// Mutation of a finalized session; duplicate id on insert.
    Conflict,
    /// Database lock timeout exceeded.
    Busy,
    /// A collaborator (e.g. the tagger's LLM call) failed.
    External,
    /// An internal result exceeded the bounded-output cap and was truncated.
    Unbounded,
    /// Anything not covered by the above.
    Internal,
}

impl Error {
    /// Classifies this error into one of the kinds the external interface
    /// documents, so callers can react without matching every variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Scan(e) => e.kind(),
            Self::Chunking(e) => e.kind(),
            Self::Extract(e) => e.kind(),
            Self::Session(e) => e.kind(),
            Self::Memory(e) => e.kind(),
            Self::Strategy(e) => e.kind(),
            Self::Transcript(e) => e.kind(),
            Self::Io(_) | Self::InvalidState { .. } | Self::Config { .. } => ErrorKind::Internal,
            Self::Command(e) => e.kind(),
        }
    }
}

/// Scanner-specific errors.
#[derive(ThisError, Debug, Serialize, Deserialize)]
pub enum ScanError {
    /// The scan root does not exist or cannot be opened.
    #[error("path not found: {path}")]
    PathNotFound {
        /// Path that could not be found.
        path: String,
    },

    /// A path was encountered during the walk but could not be read; this is
    /// recorded alongside the summary rather than aborting the scan.
    #[error("unreadable path: {path}: {reason}")]
    Unreadable {
        /// Path that could not be read.
        path: String,
        /// Underlying reason.
        reason: String,
    },

    /// Structure-outline extraction failed for a file.
    #[error("failed to outline {path}: {reason}")]
    OutlineFailed {
        /// Path of the file.
        path: String,
        /// Underlying reason.
        reason: String,
    },
}

impl ScanError {
    const fn kind(&self) -> ErrorKind {
        match self {
            Self::PathNotFound { .. } => ErrorKind::NotFound,
            Self::Unreadable { .. } | Self::OutlineFailed { .. } => ErrorKind::Internal,
        }
    }
}

/// Chunking-specific errors.
#[derive(ThisError, Debug)]
pub enum ChunkingError {
    /// Invalid UTF-8 encountered at a specific byte offset.
    #[error("invalid UTF-8 at byte offset {offset}")]
    InvalidUtf8 {
        /// Byte offset where invalid UTF-8 was found.
        offset: usize,
    },

    /// Invalid chunk configuration.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// Overlap exceeds chunk size.
    #[error("overlap {overlap} must be less than chunk size {size}")]
    OverlapTooLarge {
        /// Overlap size.
        overlap: usize,
        /// Chunk size.
        size: usize,
    },

    /// Unknown chunking strategy.
    #[error("unknown chunking strategy: {name}")]
    UnknownStrategy {
        /// Name of the unknown strategy.
        name: String,
    },

    /// Parallel processing error.
    #[error("parallel processing failed: {reason}")]
    ParallelFailed {
        /// Reason for failure.
        reason: String,
    },
}

impl ChunkingError {
    const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. } | Self::OverlapTooLarge { .. } | Self::UnknownStrategy { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::InvalidUtf8 { .. } | Self::ParallelFailed { .. } => ErrorKind::Internal,
        }
    }
}

/// Extraction-specific errors.
#[derive(ThisError, Debug)]
pub enum ExtractError {
    /// The target file does not exist.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file.
        path: String,
    },

    /// The regex pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// A chunk id was not present in the supplied manifest.
    #[error("chunk not found in manifest: {id}")]
    ChunkNotFound {
        /// Chunk id that was not found.
        id: String,
    },
}

impl ExtractError {
    const fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. } | Self::ChunkNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidPattern(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Analysis-session store errors.
#[derive(ThisError, Debug)]
pub enum SessionError {
    /// Unknown session id.
    #[error("session not found: {id}")]
    NotFound {
        /// Session id that was not found.
        id: String,
    },

    /// Attempted mutation of a finalized session.
    #[error("session {id} is finalized and cannot be modified")]
    AlreadyFinalized {
        /// Session id.
        id: String,
    },

    /// State file was corrupt or could not be (de)serialized.
    #[error("session state corrupt: {reason}")]
    CorruptState {
        /// Underlying reason.
        reason: String,
    },
}

impl SessionError {
    const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyFinalized { .. } => ErrorKind::Conflict,
            Self::CorruptState { .. } => ErrorKind::Internal,
        }
    }
}

/// Memory DB / memory-service errors.
#[derive(ThisError, Debug)]
pub enum MemoryError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Memory entry not found by id.
    #[error("entry not found: {id}")]
    EntryNotFound {
        /// Entry id that was not found.
        id: String,
    },

    /// Duplicate id on insert.
    #[error("entry already exists: {id}")]
    DuplicateEntry {
        /// Conflicting id.
        id: String,
    },

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The full-text index has drifted out of sync with its source table.
    #[error("full-text index inconsistent: {0}")]
    IndexInconsistent(String),

    /// Busy timeout exceeded while waiting for the write lock.
    #[error("database busy, retry later")]
    Busy,
}

impl MemoryError {
    const fn kind(&self) -> ErrorKind {
        match self {
            Self::EntryNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateEntry { .. } => ErrorKind::Conflict,
            Self::IndexInconsistent(_) => ErrorKind::IndexInconsistency,
            Self::Busy => ErrorKind::Busy,
            Self::Database(_) | Self::Migration(_) => ErrorKind::Internal,
        }
    }
}

/// Strategy-store errors.
#[derive(ThisError, Debug)]
pub enum StrategyError {
    /// The learned-patterns document or performance log could not be read or written.
    #[error("strategy store I/O error: {0}")]
    Io(String),
}

impl StrategyError {
    const fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

/// Transcript-export errors.
#[derive(ThisError, Debug)]
pub enum TranscriptError {
    /// The session log could not be opened.
    #[error("session log not found: {path}")]
    LogNotFound {
        /// Path to the session log.
        path: String,
    },

    /// A record in the log could not be parsed; the export continues past it.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// Line number in the raw log.
        line: usize,
        /// Underlying reason.
        reason: String,
    },
}

impl TranscriptError {
    const fn kind(&self) -> ErrorKind {
        match self {
            Self::LogNotFound { .. } => ErrorKind::NotFound,
            Self::MalformedRecord { .. } => ErrorKind::Internal,
        }
    }
}

/// I/O-specific errors for file operations.
#[derive(ThisError, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI / remote-tool dispatch errors.
#[derive(ThisError, Debug)]
pub enum CommandError {
    /// Unknown command or method name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// Output formatting error.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

impl CommandError {
    const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCommand(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) | Self::MissingArgument(_) => ErrorKind::InvalidArgument,
            Self::OutputFormat(_) => ErrorKind::Internal,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for MemoryError {
    fn from(err: rusqlite::Error) -> Self {
        if matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy)
        {
            Self::Busy
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Memory(err.into())
    }
}

impl From<regex::Error> for ExtractError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPattern(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::CorruptState {
            reason: err.to_string(),
        }
    }
}

impl From<std::str::Utf8Error> for ChunkingError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8 {
            offset: err.valid_up_to(),
        }
    }
}
