//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros, per the external
//! interface's canonical verb list.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// RLM-RS: Recursive Language Model REPL for Claude Code.
///
/// A CLI tool for scanning, chunking, extracting, and remembering large
/// context so an orchestrator can work far beyond its own context window.
#[derive(Parser, Debug)]
#[command(name = "rlm-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base directory for all persisted state. Defaults to `RLM_BASE_DIR`,
    /// then `~/.rlm`.
    #[arg(long, global = true, env = "RLM_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scans a path, producing a file inventory, directory skeleton, and
    /// structure outlines.
    Scan {
        /// Path to scan.
        path: PathBuf,

        /// Maximum directory depth.
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Recommends chunking strategies for a scanned path.
    Recommend {
        /// Path to analyze.
        path: PathBuf,
    },

    /// Chunks a path with the given strategy, producing a manifest.
    Chunk {
        /// Path to chunk.
        path: PathBuf,

        /// Strategy name (see `STRATEGY_NAMES`).
        #[arg(long)]
        strategy: String,

        /// Analysis-session id to store the manifest under.
        #[arg(long)]
        session: Option<String>,

        /// Target chunk size in characters, for `lines`/`semantic`.
        #[arg(long, default_value = "500")]
        chunk_size: usize,

        /// Overlap between chunks in characters.
        #[arg(long, default_value = "50")]
        overlap: usize,

        /// Markdown heading level to split at, for `headings`.
        #[arg(long, default_value = "2")]
        heading_level: usize,

        /// Target byte size per group, for `files_balanced`/`semantic`.
        #[arg(long, default_value = "50000")]
        target_size: usize,
    },

    /// Extracts content via a line range, a chunk id, or a grep pattern.
    Extract {
        /// File to extract from.
        file: PathBuf,

        /// Inclusive line range `A:B`.
        #[arg(long)]
        lines: Option<String>,

        /// Chunk id to extract, requires `--manifest`.
        #[arg(long)]
        chunk_id: Option<String>,

        /// Manifest file produced by `chunk`.
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Regex pattern to search for.
        #[arg(long)]
        grep: Option<String>,

        /// Context lines around each grep match.
        #[arg(long, default_value = "2")]
        context: usize,
    },

    /// Creates a new analysis session, printing its id.
    Init {
        /// The orchestrator's query.
        query: String,

        /// The path the query targets.
        path: PathBuf,
    },

    /// Shows an analysis session's current state.
    Status {
        /// Session id.
        id: String,
    },

    /// Writes or reads a session result.
    Result {
        /// Session id.
        id: String,

        /// Result key to write (requires `--value`).
        #[arg(long)]
        key: Option<String>,

        /// Value to write (requires `--key`).
        #[arg(long)]
        value: Option<String>,

        /// Print all results instead of writing one.
        #[arg(long)]
        all: bool,
    },

    /// Freezes a session, recording an optional final answer.
    Finalize {
        /// Session id.
        id: String,

        /// Final answer text.
        #[arg(long)]
        answer: Option<String>,
    },

    /// Stores new content in the memory database.
    Remember {
        /// Content to remember, unless `--file` or `--stdin` is given.
        content: Option<String>,

        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,

        /// One-line summary.
        #[arg(long)]
        summary: Option<String>,

        /// Read content from this file instead.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Read content from stdin instead.
        #[arg(long)]
        stdin: bool,
    },

    /// Searches the memory database.
    Recall {
        /// Free-text query.
        query: String,

        /// Comma-separated tags to filter by.
        #[arg(long)]
        tags: Option<String>,

        /// Maximum results.
        #[arg(long, default_value = "20")]
        max: usize,
    },

    /// Extracts content from a memory entry.
    #[command(name = "memory-extract")]
    MemoryExtract {
        /// Memory entry id.
        id: String,

        /// Regex pattern to search for within the entry.
        #[arg(long)]
        grep: Option<String>,

        /// Context lines around each grep match.
        #[arg(long, default_value = "2")]
        context: usize,

        /// Chunk id to look up in the entry's saved manifest.
        #[arg(long)]
        chunk_id: Option<String>,
    },

    /// Lists memory entries, newest first.
    #[command(name = "memory-list", alias = "ls")]
    MemoryList {
        /// Comma-separated tags to filter by.
        #[arg(long)]
        tags: Option<String>,

        /// Offset into the result set.
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum results.
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Shows a tag histogram across all memory entries.
    #[command(name = "memory-tags")]
    MemoryTags,

    /// Deletes a memory entry.
    #[command(alias = "rm")]
    Forget {
        /// Memory entry id.
        id: String,
    },

    /// Exports a session transcript log to plain text.
    #[command(name = "export-session")]
    ExportSession {
        /// Path to the raw, line-delimited session log.
        path: PathBuf,

        /// Where to write the plain-text transcript.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Reads or appends to the learned-patterns strategy store.
    Strategy {
        /// Strategy subcommand.
        #[command(subcommand)]
        action: StrategyAction,
    },

    /// Prints aggregate stats about persisted state.
    Stats,
}

/// Strategy-store subcommands.
#[derive(Subcommand, Debug)]
pub enum StrategyAction {
    /// Shows the learned-patterns document.
    Show,

    /// Shows the last N performance records.
    Log {
        /// How many records to show.
        #[arg(long, default_value = "20")]
        n: usize,
    },

    /// Appends a performance record.
    Perf {
        /// The query that was run.
        query: String,

        /// Comma-separated search terms used.
        #[arg(long)]
        search_terms: String,

        /// Entries the search surfaced.
        #[arg(long)]
        entries_found: usize,

        /// Of those, how many were relevant.
        #[arg(long)]
        entries_relevant: usize,

        /// Subagents the orchestrator dispatched.
        #[arg(long, default_value = "0")]
        subagents: usize,

        /// Free-text notes.
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_parses_with_depth() {
        let cli = Cli::parse_from(["rlm-rs", "scan", "/tmp/x", "--depth", "3"]);
        match cli.command {
            Commands::Scan { path, depth } => {
                assert_eq!(path, PathBuf::from("/tmp/x"));
                assert_eq!(depth, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn strategy_perf_parses_subcommand() {
        let cli = Cli::parse_from([
            "rlm-rs",
            "strategy",
            "perf",
            "why slow",
            "--search-terms",
            "slow,latency",
            "--entries-found",
            "5",
            "--entries-relevant",
            "2",
        ]);
        match cli.command {
            Commands::Strategy {
                action: StrategyAction::Perf { query, entries_found, .. },
            } => {
                assert_eq!(query, "why slow");
                assert_eq!(entries_found, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_base_dir_flag_is_parsed() {
        let cli = Cli::parse_from(["rlm-rs", "--base-dir", "/custom", "stats"]);
        assert_eq!(cli.base_dir, Some(PathBuf::from("/custom")));
    }

    #[test]
    fn memory_list_accepts_ls_alias() {
        let cli = Cli::parse_from(["rlm-rs", "ls"]);
        assert!(matches!(cli.command, Commands::MemoryList { .. }));
    }

    #[test]
    fn forget_accepts_rm_alias() {
        let cli = Cli::parse_from(["rlm-rs", "rm", "m_abc"]);
        match cli.command {
            Commands::Forget { id } => assert_eq!(id, "m_abc"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
