//! CLI command implementations.
//!
//! Each command resolves the persisted-state layout via [`crate::config::Paths`],
//! calls exactly one core operation, and formats the result through
//! `cli::output`. Business logic itself lives in the core modules; this file
//! is dispatch only.

#![allow(clippy::too_many_lines)]

use std::time::{SystemTime, UNIX_EPOCH};

use crate::chunk::strategies::{create_strategy, Strategy};
use crate::chunk::{self, ChunkConfig, ChunkTarget};
use crate::cli::output::{
    format_manifest, format_memory_list, format_perf_log, format_recall, format_scan,
    format_session, format_tag_histogram, OutputFormat,
};
use crate::cli::parser::{Cli, Commands, StrategyAction};
use crate::config::Paths;
use crate::error::{CommandError, Error, Result};
use crate::memory::{self, MemoryDb};
use crate::scan;
use crate::session;
use crate::strategy_store::{self, PerfRecord};
use crate::transcript;

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn parse_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_line_range(spec: &str) -> Result<(usize, usize)> {
    let (a, b) = spec.split_once(':').ok_or_else(|| {
        Error::Command(CommandError::InvalidArgument(format!(
            "expected A:B, got {spec}"
        )))
    })?;
    let start: usize = a
        .trim()
        .parse()
        .map_err(|_| Error::Command(CommandError::InvalidArgument(format!("bad start: {a}"))))?;
    let end: usize = b
        .trim()
        .parse()
        .map_err(|_| Error::Command(CommandError::InvalidArgument(format!("bad end: {b}"))))?;
    Ok((start, end))
}

/// Executes the parsed CLI, formatting the result according to `cli.format`.
///
/// # Errors
/// Returns whatever the dispatched operation returns, wrapped in [`Error`].
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let paths = Paths::resolve(cli.base_dir.as_deref());
    paths
        .ensure_dirs()
        .map_err(|e| Error::Config { message: e.to_string() })?;

    match &cli.command {
        Commands::Scan { path, depth } => {
            let result = scan::scan(path, *depth)?;
            Ok(format_scan(&result, format))
        }

        Commands::Recommend { path } => {
            let scanned = scan::scan(path, None)?;
            let recs = chunk::recommend(&scanned);
            match format {
                OutputFormat::Text => {
                    let mut out = String::new();
                    for r in &recs {
                        out.push_str(&format!("{}: {}\n", r.strategy, r.rationale));
                    }
                    Ok(crate::gate::gate("recommend", &out))
                }
                OutputFormat::Json | OutputFormat::Ndjson => {
                    Ok(serde_json::to_string_pretty(&recs.iter().map(|r| {
                        serde_json::json!({"strategy": r.strategy, "rationale": r.rationale})
                    }).collect::<Vec<_>>()).unwrap_or_else(|_| "[]".to_string()))
                }
            }
        }

        Commands::Chunk {
            path,
            strategy,
            session,
            chunk_size,
            overlap,
            heading_level,
            target_size,
        } => {
            let strategy_impl = create_strategy(strategy)?;
            let config = ChunkConfig {
                chunk_size: *chunk_size,
                overlap: *overlap,
                heading_level: (*heading_level).min(usize::from(u8::MAX)) as u8,
                target_size: *target_size,
            };

            let scanned = scan::scan(path, None)?;
            let manifest = if path.is_file() {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Io(crate::error::IoError::ReadFailed {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })
                })?;
                let source = path.display().to_string();
                let language = scanned.files.first().and_then(|f| f.language);
                let target = ChunkTarget::Text {
                    source: &source,
                    content: &content,
                    language,
                };
                strategy_impl.chunk(&target, &config)?
            } else {
                let target = ChunkTarget::Files { files: &scanned.files };
                strategy_impl.chunk(&target, &config)?
            };

            if let Some(session_id) = session {
                let session_dir = paths.session_dir(session_id);
                session::store_manifest(&session_dir, manifest.clone())?;
            }

            Ok(format_manifest(&manifest, format))
        }

        Commands::Extract {
            file,
            lines,
            chunk_id,
            manifest,
            grep,
            context,
        } => {
            if let Some(pattern) = grep {
                let hunks = crate::extract::grep(file, pattern, *context)?;
                return match format {
                    OutputFormat::Text => {
                        let text = hunks.iter().map(|h| h.text.clone()).collect::<Vec<_>>().join("\n---\n");
                        Ok(crate::gate::gate("extract", &text))
                    }
                    OutputFormat::Json | OutputFormat::Ndjson => Ok(serde_json::to_string_pretty(
                        &hunks
                            .iter()
                            .map(|h| serde_json::json!({"start_line": h.start_line, "end_line": h.end_line, "text": h.text}))
                            .collect::<Vec<_>>(),
                    )
                    .unwrap_or_else(|_| "[]".to_string())),
                };
            }

            if let Some(id) = chunk_id {
                let manifest_path = manifest.as_ref().ok_or_else(|| {
                    Error::Command(CommandError::MissingArgument("--manifest".to_string()))
                })?;
                let raw = std::fs::read_to_string(manifest_path).map_err(|e| {
                    Error::Io(crate::error::IoError::ReadFailed {
                        path: manifest_path.display().to_string(),
                        reason: e.to_string(),
                    })
                })?;
                let loaded: crate::chunk::Manifest = serde_json::from_str(&raw).map_err(|e| {
                    Error::Command(CommandError::InvalidArgument(format!("bad manifest: {e}")))
                })?;
                let root = file.parent().unwrap_or(std::path::Path::new("."));
                let extraction = crate::extract::extract_chunk(&loaded, id, root)?;
                return Ok(crate::extract::extraction_for_orchestrator(&extraction));
            }

            if let Some(spec) = lines {
                let (start, end) = parse_line_range(spec)?;
                let extraction = crate::extract::extract_lines(file, start, end)?;
                return Ok(crate::extract::extraction_for_orchestrator(&extraction));
            }

            Err(Error::Command(CommandError::MissingArgument(
                "one of --lines, --chunk-id, --grep".to_string(),
            )))
        }

        Commands::Init { query, path } => {
            let id = session::new_session_id();
            let session_dir = paths.session_dir(&id);
            let state = session::init(&session_dir, &id, query, &path.display().to_string(), now_secs())?;
            Ok(format_session(&state, format))
        }

        Commands::Status { id } => {
            let state = session::load(&paths.session_dir(id))?;
            Ok(format_session(&state, format))
        }

        Commands::Result { id, key, value, all } => {
            let session_dir = paths.session_dir(id);
            if *all {
                let state = session::load(&session_dir)?;
                return Ok(format_session(&state, format));
            }
            let (Some(key), Some(value)) = (key, value) else {
                return Err(Error::Command(CommandError::MissingArgument(
                    "--key and --value (or --all)".to_string(),
                )));
            };
            let state = session::result(&session_dir, key, value, now_secs())?;
            Ok(format_session(&state, format))
        }

        Commands::Finalize { id, answer } => {
            let state = session::finalize(&paths.session_dir(id), answer.clone())?;
            Ok(format_session(&state, format))
        }

        Commands::Remember { content, tags, summary, file, stdin } => {
            let content = resolve_content(content.as_deref(), file.as_deref(), *stdin)?;
            let db = MemoryDb::open(paths.memory_db())?;
            let tags = tags.as_deref().map(|t| parse_tags(Some(t)));
            let id = memory::remember(&db, &content, tags, summary.clone(), "text", None, now_secs())?;
            match format {
                OutputFormat::Text => Ok(id),
                OutputFormat::Json | OutputFormat::Ndjson => {
                    Ok(serde_json::json!({"id": id}).to_string())
                }
            }
        }

        Commands::Recall { query, tags, max } => {
            let db = MemoryDb::open(paths.memory_db())?;
            let tag_list = parse_tags(tags.as_deref());
            let hits = memory::recall(&db, query, &tag_list, *max)?;
            Ok(format_recall(&hits, format))
        }

        Commands::MemoryExtract { id, grep, context, chunk_id } => {
            let db = MemoryDb::open(paths.memory_db())?;
            let manifest = chunk_id
                .as_ref()
                .and_then(|_| find_manifest_for_entry(&paths, id));
            let result = memory::memory_extract(&db, id, grep.as_deref(), *context, chunk_id.as_deref(), manifest.as_ref())?;
            let text = match result {
                memory::MemoryExtraction::Full(t) => t,
                memory::MemoryExtraction::Chunk(t) => t,
                memory::MemoryExtraction::Grep(hunks) => {
                    hunks.into_iter().map(|h| h.text).collect::<Vec<_>>().join("\n---\n")
                }
            };
            Ok(crate::gate::gate("memory-extract", &text))
        }

        Commands::MemoryList { tags, offset, limit } => {
            let db = MemoryDb::open(paths.memory_db())?;
            let tag_list = parse_tags(tags.as_deref());
            let entries = memory::list(&db, &tag_list, *offset, *limit)?;
            Ok(format_memory_list(&entries, format))
        }

        Commands::MemoryTags => {
            let db = MemoryDb::open(paths.memory_db())?;
            let histogram = db.tag_histogram()?;
            Ok(format_tag_histogram(&histogram, format))
        }

        Commands::Forget { id } => {
            let db = MemoryDb::open(paths.memory_db())?;
            memory::forget(&db, id)?;
            Ok(String::new())
        }

        Commands::ExportSession { path, out } => {
            let export = transcript::export_file(path)?;
            if let Some(out_path) = out {
                std::fs::write(out_path, &export.text).map_err(|e| {
                    Error::Io(crate::error::IoError::WriteFailed {
                        path: out_path.display().to_string(),
                        reason: e.to_string(),
                    })
                })?;
            }
            Ok(transcript::export_summary_for_orchestrator(&export))
        }

        Commands::Strategy { action } => match action {
            StrategyAction::Show => {
                let text = strategy_store::show(&paths.learned_patterns())?;
                Ok(text)
            }
            StrategyAction::Log { n } => {
                let records = strategy_store::log(&paths.performance_log(), *n)?;
                Ok(format_perf_log(&records, format))
            }
            StrategyAction::Perf {
                query,
                search_terms,
                entries_found,
                entries_relevant,
                subagents,
                notes,
            } => {
                let record = PerfRecord {
                    timestamp: now_secs(),
                    query: query.clone(),
                    search_terms: search_terms.split(',').map(str::trim).map(str::to_string).collect(),
                    entries_found: *entries_found,
                    entries_relevant: *entries_relevant,
                    subagents: *subagents,
                    notes: notes.clone(),
                };
                strategy_store::perf(&paths.performance_log(), &record)?;
                Ok(String::new())
            }
        },

        Commands::Stats => {
            // Large enough that no real memory store or performance log
            // would ever hit it; avoids casting `usize::MAX` into SQL's
            // `i64` LIMIT parameter.
            const ALL: usize = 10_000_000;
            let db = MemoryDb::open(paths.memory_db())?;
            let entries = db.list(&[], 0, ALL)?;
            let perf_records = strategy_store::log(&paths.performance_log(), ALL)?;
            match format {
                OutputFormat::Text => Ok(crate::gate::gate(
                    "stats",
                    &format!(
                        "base dir: {}\nmemory entries: {}\nperformance records: {}\n",
                        paths.base().display(),
                        entries.len(),
                        perf_records.len()
                    ),
                )),
                OutputFormat::Json | OutputFormat::Ndjson => Ok(serde_json::json!({
                    "base_dir": paths.base().display().to_string(),
                    "memory_entries": entries.len(),
                    "performance_records": perf_records.len(),
                })
                .to_string()),
            }
        }
    }
}

fn resolve_content(content: Option<&str>, file: Option<&std::path::Path>, stdin: bool) -> Result<String> {
    if stdin {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| Error::Io(crate::error::IoError::ReadFailed { path: "<stdin>".to_string(), reason: e.to_string() }))?;
        return Ok(buf);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path).map_err(|e| {
            Error::Io(crate::error::IoError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        });
    }
    content
        .map(str::to_string)
        .ok_or_else(|| Error::Command(CommandError::MissingArgument("content, --file, or --stdin".to_string())))
}

/// Looks up the last stored manifest for a memory entry's originating
/// session, if the entry was tagged `session:{id}` and that session ever
/// stored one. Best-effort: absence is not an error, the caller falls
/// through to a "no manifest" error from `memory_extract` itself.
fn find_manifest_for_entry(paths: &Paths, entry_id: &str) -> Option<crate::chunk::Manifest> {
    let db = MemoryDb::open(paths.memory_db()).ok()?;
    let entry = db.get(entry_id).ok()?;
    let session_tag = entry.tags.iter().find(|t| t.starts_with("session:"))?;
    let session_id = session_tag.strip_prefix("session:")?;
    let state = session::load(&paths.session_dir(session_id)).ok()?;
    state.manifest
}
