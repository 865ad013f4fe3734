//! Integration tests for RLM-RS.

#![allow(clippy::expect_used)]

use rlm_rs::chunk::strategies::{available_strategies, create_strategy};
use rlm_rs::chunk::{ChunkConfig, ChunkTarget};
use rlm_rs::memory::MemoryDb;
use rlm_rs::{extract_chunk, extract_lines, scan, session};
use tempfile::TempDir;

fn write_tree(tmp: &TempDir) {
    std::fs::write(tmp.path().join("a.rs"), "fn alpha() {}\nfn beta() {}\n").expect("write a.rs");
    std::fs::write(tmp.path().join("b.py"), "def f():\n    pass\n").expect("write b.py");
    std::fs::create_dir(tmp.path().join("sub")).expect("mkdir sub");
    std::fs::write(tmp.path().join("sub/c.rs"), "fn gamma() {}\n").expect("write c.rs");
}

#[test]
fn scan_discovers_files_and_outlines() {
    let tmp = TempDir::new().expect("tempdir");
    write_tree(&tmp);

    let result = scan::scan(tmp.path(), None).expect("scan");
    assert_eq!(result.file_count(), 3);
    let by_lang = result.by_language();
    assert!(by_lang.contains(&("Rust", 2)));
    assert!(by_lang.contains(&("Python", 1)));
    assert_eq!(result.outlines.len(), 1);
    assert_eq!(result.outlines[0].entries.len(), 2);
}

#[test]
fn scan_missing_path_errors() {
    let result = scan::scan(std::path::Path::new("/nonexistent/path/xyz"), None);
    assert!(result.is_err());
}

#[test]
fn chunking_strategies_are_discoverable_and_buildable() {
    let names = available_strategies();
    assert!(names.contains(&"lines"));
    assert!(names.contains(&"files_balanced"));
    assert!(names.contains(&"semantic"));

    assert!(create_strategy("lines").is_ok());
    assert!(create_strategy("unknown").is_err());
}

#[test]
fn lines_strategy_chunks_and_extracts_round_trip() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("doc.txt");
    let content = "line one\nline two\nline three\nline four\nline five\n";
    std::fs::write(&path, content).expect("write doc.txt");

    let strategy = create_strategy("lines").expect("lines strategy");
    let config = ChunkConfig {
        chunk_size: 2,
        overlap: 0,
        ..ChunkConfig::default()
    };
    let target = ChunkTarget::Text {
        source: path.to_str().expect("utf8 path"),
        content,
        language: None,
    };
    let manifest = strategy.chunk(&target, &config).expect("chunk");
    assert!(!manifest.is_empty());

    let first_id = manifest[0].id.clone();
    let extraction = extract_chunk(&manifest, &first_id, tmp.path()).expect("extract_chunk");
    assert!(!extraction.text.is_empty());
}

#[test]
fn extract_lines_clamps_out_of_range_requests() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("doc.txt");
    std::fs::write(&path, "one\ntwo\nthree\n").expect("write doc.txt");

    let extraction = extract_lines(&path, 1, 1000).expect("extract_lines");
    assert_eq!(extraction.text, "one\ntwo\nthree");
    assert_eq!(extraction.start_line, Some(1));
    assert_eq!(extraction.end_line, Some(3));
}

#[test]
fn extract_lines_missing_file_errors() {
    let result = extract_lines(std::path::Path::new("/nonexistent/file.txt"), 1, 10);
    assert!(result.is_err());
}

#[test]
fn session_lifecycle_init_result_finalize() {
    let tmp = TempDir::new().expect("tempdir");
    let session_dir = tmp.path().join("session");

    let state = session::init(&session_dir, "sess-1", "what does this do?", "./src", 1.0)
        .expect("init");
    assert_eq!(state.id, "sess-1");
    assert!(matches!(state.status, session::SessionStatus::Active));

    let state = session::result(&session_dir, "finding-1", "found the bug", 2.0).expect("result");
    assert_eq!(state.results.get("finding-1"), Some(&"found the bug".to_string()));

    let state = session::finalize(&session_dir, Some("all done".to_string())).expect("finalize");
    assert!(matches!(state.status, session::SessionStatus::Finalized));
    assert_eq!(state.answer.as_deref(), Some("all done"));

    // A finalized session rejects further results.
    let err = session::result(&session_dir, "finding-2", "too late", 3.0);
    assert!(err.is_err());
}

#[test]
fn memory_remember_recall_forget_round_trip() {
    let db = MemoryDb::in_memory().expect("in_memory db");

    let id = rlm_rs::memory::remember(
        &db,
        "the parser chokes on trailing commas in JSON arrays",
        Some(vec!["bug".to_string(), "parser".to_string()]),
        None,
        "test",
        None,
        1.0,
    )
    .expect("remember");

    let hits = rlm_rs::memory::recall(&db, "trailing commas", &[], 5).expect("recall");
    assert!(hits.iter().any(|h| h.hit.meta.id == id));

    rlm_rs::memory::forget(&db, &id).expect("forget");
    let hits_after = rlm_rs::memory::recall(&db, "trailing commas", &[], 5).expect("recall");
    assert!(hits_after.iter().all(|h| h.hit.meta.id != id));
}

mod property_tests {
    use proptest::prelude::*;
    use rlm_rs::extract_lines;

    proptest! {
        #[test]
        fn extracted_range_never_exceeds_file_line_count(n_lines in 1usize..50) {
            let tmp = tempfile::TempDir::new().expect("tempdir");
            let path = tmp.path().join("doc.txt");
            let content: String = (0..n_lines).map(|i| format!("line {i}\n")).collect();
            std::fs::write(&path, &content).expect("write");

            let extraction = extract_lines(&path, 1, n_lines + 100).expect("extract_lines");
            let returned_lines = extraction.text.lines().count();
            prop_assert!(returned_lines <= n_lines);
        }
    }
}
