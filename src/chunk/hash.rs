//! Deterministic, cross-host chunk-id hashing.
//!
//! The id is the low 64 bits of a `BLAKE3` digest over the canonical key,
//! formatted as 16 lowercase hex characters. Unlike `DefaultHasher` (SipHash
//! keyed by a per-process random seed) this is stable across processes,
//! hosts, and Rust versions, which the cross-host determinism invariant
//! requires.

/// Hashes an arbitrary string into a 16-hex-character stable id.
#[must_use]
pub fn stable_hash(key: &str) -> String {
    let digest = blake3::hash(key.as_bytes());
    let bytes = digest.as_bytes();
    let mut out = String::with_capacity(16);
    for byte in &bytes[..8] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Chunk id for a line-range chunk: deterministic over `source:start:end`.
#[must_use]
pub fn line_range_id(source: &str, start: usize, end: usize) -> String {
    stable_hash(&format!("{source}:{start}:{end}"))
}

/// Chunk id for a file-group chunk: deterministic over `group_name:file_count`.
#[must_use]
pub fn file_group_id(group_name: &str, file_count: usize) -> String {
    stable_hash(&format!("{group_name}:{file_count}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_hash_is_deterministic() {
        assert_eq!(stable_hash("a:1:10"), stable_hash("a:1:10"));
    }

    #[test]
    fn stable_hash_is_sixteen_hex_chars() {
        let h = stable_hash("anything");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_inputs_differ() {
        assert_ne!(line_range_id("a.rs", 1, 10), line_range_id("a.rs", 1, 11));
    }

    #[test]
    fn file_group_id_deterministic() {
        assert_eq!(file_group_id("src", 4), file_group_id("src", 4));
        assert_ne!(file_group_id("src", 4), file_group_id("lib", 4));
    }
}
