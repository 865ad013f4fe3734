//! I/O utilities for RLM-RS.
//!
//! Unicode-aware helpers shared by the bounded-output gate and the
//! semantic tagger's token-budget truncation.

pub mod unicode;

pub use unicode::{find_char_boundary, validate_utf8};
