//! Append-only JSONL session log with graceful degradation.

pub mod jsonl;
