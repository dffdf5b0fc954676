//! Activity logging: JSONL append-only writer fed by a dedicated logger thread.

pub mod activity;
pub mod jsonl;
