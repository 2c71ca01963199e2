//! Repositories over the SQLite schema

pub mod prompt;
