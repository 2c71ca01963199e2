//! Sharpie - self-hostable AI prompt playground backend

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod inference;
pub mod prompt;
