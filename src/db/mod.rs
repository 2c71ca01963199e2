//! Database module

pub mod connection;
pub mod error;
pub mod repositories;
pub mod schema;

pub use connection::Database;
pub use error::StoreError;
pub use repositories::prompt::{
    ForkRecord, NewPrompt, PromptRecord, PromptRepository, PromptStore,
};
