//! Prompt saving, sharing and forking

pub mod id;
pub mod service;

pub use id::{IdGenerator, ShortIdGenerator, ID_ALPHABET, ID_LENGTH};
pub use service::{PromptInput, PromptService, ServiceError, SharedPrompt, MAX_ID_ATTEMPTS};
