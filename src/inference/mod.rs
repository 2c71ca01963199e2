//! Ollama inference backend: HTTP client and the streaming relay

pub mod client;
pub mod decoder;
pub mod event;
pub mod relay;

pub use client::{InferenceClient, InferenceError};
pub use decoder::{GenerateChunk, NdjsonDecoder};
pub use event::RelayEvent;
pub use relay::{format_prompt, relay, GenerateRequest};
