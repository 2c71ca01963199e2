//! Sharpie configuration module
//! Handles loading, saving, and overriding the config file

pub mod config;

pub use config::{Config, InferenceConfig, ServerConfig};
