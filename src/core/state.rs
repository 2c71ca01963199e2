//! Application state

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::db::{Database, PromptRepository};
use crate::inference::InferenceClient;
use crate::prompt::PromptService;

/// Shared handles for request handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub prompts: Arc<PromptService>,
    pub inference: InferenceClient,
    pub default_model: String,
}

impl AppState {
    pub fn new(
        db: Database,
        prompts: PromptService,
        inference: InferenceClient,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            db,
            prompts: Arc::new(prompts),
            inference,
            default_model: default_model.into(),
        }
    }

    /// Open the database and build the Ollama client described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::new(config.resolve_db_path()?)?;
        let prompts = PromptService::new(Arc::new(PromptRepository::new(db.clone())))
            .with_share_prefix(&config.share_path_prefix);
        let inference = InferenceClient::new(&config.inference.host, config.inference.timeout())
            .context("Failed to build Ollama client")?;

        Ok(Self::new(db, prompts, inference, &config.inference.default_model))
    }
}
