//! Prompt service
//!
//! Identifier generation and orchestration on top of a [`PromptStore`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::id::{IdGenerator, ShortIdGenerator};
use crate::db::{NewPrompt, PromptRecord, PromptStore, StoreError};

/// Collisions past this many attempts mean something is wrong with the id
/// space or the store, not bad luck.
pub const MAX_ID_ATTEMPTS: u32 = 5;

const DEFAULT_SHARE_PREFIX: &str = "/p";

/// Prompt content supplied by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptInput {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
}

/// Id and share link of a newly stored prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedPrompt {
    pub id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Prompt not found: {0}")]
    NotFound(String),

    #[error("Parent prompt not found: {0}")]
    ParentNotFound(String),

    /// The fork's prompt row exists but its lineage entry does not.
    #[error("Fork {} was saved but its lineage was not recorded: {reason}", .prompt.id)]
    LineageNotRecorded { prompt: SharedPrompt, reason: String },

    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Storage(other),
        }
    }
}

pub struct PromptService {
    store: Arc<dyn PromptStore>,
    ids: Arc<dyn IdGenerator>,
    share_prefix: String,
}

impl PromptService {
    pub fn new(store: Arc<dyn PromptStore>) -> Self {
        Self {
            store,
            ids: Arc::new(ShortIdGenerator::default()),
            share_prefix: DEFAULT_SHARE_PREFIX.to_string(),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_share_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.share_prefix = prefix.into();
        self
    }

    /// Shareable path for a prompt id
    pub fn share_url(&self, id: &str) -> String {
        format!("{}/{}", self.share_prefix.trim_end_matches('/'), id)
    }

    /// Save a prompt under a freshly generated id
    pub async fn save(&self, input: PromptInput, response: String) -> Result<SharedPrompt, ServiceError> {
        let record = self.insert_with_fresh_id(input, response).await?;
        info!("Saved prompt {} ({})", record.id, record.model);
        Ok(self.shared(&record.id))
    }

    /// Fetch a prompt, counting the fetch as a hit
    pub async fn fetch(&self, id: &str) -> Result<PromptRecord, ServiceError> {
        Ok(self.store.get_prompt(id).await?)
    }

    /// Fork `parent_id` into a new prompt with an empty response.
    ///
    /// The parent lookup goes through the same path as [`fetch`](Self::fetch),
    /// so forking counts as a hit on the parent.
    pub async fn fork(&self, parent_id: &str, input: PromptInput) -> Result<SharedPrompt, ServiceError> {
        match self.store.get_prompt(parent_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                return Err(ServiceError::ParentNotFound(parent_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        let record = self.insert_with_fresh_id(input, String::new()).await?;
        let shared = self.shared(&record.id);

        if let Err(e) = self.store.create_fork(&record.id, parent_id).await {
            warn!("Fork {} of {} saved without lineage: {}", record.id, parent_id, e);
            return Err(ServiceError::LineageNotRecorded {
                prompt: shared,
                reason: e.to_string(),
            });
        }

        info!("Forked prompt {} -> {}", parent_id, record.id);
        Ok(shared)
    }

    pub async fn update_response(&self, id: &str, response: &str) -> Result<(), ServiceError> {
        Ok(self.store.update_response(id, response).await?)
    }

    /// Parent of a forked prompt, `None` for originals
    pub async fn parent_of(&self, id: &str) -> Result<Option<String>, ServiceError> {
        let fork = self.store.get_fork(id).await?;
        Ok(fork.map(|f| f.parent_id))
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<PromptRecord>, ServiceError> {
        Ok(self.store.list_recent(limit).await?)
    }

    pub async fn popular(&self, limit: usize) -> Result<Vec<PromptRecord>, ServiceError> {
        Ok(self.store.list_popular(limit).await?)
    }

    async fn insert_with_fresh_id(
        &self,
        input: PromptInput,
        response: String,
    ) -> Result<PromptRecord, ServiceError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let prompt = NewPrompt {
                id: self.ids.generate(),
                system_prompt: input.system_prompt.clone(),
                user_prompt: input.user_prompt.clone(),
                model: input.model.clone(),
                response: response.clone(),
            };

            match self.store.save_prompt(prompt).await {
                Ok(record) => return Ok(record),
                Err(StoreError::DuplicateKey(id)) => {
                    warn!("Prompt id collision on {} (attempt {}/{})", id, attempt, MAX_ID_ATTEMPTS);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Storage(StoreError::StorageUnavailable(format!(
            "no free prompt id after {} attempts",
            MAX_ID_ATTEMPTS
        ))))
    }

    fn shared(&self, id: &str) -> SharedPrompt {
        SharedPrompt {
            id: id.to_string(),
            url: self.share_url(id),
        }
    }
}
