//! Request and response bodies

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::inference::GenerateRequest;
use crate::prompt::{PromptInput, SharedPrompt};

pub const MAX_PROMPT_CHARS: usize = 5000;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateBody {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl GenerateBody {
    /// Check prompt lengths and fill in the default model
    pub fn validate(self, default_model: &str) -> Result<GenerateRequest, ApiError> {
        check_prompt("system_prompt", &self.system_prompt)?;
        check_prompt("user_prompt", &self.user_prompt)?;

        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model.to_string());

        Ok(GenerateRequest {
            system_prompt: self.system_prompt,
            user_prompt: self.user_prompt,
            model,
        })
    }
}

fn check_prompt(field: &str, value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    if len > MAX_PROMPT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, MAX_PROMPT_CHARS
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveBody {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    #[serde(default)]
    pub response: Option<String>,
}

impl SaveBody {
    pub fn into_parts(self) -> (PromptInput, String) {
        (
            PromptInput {
                system_prompt: self.system_prompt,
                user_prompt: self.user_prompt,
                model: self.model,
            },
            self.response.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForkBody {
    /// Must match the path id when present
    #[serde(default)]
    pub parent_id: Option<String>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
}

impl ForkBody {
    pub fn into_input(self, path_id: &str) -> Result<PromptInput, ApiError> {
        if let Some(parent_id) = self.parent_id.as_deref() {
            if parent_id != path_id {
                return Err(ApiError::BadRequest(format!(
                    "parent_id {} does not match prompt {}",
                    parent_id, path_id
                )));
            }
        }

        Ok(PromptInput {
            system_prompt: self.system_prompt,
            user_prompt: self.user_prompt,
            model: self.model,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateResponseBody {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareResponse {
    pub id: String,
    pub url: String,
    /// Set when the prompt was stored but a follow-up step failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<SharedPrompt> for ShareResponse {
    fn from(shared: SharedPrompt) -> Self {
        Self {
            id: shared.id,
            url: shared.url,
            warning: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}
