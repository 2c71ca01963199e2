//! Ollama HTTP API client

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const TAGS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// Transport failure: refused, reset, timed out.
    #[error("Ollama request failed: {0}")]
    Unreachable(String),

    /// Ollama answered with a non-success status.
    #[error("Ollama returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid Ollama response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Unreachable(format!("timed out: {}", err))
        } else if err.is_decode() {
            InferenceError::InvalidResponse(err.to_string())
        } else {
            InferenceError::Unreachable(err.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct GeneratePayload<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Ollama API client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
}

impl InferenceClient {
    /// Create a client whose requests, body included, are bounded by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Unreachable(format!("HTTP client setup: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Start a streaming generation. The returned response body is
    /// newline-delimited JSON.
    pub async fn start_generation(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<reqwest::Response, InferenceError> {
        let url = format!("{}/api/generate", self.base_url);
        let payload = GeneratePayload {
            model,
            prompt,
            stream: true,
        };

        debug!("Starting Ollama generation with model {}", model);

        let response = self.client.post(&url).json(&payload).send().await?;
        ensure_success(response).await
    }

    /// Raw `/api/tags` document
    pub async fn tags(&self) -> Result<serde_json::Value, InferenceError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).timeout(TAGS_TIMEOUT).send().await?;
        let response = ensure_success(response).await?;

        Ok(response.json().await?)
    }

    /// Names of the models Ollama has available
    pub async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let tags: TagsResponse = serde_json::from_value(self.tags().await?)
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        match self.tags().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    // Ollama reports failures as {"error": "..."}
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);

    Err(InferenceError::Backend {
        status: status.as_u16(),
        message,
    })
}
