//! Route handlers

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::ApiError;
use super::types::{
    ForkBody, GenerateBody, ModelsResponse, SaveBody, ShareResponse, UpdateResponseBody,
};
use crate::core::AppState;
use crate::db::PromptRecord;
use crate::inference::relay;
use crate::prompt::ServiceError;

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "Sharpie API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Reachability of Ollama and the database
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = if state.db.health_check().await {
        "connected"
    } else {
        "disconnected"
    };

    let status = if database == "connected" { "healthy" } else { "degraded" };
    let body = match state.inference.tags().await {
        Ok(models) => json!({
            "status": status,
            "ollama": "connected",
            "database": database,
            "models": models,
        }),
        Err(e) => json!({
            "status": "degraded",
            "ollama": "disconnected",
            "database": database,
            "error": e.to_string(),
        }),
    };

    Json(body)
}

/// Stream a generation as server-sent events.
///
/// Backend failures after this point are reported in-band as an `error`
/// event; the HTTP status is already committed.
pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Response, ApiError> {
    let request = body.validate(&state.default_model)?;
    info!("Generating with {}", request.model);

    let events = relay(state.inference.clone(), request)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));

    let mut response = Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Ok(response)
}

pub async fn save_prompt(
    State(state): State<AppState>,
    Json(body): Json<SaveBody>,
) -> Result<Json<ShareResponse>, ApiError> {
    let (input, response) = body.into_parts();
    let shared = state.prompts.save(input, response).await?;
    Ok(Json(shared.into()))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromptRecord>, ApiError> {
    Ok(Json(state.prompts.fetch(&id).await?))
}

pub async fn fork_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ForkBody>,
) -> Result<Json<ShareResponse>, ApiError> {
    let input = body.into_input(&id)?;

    match state.prompts.fork(&id, input).await {
        Ok(shared) => Ok(Json(shared.into())),
        Err(ServiceError::LineageNotRecorded { prompt, reason }) => {
            warn!("Returning fork {} without lineage", prompt.id);
            Ok(Json(ShareResponse {
                id: prompt.id,
                url: prompt.url,
                warning: Some(format!("fork saved but lineage not recorded: {}", reason)),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn update_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateResponseBody>,
) -> Result<StatusCode, ApiError> {
    state.prompts.update_response(&id, &body.response).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ApiError> {
    let models = state.inference.list_models().await?;
    Ok(Json(ModelsResponse { models }))
}
