//! HTTP API
//!
//! - `POST /api/generate`: streamed generation (server-sent events)
//! - `/api/prompts`: save, fetch, fork and update saved prompts
//! - `GET /api/models`: models Ollama has available
//! - `GET /health`: Ollama and database reachability

pub mod error;
pub mod routes;
pub mod types;

use std::net::SocketAddr;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::core::AppState;

pub use error::ApiError;

/// Create the application router
pub fn create_app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/api/generate", post(routes::generate))
        .route("/api/prompts", post(routes::save_prompt))
        .route("/api/prompts/:id", get(routes::get_prompt))
        .route("/api/prompts/:id/fork", post(routes::fork_prompt))
        .route("/api/prompts/:id/response", put(routes::update_response))
        .route("/api/models", get(routes::list_models))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// CORS policy for the configured origins; `*` allows any origin
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Start the HTTP server
pub async fn serve(addr: SocketAddr, state: AppState, allowed_origins: &[String]) -> Result<()> {
    let app = create_app(state, allowed_origins);

    let listener = TcpListener::bind(addr).await?;
    info!("Sharpie API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
