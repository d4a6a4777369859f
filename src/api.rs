//! REST API server for the summary service
//!
//! Exposes the shared history and the summarization flow over HTTP.
//! Integrates with the local frontend through an allow-listed CORS policy.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Settings;
use crate::memory::HistoryStore;
use crate::models::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse, Message};
use crate::summarizer::Summarizer;

/// =============================
/// API State
/// =============================

/// Lifecycle of the summarization gateway as seen by handlers
#[derive(Clone)]
pub enum GatewayState {
    Uninitialized,
    Ready(Arc<dyn Summarizer>),
}

impl GatewayState {
    pub fn ready(summarizer: impl Summarizer + 'static) -> Self {
        Self::Ready(Arc::new(summarizer))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub history: Arc<HistoryStore>,
    pub gateway: GatewayState,
}

impl AppState {
    pub fn new(history: Arc<HistoryStore>, gateway: GatewayState) -> Self {
        Self { history, gateway }
    }
}

/// =============================
/// Error Mapping
/// =============================

#[derive(Debug)]
pub enum ApiError {
    /// Request body failed validation (422)
    Validation(String),
    /// Summarization gateway not ready (503)
    Unavailable(String),
    /// Provider call failed (502)
    Upstream(String),
    /// Body rejected before parsing, status kept from the extractor
    Rejected(StatusCode, String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Rejected(status, msg) => (status, msg),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// =============================
/// History Endpoints
/// =============================

async fn get_history(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.history.snapshot().await)
}

async fn reset_history(State(state): State<AppState>) -> StatusCode {
    state.history.reset().await;
    info!("History cleared");
    StatusCode::NO_CONTENT
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!("Rejected chat request body: {}", rejection);
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                ApiError::Validation(rejection.body_text())
            }
            other => ApiError::Rejected(other.status(), other.body_text()),
        }
    })?;

    let content = req.message.trim();
    if content.is_empty() {
        return Err(ApiError::Validation(
            "message must contain at least 1 character".to_string(),
        ));
    }

    let GatewayState::Ready(summarizer) = &state.gateway else {
        warn!("Chat request received before gateway was ready");
        return Err(ApiError::Unavailable(
            "Summarization gateway not initialized.".to_string(),
        ));
    };

    info!("Received chat request ({} chars)", content.chars().count());

    state.history.append(Message::user(content)).await;

    // History lock is not held while the provider call is in flight
    let summary = summarizer.summarize(&req.message).await.map_err(|e| {
        warn!("Summarization failed: {}", e);
        ApiError::Upstream(format!("Gemini API error: {}", e))
    })?;

    state.history.append(Message::assistant(summary.clone())).await;

    Ok(Json(ChatResponse {
        summary,
        history: state.history.snapshot().await,
    }))
}

/// =============================
/// Router
/// =============================

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            // Wildcards are not allowed together with credentials
            Ok(_) if origin == "*" => {
                warn!("Ignoring wildcard CORS origin");
                None
            }
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/history", get(get_history).delete(reset_history))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: AppState,
    settings: &Settings,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state, &settings.allowed_origins);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", settings.port);
    info!("Local: http://127.0.0.1:{}", settings.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
