//! REST API Server for the Query Orchestrator
//!
//! Exposes the orchestration pipeline via HTTP endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::agent::Orchestrator;
use crate::models::{FinalResponse, OutputFormat, AUDIO_CONTENT_TYPE};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub output_format: Option<String>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

fn status_for(response: &FinalResponse) -> StatusCode {
    match response {
        FinalResponse::Failed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    }
}

fn blank_query() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "Query must not be empty" })),
    )
        .into_response()
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Main Orchestration Endpoint
/// =============================

async fn run_orchestration(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> Response {
    if req.query.trim().is_empty() {
        return blank_query();
    }

    let output_format = OutputFormat::from_request(req.output_format.as_deref());
    info!(%output_format, "Received orchestration request: {}", req.query);

    let response = state.orchestrator.run(&req.query, output_format).await;
    (status_for(&response), Json(response)).into_response()
}

/// =============================
/// Audio Endpoint
/// =============================

/// Voice mode that streams the audio itself on success.
async fn run_audio(State(state): State<ApiState>, Json(req): Json<QueryRequest>) -> Response {
    if req.query.trim().is_empty() {
        return blank_query();
    }

    info!("Received audio request: {}", req.query);

    match state.orchestrator.run(&req.query, OutputFormat::Voice).await {
        FinalResponse::Voice(voice) if voice.error.is_none() => {
            let content_type = voice
                .content_type
                .unwrap_or_else(|| AUDIO_CONTENT_TYPE.to_string());
            let audio = voice.voice_response_bytes.unwrap_or_default();
            ([(header::CONTENT_TYPE, content_type)], audio).into_response()
        }
        FinalResponse::Voice(voice) => {
            let status = voice
                .status_code
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(FinalResponse::Voice(voice))).into_response()
        }
        other => (status_for(&other), Json(other)).into_response(),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/orchestrate", post(run_orchestration))
        .route("/api/orchestrate/audio", post(run_audio))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> crate::Result<()> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
