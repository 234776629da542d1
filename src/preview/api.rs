use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use super::channel::ConnectionState;
use super::isolation::document_headers;
use super::models::{Generation, PayloadRequest, ProjectId};
use super::session::HostHandle;
use super::surface::DocumentTable;
use super::viewport::ViewportPreset;
use super::ws::{PreviewEvent, ShellSnapshot, broadcast_event};
use crate::errors::PreviewError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub host: HostHandle,
    pub documents: DocumentTable,
    pub events: broadcast::Sender<String>,
    pub connection: watch::Receiver<ConnectionState>,
    pub viewport: Mutex<ViewportPreset>,
    pub project_id: Option<ProjectId>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    fn viewport(&self) -> ViewportPreset {
        *self.viewport.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ShellSnapshot for AppState {
    fn snapshot(&self) -> Vec<PreviewEvent> {
        let viewport = ViewportResponse::from(self.viewport());
        let mut events = vec![
            PreviewEvent::ConnectionChanged {
                state: *self.connection.borrow(),
            },
            PreviewEvent::ViewportChanged {
                preset: viewport.preset,
                width: viewport.width,
                height: viewport.height,
            },
        ];
        if let Some(generation) = self.documents.live() {
            events.push(PreviewEvent::Rendered { generation });
        }
        events
    }
}

// ── Request / response types ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct ViewportRequest {
    pub preset: ViewportPreset,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewportResponse {
    pub preset: ViewportPreset,
    pub width: u32,
    pub height: u32,
}

impl From<ViewportPreset> for ViewportResponse {
    fn from(preset: ViewportPreset) -> Self {
        let dims = preset.dimensions();
        Self {
            preset,
            width: dims.width,
            height: dims.height,
        }
    }
}

#[derive(Serialize)]
pub struct ApplyResponse {
    pub applied: bool,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub live_generation: Option<Generation>,
    pub created: u64,
    pub released: u64,
    pub pending_release: usize,
    pub connection: ConnectionState,
    pub project_id: Option<ProjectId>,
    pub viewport: ViewportResponse,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<PreviewError> for ApiError {
    fn from(err: PreviewError) -> Self {
        match err {
            PreviewError::HostStopped => ApiError::Unavailable(err.to_string()),
            PreviewError::UnknownGeneration { .. } => ApiError::NotFound(err.to_string()),
            PreviewError::InvalidPayload(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/payload", post(apply_payload))
        .route("/api/refresh", post(refresh))
        .route("/api/status", get(status))
        .route("/api/viewport", get(get_viewport).put(set_viewport))
        .route("/preview/{generation}", get(serve_document))
        .route("/preview/{generation}/loaded", post(content_loaded))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn apply_payload(
    State(state): State<SharedState>,
    Json(req): Json<PayloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = req.into_payload();
    if !payload.is_renderable() {
        debug!("payload without markup; keeping current render");
        return Ok((StatusCode::OK, Json(ApplyResponse { applied: false })));
    }
    state.host.apply(payload)?;
    Ok((StatusCode::ACCEPTED, Json(ApplyResponse { applied: true })))
}

async fn refresh(State(state): State<SharedState>) -> Result<StatusCode, ApiError> {
    state.host.request_refresh()?;
    Ok(StatusCode::ACCEPTED)
}

async fn status(State(state): State<SharedState>) -> Result<Json<StatusResponse>, ApiError> {
    let stats = state.host.stats().await?;
    Ok(Json(StatusResponse {
        live_generation: stats.live,
        created: stats.created,
        released: stats.released,
        pending_release: stats.pending_release,
        connection: *state.connection.borrow(),
        project_id: state.project_id.clone(),
        viewport: state.viewport().into(),
    }))
}

async fn get_viewport(State(state): State<SharedState>) -> Json<ViewportResponse> {
    Json(state.viewport().into())
}

/// Resizes the container only; the rendered document is left untouched.
async fn set_viewport(
    State(state): State<SharedState>,
    Json(req): Json<ViewportRequest>,
) -> Json<ViewportResponse> {
    *state.viewport.lock().unwrap_or_else(PoisonError::into_inner) = req.preset;
    let response = ViewportResponse::from(req.preset);
    broadcast_event(
        &state.events,
        &PreviewEvent::ViewportChanged {
            preset: response.preset,
            width: response.width,
            height: response.height,
        },
    );
    Json(response)
}

async fn serve_document(
    State(state): State<SharedState>,
    Path(generation): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let generation = Generation(generation);
    let document = state
        .documents
        .get(generation)
        .ok_or(PreviewError::UnknownGeneration { generation })?;
    Ok((document_headers(), document.to_string()))
}

async fn content_loaded(
    State(state): State<SharedState>,
    Path(generation): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.host.content_loaded(Generation(generation))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health_check() -> &'static str {
    "ok"
}
