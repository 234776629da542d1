use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::get,
};
use tokio::sync::{broadcast, watch};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::api::{self, AppState};
use super::channel::{
    ChannelConfig, ConnectionState, DEFAULT_RECONNECT_DELAY, UpdateChannel, WsConnector,
};
use super::embedded::Assets;
use super::host::{DEFAULT_RELEASE_TIMEOUT, RenderHost};
use super::models::ProjectId;
use super::session::PreviewSession;
use super::surface::ServedSurface;
use super::viewport::ViewportPreset;
use super::ws::{self, PreviewEvent, broadcast_event};

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub dev_mode: bool,
    pub coordinator_url: Option<String>,
    pub project_id: Option<ProjectId>,
    pub reconnect_delay: Duration,
    pub release_timeout: Duration,
    pub viewport: ViewportPreset,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3141,
            dev_mode: false,
            coordinator_url: None,
            project_id: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
            viewport: ViewportPreset::Desktop,
        }
    }
}

/// Build the full application router with API, shell events, and shell assets.
pub fn build_router(state: Arc<AppState>) -> Router {
    let events = state.events.clone();
    let source = state.clone();

    api::api_router()
        .route(
            "/ws",
            get(move |ws_upgrade| ws::ws_handler(ws_upgrade, events, source)),
        )
        .fallback(static_handler)
        .with_state(state)
}

/// Serve embedded shell files, falling back to the shell page itself.
async fn static_handler(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty() {
        if let Some(content) = Assets::get(path) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            return (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response();
        }
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).to_string()).into_response(),
        None => (StatusCode::NOT_FOUND, "Preview shell not found.").into_response(),
    }
}

/// Push connection-state changes to connected shells.
async fn forward_connection_state(
    mut state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<String>,
) {
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        broadcast_event(&events, &PreviewEvent::ConnectionChanged { state: current });
    }
}

/// Start the preview server and, when configured, the coordinator channel.
///
/// Runs until Ctrl+C. On the way out the channel is shut down before the
/// render session, so no refresh can reach a host that is tearing down.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let (events, _rx) = broadcast::channel::<String>(256);
    let surface = ServedSurface::new(events.clone());
    let documents = surface.table();
    let session = PreviewSession::spawn(RenderHost::with_release_timeout(
        surface,
        config.release_timeout,
    ));

    let channel = match (&config.coordinator_url, &config.project_id) {
        (Some(url), Some(project_id)) => {
            info!(coordinator = %url, project_id = %project_id, "starting preview channel");
            Some(UpdateChannel::spawn(
                ChannelConfig {
                    project_id: project_id.clone(),
                    reconnect_delay: config.reconnect_delay,
                },
                WsConnector::new(url.clone()),
                session.handle(),
            ))
        }
        _ => {
            info!("no coordinator configured; previews update only through /api/payload");
            None
        }
    };

    let connection = match &channel {
        Some(channel) => channel.watch_state(),
        None => watch::channel(ConnectionState::Disconnected).1,
    };
    let forwarder = tokio::spawn(forward_connection_state(
        connection.clone(),
        events.clone(),
    ));

    let state = Arc::new(AppState {
        host: session.handle(),
        documents,
        events,
        connection,
        viewport: Mutex::new(config.viewport),
        project_id: config.project_id.clone(),
    });

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let served = serve(app, &config).await;

    if let Some(channel) = channel {
        channel.shutdown().await;
    }
    forwarder.abort();
    session.shutdown().await;
    info!("preview server shut down");
    served
}

async fn serve(app: Router, config: &ServerConfig) -> Result<()> {
    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    println!(
        "{} running at http://{}",
        console::style("Live preview").bold().cyan(),
        local_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
