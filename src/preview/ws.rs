use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::channel::ConnectionState;
use super::models::Generation;
use super::viewport::ViewportPreset;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── Shell event types ────────────────────────────────────────────────

/// Events pushed to the preview shell page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PreviewEvent {
    Rendered {
        generation: Generation,
    },
    ConnectionChanged {
        state: ConnectionState,
    },
    ViewportChanged {
        preset: ViewportPreset,
        width: u32,
        height: u32,
    },
}

// ── WebSocket handler ────────────────────────────────────────────────

/// Source of the events that bring a shell up to date.
///
/// Broadcasts are fire-and-forget, so a shell that was disconnected or fell
/// behind would otherwise keep showing a superseded generation.
pub trait ShellSnapshot: Send + Sync + 'static {
    fn snapshot(&self) -> Vec<PreviewEvent>;
}

pub async fn ws_handler<S: ShellSnapshot>(
    ws: WebSocketUpgrade,
    tx: broadcast::Sender<String>,
    source: Arc<S>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, tx, source))
}

async fn handle_socket<S: ShellSnapshot>(
    socket: WebSocket,
    tx: broadcast::Sender<String>,
    source: Arc<S>,
) {
    let (sender, receiver) = socket.split();
    // Subscribe before taking the snapshot so nothing falls in between.
    let rx = tx.subscribe();
    debug!("shell connected");
    run_socket_loop(sender, receiver, rx, source.as_ref()).await;
    debug!("shell disconnected");
}

/// Send the current state as individual events.
async fn send_snapshot<S: ShellSnapshot>(
    sender: &mut SplitSink<WebSocket, Message>,
    source: &S,
) -> bool {
    for event in source.snapshot() {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize preview event");
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            return false;
        }
    }
    true
}

/// Forward shell events with ping/pong keepalive.
///
/// The shell gets a snapshot on connect and again after lagging, then the
/// live event stream. If no Pong is received within [`PONG_TIMEOUT`] after
/// a Ping is sent, the connection is considered dead and the loop exits.
async fn run_socket_loop<S: ShellSnapshot>(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<String>,
    source: &S,
) {
    if !send_snapshot(&mut sender, source).await {
        return;
    }

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // First tick completes immediately.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    debug!("shell missed pong deadline");
                    break;
                }
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Dropped events may include the latest Rendered.
                        debug!(skipped, "shell lagged behind event stream; resyncing");
                        if !send_snapshot(&mut sender, source).await {
                            break;
                        }
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

// ── Broadcast helper ─────────────────────────────────────────────────

/// Serialize and broadcast an event to every connected shell.
/// Returns silently even if no shell is connected.
pub fn broadcast_event(tx: &broadcast::Sender<String>, event: &PreviewEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => {
            warn!(error = %e, "failed to serialize preview event");
        }
    }
}
