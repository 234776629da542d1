//! Push channel to the code-generation coordinator.
//!
//! ## State machine
//!
//! ```text
//!            Dial              Opened
//! Disconnected ──> Connecting ──────> Connected
//!      ^               │                  │
//!      └──── Lost ─────┴────── Lost ──────┘
//! ```
//!
//! Every time the channel reaches `Connected` it sends a fresh
//! `subscribe_preview` for its project; the coordinator is not assumed to
//! remember subscriptions across connections. Entering `Disconnected` while
//! the channel is active arms the single-slot [`RetryPolicy`]; at most one
//! reconnect timer exists at any time.
//!
//! The channel is owned by an [`UpdateChannel`] value. Dropping it, or
//! awaiting [`UpdateChannel::shutdown`], cancels the pending timer and
//! closes the connection; no refresh is delivered afterwards.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::models::ProjectId;
use crate::errors::ChannelError;

/// Default wait between losing the connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Upper bound on a single connection attempt, handshake included.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on waiting for a close handshake during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Receiver of "content changed" notifications.
pub trait RefreshTarget: Send + Sync + 'static {
    fn refresh(&self);
}

// ── State machine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Inputs that move the connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    Dial,
    Opened,
    Lost,
}

impl ConnectionState {
    /// Next state for `event`, or `None` if the transition is not allowed.
    pub fn on(self, event: ChannelEvent) -> Option<ConnectionState> {
        use ChannelEvent::*;
        use ConnectionState::*;
        match (self, event) {
            (Disconnected, Dial) => Some(Connecting),
            (Connecting, Opened) => Some(Connected),
            (Connecting, Lost) | (Connected, Lost) => Some(Disconnected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

// ── Wire protocol ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SubscribePreview {
        #[serde(rename = "projectId")]
        project_id: ProjectId,
    },
}

/// Messages pushed by the coordinator. Anything else is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorMessage {
    PreviewUpdated {
        #[serde(rename = "projectId")]
        project_id: ProjectId,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Refresh,
    Ignore,
}

/// Route a coordinator message for a channel subscribed to `subscribed`.
pub fn dispatch(subscribed: &ProjectId, message: &CoordinatorMessage) -> Dispatch {
    match message {
        CoordinatorMessage::PreviewUpdated { project_id } if project_id == subscribed => {
            Dispatch::Refresh
        }
        CoordinatorMessage::PreviewUpdated { .. } | CoordinatorMessage::Unknown => Dispatch::Ignore,
    }
}

// ── Transport seam ───────────────────────────────────────────────────

/// One established connection to the coordinator.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, text: String) -> Result<(), ChannelError>;

    /// Next text frame; `None` once the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<String, ChannelError>>;

    async fn close(&mut self);
}

/// Dials the coordinator. Real implementation: [`WsConnector`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Transport>, ChannelError>;
}

/// WebSocket connector for plain `ws://` coordinator URLs.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ChannelError> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Connect {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(Box::new(WsTransport { stream }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                // Pings are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => return Some(Err(ChannelError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

// ── Retry policy ─────────────────────────────────────────────────────

/// Single-slot reconnect timer.
pub struct RetryPolicy {
    delay: Duration,
    pending: Option<Pin<Box<Sleep>>>,
}

impl RetryPolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer. Returns `false` if an attempt is already pending.
    pub fn schedule(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(Box::pin(tokio::time::sleep(self.delay)));
        true
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolves when the armed timer fires; never resolves if nothing is armed.
    pub async fn fired(&mut self) {
        match self.pending.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.pending = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

// ── Channel ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub project_id: ProjectId,
    pub reconnect_delay: Duration,
}

impl ChannelConfig {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Scope-bound handle to a running push channel.
pub struct UpdateChannel {
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl UpdateChannel {
    /// Start connecting in the background. Must be called inside a tokio runtime.
    pub fn spawn<C, R>(config: ChannelConfig, connector: C, target: R) -> Self
    where
        C: Connector + 'static,
        R: RefreshTarget,
    {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let worker = Worker {
            connector,
            target,
            project_id: config.project_id,
            retry: RetryPolicy::new(config.reconnect_delay),
            state: state_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());
        Self {
            state: state_rx,
            cancel,
            task: Some(task),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Cancel the reconnect timer, close the connection and wait for the
    /// channel task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "preview channel task ended abnormally");
            }
        }
    }
}

impl Drop for UpdateChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum SessionEnd {
    Closed,
    Cancelled,
}

struct Worker<C, R> {
    connector: C,
    target: R,
    project_id: ProjectId,
    retry: RetryPolicy,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl<C: Connector, R: RefreshTarget> Worker<C, R> {
    async fn run(mut self) {
        loop {
            self.transition(ChannelEvent::Dial);
            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = tokio::time::timeout(CONNECT_TIMEOUT, self.connector.connect()) => {
                    result.unwrap_or(Err(ChannelError::ConnectTimeout(CONNECT_TIMEOUT)))
                }
            };

            match connected {
                Ok(transport) => {
                    self.retry.cancel();
                    self.transition(ChannelEvent::Opened);
                    match self.serve(transport).await {
                        Ok(SessionEnd::Cancelled) => break,
                        Ok(SessionEnd::Closed) => info!("coordinator closed the preview channel"),
                        Err(e) => warn!(error = %e, "preview channel dropped"),
                    }
                }
                Err(e) => warn!(error = %e, "preview channel connect failed"),
            }

            self.transition(ChannelEvent::Lost);
            if self.cancel.is_cancelled() {
                break;
            }
            if self.retry.schedule() {
                info!(delay_ms = self.retry.delay().as_millis() as u64, "reconnect scheduled");
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = self.retry.fired() => {}
            }
        }

        self.retry.cancel();
        self.transition(ChannelEvent::Lost);
        debug!("preview channel stopped");
    }

    async fn serve(&self, mut transport: Box<dyn Transport>) -> Result<SessionEnd, ChannelError> {
        let subscribe = serde_json::to_string(&ClientMessage::SubscribePreview {
            project_id: self.project_id.clone(),
        })?;
        transport.send(subscribe).await?;
        info!(project_id = %self.project_id, "subscribed to preview updates");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await;
                    return Ok(SessionEnd::Cancelled);
                }
                frame = transport.recv() => match frame {
                    None => return Ok(SessionEnd::Closed),
                    Some(Err(e)) => return Err(e),
                    Some(Ok(text)) => self.handle_text(&text),
                }
            }
        }
    }

    fn handle_text(&self, text: &str) {
        let message: CoordinatorMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "ignoring malformed coordinator message");
                return;
            }
        };

        match dispatch(&self.project_id, &message) {
            Dispatch::Refresh if !self.cancel.is_cancelled() => {
                debug!(project_id = %self.project_id, "preview update received");
                self.target.refresh();
            }
            Dispatch::Refresh => {}
            Dispatch::Ignore => debug!(?message, "coordinator message ignored"),
        }
    }

    fn transition(&self, event: ChannelEvent) {
        self.state.send_if_modified(|current| match current.on(event) {
            Some(next) => {
                debug!(from = current.as_str(), to = next.as_str(), "preview channel state");
                *current = next;
                true
            }
            None => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    const DELAY: Duration = Duration::from_secs(3);

    #[derive(Clone, Default)]
    struct CountingTarget(Arc<AtomicUsize>);

    impl CountingTarget {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl RefreshTarget for CountingTarget {
        fn refresh(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockTransport {
        incoming: mpsc::UnboundedReceiver<String>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, text: String) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
            self.incoming.recv().await.map(Ok)
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Test-side view of one scripted connection.
    struct Probe {
        incoming: Option<mpsc::UnboundedSender<String>>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl Probe {
        fn push(&self, text: &str) -> bool {
            self.incoming
                .as_ref()
                .map(|tx| tx.send(text.to_string()).is_ok())
                .unwrap_or(false)
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[derive(Clone, Default)]
    struct MockConnector {
        scripted: Arc<Mutex<VecDeque<MockTransport>>>,
        attempts: Arc<AtomicUsize>,
        stalled: Arc<AtomicBool>,
    }

    impl MockConnector {
        fn script(&self, keep_open: bool) -> Probe {
            let (tx, rx) = mpsc::unbounded_channel();
            let sent = Arc::new(Mutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            self.scripted.lock().unwrap().push_back(MockTransport {
                incoming: rx,
                sent: sent.clone(),
                closed: closed.clone(),
            });
            Probe {
                incoming: keep_open.then_some(tx),
                sent,
                closed,
            }
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self) -> Result<Box<dyn Transport>, ChannelError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.stalled.load(Ordering::SeqCst) {
                // Peer accepted TCP but never completes the handshake.
                std::future::pending::<()>().await;
            }
            match self.scripted.lock().unwrap().pop_front() {
                Some(transport) => Ok(Box::new(transport)),
                None => Err(ChannelError::Connect {
                    url: "mock://coordinator".into(),
                    message: "refused".into(),
                }),
            }
        }
    }

    fn config(project: &str) -> ChannelConfig {
        ChannelConfig {
            project_id: ProjectId::new(project),
            reconnect_delay: DELAY,
        }
    }

    /// Let the channel task run until it blocks.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[test]
    fn test_state_machine_transitions() {
        use ChannelEvent::*;
        use ConnectionState::*;
        assert_eq!(Disconnected.on(Dial), Some(Connecting));
        assert_eq!(Connecting.on(Opened), Some(Connected));
        assert_eq!(Connecting.on(Lost), Some(Disconnected));
        assert_eq!(Connected.on(Lost), Some(Disconnected));
        assert_eq!(Disconnected.on(Opened), None);
        assert_eq!(Disconnected.on(Lost), None);
        assert_eq!(Connected.on(Dial), None);
        assert_eq!(Connecting.on(Dial), None);
    }

    #[test]
    fn test_subscribe_message_shape() {
        let msg = ClientMessage::SubscribePreview {
            project_id: ProjectId::new("42"),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"subscribe_preview","projectId":"42"}"#
        );
    }

    #[test]
    fn test_dispatch_table() {
        let subscribed = ProjectId::new("42");
        let matching: CoordinatorMessage =
            serde_json::from_str(r#"{"type":"preview_updated","projectId":42,"files":{}}"#).unwrap();
        let other: CoordinatorMessage =
            serde_json::from_str(r#"{"type":"preview_updated","projectId":"7"}"#).unwrap();
        let unknown: CoordinatorMessage =
            serde_json::from_str(r#"{"type":"build_log","line":"ok"}"#).unwrap();

        assert_eq!(dispatch(&subscribed, &matching), Dispatch::Refresh);
        assert_eq!(dispatch(&subscribed, &other), Dispatch::Ignore);
        assert_eq!(dispatch(&subscribed, &unknown), Dispatch::Ignore);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_holds_one_timer() {
        let mut retry = RetryPolicy::new(DELAY);
        assert!(!retry.is_pending());
        assert!(retry.schedule());
        assert!(!retry.schedule());
        assert!(retry.is_pending());

        let started = tokio::time::Instant::now();
        retry.fired().await;
        assert!(started.elapsed() >= DELAY);
        assert!(!retry.is_pending());

        assert!(retry.schedule());
        retry.cancel();
        assert!(!retry.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribes_on_connect() {
        let connector = MockConnector::default();
        let probe = connector.script(true);
        let channel = UpdateChannel::spawn(config("42"), connector.clone(), CountingTarget::default());
        settle().await;

        assert_eq!(channel.state(), ConnectionState::Connected);
        assert_eq!(
            probe.sent(),
            vec![r#"{"type":"subscribe_preview","projectId":"42"}"#.to_string()]
        );
        channel.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_notification_refreshes_once() {
        let connector = MockConnector::default();
        let probe = connector.script(true);
        let target = CountingTarget::default();
        let channel = UpdateChannel::spawn(config("42"), connector, target.clone());
        settle().await;

        assert!(probe.push(r#"{"type":"preview_updated","projectId":42}"#));
        settle().await;
        assert_eq!(target.count(), 1);

        assert!(probe.push(r#"{"type":"preview_updated","projectId":7}"#));
        settle().await;
        assert_eq!(target.count(), 1);

        // No coalescing: each matching notification refreshes.
        assert!(probe.push(r#"{"type":"preview_updated","projectId":"42"}"#));
        assert!(probe.push(r#"{"type":"preview_updated","projectId":"42"}"#));
        settle().await;
        assert_eq!(target.count(), 3);

        channel.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_messages_are_ignored() {
        let connector = MockConnector::default();
        let probe = connector.script(true);
        let target = CountingTarget::default();
        let channel = UpdateChannel::spawn(config("42"), connector, target.clone());
        settle().await;

        assert!(probe.push("not json"));
        assert!(probe.push(r#"{"type":"build_log"}"#));
        assert!(probe.push(r#"{"projectId":42}"#));
        settle().await;

        assert_eq!(target.count(), 0);
        assert_eq!(channel.state(), ConnectionState::Connected);
        channel.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_disconnect_schedules_one_reconnect() {
        let connector = MockConnector::default();
        let _probe = connector.script(false);
        let channel = UpdateChannel::spawn(config("42"), connector.clone(), CountingTarget::default());
        settle().await;

        assert_eq!(connector.attempts(), 1);
        assert_eq!(channel.state(), ConnectionState::Disconnected);

        tokio::time::sleep(DELAY - Duration::from_millis(10)).await;
        assert_eq!(connector.attempts(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(connector.attempts(), 2);

        // The failed second attempt arms exactly one further timer.
        tokio::time::sleep(DELAY - Duration::from_millis(20)).await;
        assert_eq!(connector.attempts(), 2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(connector.attempts(), 3);

        channel.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_handshake_times_out_into_retry() {
        let connector = MockConnector::default();
        connector.stalled.store(true, Ordering::SeqCst);
        let channel = UpdateChannel::spawn(config("42"), connector.clone(), CountingTarget::default());
        settle().await;
        assert_eq!(channel.state(), ConnectionState::Connecting);

        tokio::time::sleep(CONNECT_TIMEOUT).await;
        assert_eq!(channel.state(), ConnectionState::Disconnected);
        assert_eq!(connector.attempts(), 1);

        // The fixed-delay policy takes over from here.
        tokio::time::sleep(DELAY).await;
        assert_eq!(connector.attempts(), 2);
        assert_eq!(channel.state(), ConnectionState::Connecting);

        // Shutdown abandons the stalled attempt and arms nothing further.
        channel.shutdown().await;
        tokio::time::sleep(CONNECT_TIMEOUT + DELAY * 2).await;
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_reconnect() {
        let connector = MockConnector::default();
        let _probe = connector.script(false);
        let target = CountingTarget::default();
        let channel = UpdateChannel::spawn(config("42"), connector.clone(), target.clone());
        settle().await;
        assert_eq!(connector.attempts(), 1);

        let state = channel.watch_state();
        channel.shutdown().await;

        tokio::time::sleep(DELAY * 5).await;
        assert_eq!(connector.attempts(), 1);
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        assert_eq!(target.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_reconnect() {
        let connector = MockConnector::default();
        let _probe = connector.script(false);
        let channel = UpdateChannel::spawn(config("42"), connector.clone(), CountingTarget::default());
        settle().await;

        drop(channel);
        tokio::time::sleep(DELAY * 5).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribes_after_reconnect() {
        let connector = MockConnector::default();
        let first = connector.script(false);
        let second = connector.script(true);
        let target = CountingTarget::default();
        let channel = UpdateChannel::spawn(config("42"), connector.clone(), target.clone());
        settle().await;
        assert_eq!(channel.state(), ConnectionState::Disconnected);

        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
        assert_eq!(channel.state(), ConnectionState::Connected);
        assert_eq!(connector.attempts(), 2);
        assert_eq!(first.sent().len(), 1);
        assert_eq!(second.sent().len(), 1);
        assert!(second.sent()[0].contains("subscribe_preview"));

        assert!(second.push(r#"{"type":"preview_updated","projectId":"42"}"#));
        settle().await;
        assert_eq!(target.count(), 1);
        channel.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_refresh_after_shutdown() {
        let connector = MockConnector::default();
        let probe = connector.script(true);
        let target = CountingTarget::default();
        let channel = UpdateChannel::spawn(config("42"), connector, target.clone());
        settle().await;

        channel.shutdown().await;
        assert!(probe.closed.load(Ordering::SeqCst));

        // The connection is gone; nothing can reach the target any more.
        assert!(!probe.push(r#"{"type":"preview_updated","projectId":"42"}"#));
        settle().await;
        assert_eq!(target.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_watch_observes_transitions() {
        let connector = MockConnector::default();
        let _probe = connector.script(true);
        let channel = UpdateChannel::spawn(config("1"), connector, CountingTarget::default());
        let mut state = channel.watch_state();

        state
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .unwrap();
        channel.shutdown().await;
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    }
}
