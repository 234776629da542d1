//! Owns a [`RenderHost`] on its own task.
//!
//! All mutation of the host goes through [`HostHandle`], so the live
//! resource slot has exactly one writer. The task also runs the periodic
//! release sweep and tears the host down when the session stops.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::channel::RefreshTarget;
use super::host::{HostStats, RenderHost, RenderSurface};
use super::models::{CodePayload, Generation};
use crate::errors::PreviewError;

/// How often retired resources are checked against the release timeout.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

enum HostCommand {
    Apply(CodePayload),
    Refresh,
    Loaded(Generation),
    Stats(oneshot::Sender<HostStats>),
}

/// Cloneable sender side of a running session.
#[derive(Clone)]
pub struct HostHandle {
    tx: mpsc::UnboundedSender<HostCommand>,
}

impl HostHandle {
    pub fn apply(&self, payload: CodePayload) -> Result<(), PreviewError> {
        self.send(HostCommand::Apply(payload))
    }

    pub fn request_refresh(&self) -> Result<(), PreviewError> {
        self.send(HostCommand::Refresh)
    }

    pub fn content_loaded(&self, generation: Generation) -> Result<(), PreviewError> {
        self.send(HostCommand::Loaded(generation))
    }

    pub async fn stats(&self) -> Result<HostStats, PreviewError> {
        let (tx, rx) = oneshot::channel();
        self.send(HostCommand::Stats(tx))?;
        rx.await.map_err(|_| PreviewError::HostStopped)
    }

    fn send(&self, command: HostCommand) -> Result<(), PreviewError> {
        self.tx.send(command).map_err(|_| PreviewError::HostStopped)
    }
}

impl RefreshTarget for HostHandle {
    fn refresh(&self) {
        if let Err(e) = self.request_refresh() {
            debug!(error = %e, "refresh dropped");
        }
    }
}

pub struct PreviewSession {
    handle: HostHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PreviewSession {
    pub fn spawn<S>(host: RenderHost<S>) -> Self
    where
        S: RenderSurface + 'static,
    {
        Self::spawn_with_sweep(host, SWEEP_INTERVAL)
    }

    pub fn spawn_with_sweep<S>(host: RenderHost<S>, sweep_every: Duration) -> Self
    where
        S: RenderSurface + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(host, rx, cancel.clone(), sweep_every));
        Self {
            handle: HostHandle { tx },
            cancel,
            task,
        }
    }

    pub fn handle(&self) -> HostHandle {
        self.handle.clone()
    }

    /// Stop the session and wait until every resource has been released.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "render session ended abnormally");
        }
    }
}

async fn run<S: RenderSurface>(
    mut host: RenderHost<S>,
    mut rx: mpsc::UnboundedReceiver<HostCommand>,
    cancel: CancellationToken,
    sweep_every: Duration,
) {
    let mut sweep = tokio::time::interval(sweep_every);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = rx.recv() => match command {
                Some(HostCommand::Apply(payload)) => {
                    host.apply(payload);
                }
                Some(HostCommand::Refresh) => {
                    host.refresh();
                }
                Some(HostCommand::Loaded(generation)) => host.content_loaded(generation),
                Some(HostCommand::Stats(reply)) => {
                    let _ = reply.send(host.stats());
                }
                None => break,
            },
            _ = sweep.tick() => host.sweep(Instant::now()),
        }
    }

    host.teardown();
}
