//! Render host: owns the single live render resource and retires old ones.
//!
//! Every `apply` mints a [`RenderResource`] with a fresh [`Generation`],
//! mounts it on the [`RenderSurface`], and retires the previously live
//! resource. Retired resources are released when the surface reports that
//! the *current* generation has loaded. A load signal carrying a stale
//! generation only ever releases that stale resource, so a slow earlier
//! document can never blank a newer one.
//!
//! Two backstops keep resources from being held forever when a load signal
//! never arrives: the next `apply` releases everything retired before it,
//! and [`RenderHost::sweep`] releases retirees older than the release
//! timeout.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use super::assembler::assemble;
use super::models::{CodePayload, Generation};

/// Default time a retired resource may wait for a load signal.
pub const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Displayable content tagged with the generation that produced it.
#[derive(Debug, Clone)]
pub struct RenderResource {
    pub generation: Generation,
    pub document: Arc<str>,
}

/// The isolated surface documents are displayed on.
///
/// Implementations hold whatever backs a resource (a served document, a
/// buffer, a handle in a child process) between `mount` and `release`.
/// The host guarantees `release` is called at most once per generation.
pub trait RenderSurface: Send {
    /// Make `resource` the visible content.
    fn mount(&mut self, resource: &RenderResource);

    /// Drop everything held for `generation`.
    fn release(&mut self, generation: Generation);
}

/// Counters describing the host's resource bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub live: Option<Generation>,
    pub created: u64,
    pub released: u64,
    pub pending_release: usize,
    pub torn_down: bool,
}

pub struct RenderHost<S: RenderSurface> {
    surface: S,
    last_generation: Generation,
    live: Option<Generation>,
    retired: BTreeMap<Generation, Instant>,
    last_payload: Option<CodePayload>,
    release_timeout: Duration,
    created: u64,
    released: u64,
    torn_down: bool,
}

impl<S: RenderSurface> RenderHost<S> {
    pub fn new(surface: S) -> Self {
        Self::with_release_timeout(surface, DEFAULT_RELEASE_TIMEOUT)
    }

    pub fn with_release_timeout(surface: S, release_timeout: Duration) -> Self {
        Self {
            surface,
            last_generation: Generation(0),
            live: None,
            retired: BTreeMap::new(),
            last_payload: None,
            release_timeout,
            created: 0,
            released: 0,
            torn_down: false,
        }
    }

    /// Assemble and display `payload`, retiring the previously live resource.
    ///
    /// Returns the new live generation, or `None` when nothing changed
    /// (empty markup, or the host has been torn down).
    pub fn apply(&mut self, payload: CodePayload) -> Option<Generation> {
        if self.torn_down {
            debug!("apply after teardown ignored");
            return None;
        }
        if !payload.is_renderable() {
            debug!(live = ?self.live, "payload without markup; keeping current render");
            return None;
        }

        let document = assemble(&payload);

        // Anything still waiting from an earlier apply has had its chance.
        self.release_retired();

        let generation = self.last_generation.next();
        self.last_generation = generation;
        let resource = RenderResource {
            generation,
            document: Arc::from(document.into_string()),
        };
        self.surface.mount(&resource);
        self.created += 1;

        if let Some(previous) = self.live.replace(generation) {
            self.retired.insert(previous, Instant::now());
        }
        self.last_payload = Some(payload);

        debug!(%generation, bytes = resource.document.len(), "render resource mounted");
        Some(generation)
    }

    /// Re-apply the most recently applied payload.
    pub fn refresh(&mut self) -> Option<Generation> {
        let payload = self.last_payload.clone()?;
        self.apply(payload)
    }

    /// Load-completion signal for `generation`.
    pub fn content_loaded(&mut self, generation: Generation) {
        if self.torn_down {
            return;
        }
        if self.live == Some(generation) {
            self.release_retired();
        } else if self.retired.remove(&generation).is_some() {
            debug!(%generation, live = ?self.live, "stale load signal; releasing only the stale resource");
            self.release_one(generation);
        } else {
            debug!(%generation, "load signal for a resource no longer held");
        }
    }

    /// Release retired resources that have waited longer than the release timeout.
    pub fn sweep(&mut self, now: Instant) {
        let expired: Vec<Generation> = self
            .retired
            .iter()
            .filter(|(_, retired_at)| now.saturating_duration_since(**retired_at) >= self.release_timeout)
            .map(|(generation, _)| *generation)
            .collect();

        for generation in expired {
            self.retired.remove(&generation);
            debug!(%generation, "release timeout elapsed");
            self.release_one(generation);
        }
    }

    /// Release every held resource. Later calls become no-ops.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.release_retired();
        if let Some(live) = self.live.take() {
            self.release_one(live);
        }
        self.last_payload = None;
        self.torn_down = true;
        info!(created = self.created, released = self.released, "render host torn down");
    }

    pub fn stats(&self) -> HostStats {
        HostStats {
            live: self.live,
            created: self.created,
            released: self.released,
            pending_release: self.retired.len(),
            torn_down: self.torn_down,
        }
    }

    pub fn live(&self) -> Option<Generation> {
        self.live
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn release_retired(&mut self) {
        while let Some((generation, _)) = self.retired.pop_first() {
            self.release_one(generation);
        }
    }

    fn release_one(&mut self, generation: Generation) {
        self.surface.release(generation);
        self.released += 1;
    }
}

impl<S: RenderSurface> Drop for RenderHost<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
