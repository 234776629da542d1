//! Render surface backed by documents served over HTTP.
//!
//! Mounted documents live in a [`DocumentTable`] the HTTP layer reads from;
//! the shell page learns about each new generation through a
//! [`PreviewEvent::Rendered`] broadcast and loads it into a sandboxed iframe.
//! Releasing a generation drops its document, so later fetches 404.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;

use super::host::{RenderResource, RenderSurface};
use super::models::Generation;
use super::ws::{PreviewEvent, broadcast_event};

#[derive(Default)]
struct TableInner {
    documents: HashMap<Generation, Arc<str>>,
    live: Option<Generation>,
}

/// Read-only view of the served documents. Only [`ServedSurface`] writes.
#[derive(Clone, Default)]
pub struct DocumentTable {
    inner: Arc<RwLock<TableInner>>,
}

impl DocumentTable {
    pub fn get(&self, generation: Generation) -> Option<Arc<str>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.documents.get(&generation).cloned()
    }

    pub fn live(&self) -> Option<Generation> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live
    }
}

pub struct ServedSurface {
    table: DocumentTable,
    events: broadcast::Sender<String>,
}

impl ServedSurface {
    pub fn new(events: broadcast::Sender<String>) -> Self {
        Self {
            table: DocumentTable::default(),
            events,
        }
    }

    /// Handle the HTTP layer reads documents through.
    pub fn table(&self) -> DocumentTable {
        self.table.clone()
    }
}

impl RenderSurface for ServedSurface {
    fn mount(&mut self, resource: &RenderResource) {
        {
            let mut inner = self
                .table
                .inner
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            inner
                .documents
                .insert(resource.generation, resource.document.clone());
            inner.live = Some(resource.generation);
        }
        broadcast_event(
            &self.events,
            &PreviewEvent::Rendered {
                generation: resource.generation,
            },
        );
    }

    fn release(&mut self, generation: Generation) {
        let mut inner = self
            .table
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        inner.documents.remove(&generation);
        if inner.live == Some(generation) {
            inner.live = None;
        }
    }
}
