//! Boundary store: one explicit load per run, read-only afterwards.

use tracing::info;

use super::{BoundaryError, BoundaryLoader, BoundarySource, PipService, TribalBoundary};

pub struct BoundaryStore {
    loader: BoundaryLoader,
    source: BoundarySource,
    service: Option<PipService>,
}

impl BoundaryStore {
    /// A store that will load from `source` on first [`ensure_loaded`](Self::ensure_loaded).
    pub fn new(loader: BoundaryLoader, source: BoundarySource) -> Self {
        Self {
            loader,
            source,
            service: None,
        }
    }

    /// A store already holding boundaries taken from `source`.
    pub fn preloaded(
        loader: BoundaryLoader,
        source: BoundarySource,
        boundaries: Vec<TribalBoundary>,
    ) -> Self {
        Self {
            loader,
            source,
            service: Some(PipService::from_boundaries(boundaries)),
        }
    }

    /// Load boundaries from an arbitrary source without touching the store.
    pub async fn load(&self, source: &BoundarySource) -> Result<Vec<TribalBoundary>, BoundaryError> {
        self.loader.load(source).await
    }

    /// Load the configured source if nothing is loaded yet.
    pub async fn ensure_loaded(&mut self) -> Result<&PipService, BoundaryError> {
        let service = match self.service.take() {
            Some(service) => service,
            None => {
                let boundaries = self.loader.load(&self.source).await?;
                let service = PipService::from_boundaries(boundaries);
                info!(
                    "PIP service ready with {} boundaries",
                    service.index().len()
                );
                service
            }
        };
        Ok(&*self.service.insert(service))
    }

    pub fn is_loaded(&self) -> bool {
        self.service.is_some()
    }
}
