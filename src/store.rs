//! Snapshot store and the re-scrape trigger.
//!
//! Readers take an `Arc<StrainGraph>` and keep a consistent view for as long
//! as they hold it. A reload builds a complete new graph off to the side and
//! then swaps the pointer; a published graph is never mutated.
//!
//! Filling a missing strain goes through [`Fetcher`], the boundary to the
//! external scraper. The store does not know how artifacts are produced, only
//! that they should exist afterwards.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::model::{CanonicalId, StrainGraph};
use crate::{Pipeline, Result};

/// Produces the bundle for one strain under the pipeline root.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, reference_id: &CanonicalId) -> Result<()>;
}

impl<T> Fetcher for T
where
    T: Fn(&CanonicalId) -> Result<()> + Send + Sync,
{
    fn fetch(&self, reference_id: &CanonicalId) -> Result<()> {
        self(reference_id)
    }
}

/// Copy-on-write holder of the current graph.
pub struct GraphStore<F: Fetcher> {
    pipeline: Pipeline,
    fetcher: F,
    current: RwLock<Arc<StrainGraph>>,
    /// Serialises reloads; readers never take it.
    reload: Mutex<()>,
}

impl<F: Fetcher> GraphStore<F> {
    /// Run the pipeline once and publish the result.
    pub fn open(pipeline: Pipeline, fetcher: F) -> Result<Self> {
        let graph = pipeline.run()?;
        Ok(Self {
            pipeline,
            fetcher,
            current: RwLock::new(Arc::new(graph)),
            reload: Mutex::new(()),
        })
    }

    /// The current graph.
    pub fn snapshot(&self) -> Arc<StrainGraph> {
        Arc::clone(&self.current.read())
    }

    /// Rebuild from disk and publish the new graph. Snapshots taken before
    /// the call are unaffected.
    pub fn reload(&self) -> Result<Arc<StrainGraph>> {
        let _guard = self.reload.lock();
        let graph = Arc::new(self.pipeline.run()?);
        *self.current.write() = Arc::clone(&graph);
        tracing::info!(nodes = graph.nodes.len(), "published new graph snapshot");
        Ok(graph)
    }

    /// Ask the fetcher for `reference_id`, reload, and report whether a
    /// complete record for it now exists.
    ///
    /// Returns `false` for an unparseable id, a fetcher failure, or a
    /// reload failure; the previous snapshot stays published in those cases.
    pub fn request_fetch(&self, reference_id: &str) -> bool {
        let Some(id) = CanonicalId::parse(reference_id) else {
            tracing::warn!(reference_id, "not a canonical id, ignoring fetch request");
            return false;
        };

        tracing::info!(id = %id, "fetching missing strain");
        if let Err(e) = self.fetcher.fetch(&id) {
            tracing::warn!(id = %id, error = %e, "fetch failed");
            return false;
        }

        match self.reload() {
            Ok(graph) => {
                let present = graph.node_by_id(&id).is_some_and(|r| r.complete);
                if !present {
                    tracing::warn!(id = %id, "fetch finished but no complete bundle appeared");
                }
                present
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "reload after fetch failed");
                false
            }
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
