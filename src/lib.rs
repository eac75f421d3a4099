//! # strain-graph — strain relationship graphs from scraped catalog bundles
//!
//! Turns a directory of per-strain artifact bundles into a deduplicated
//! graph: genetic-distance edges observed in the catalog, terpene-similarity
//! edges computed here, and optional MDS coordinates for layout.
//!
//! ## Pipeline
//!
//! ```text
//! plants/*/            loader::load        records + genetic edges
//!     │                resolve::resolve    one node per canonical id
//!     ├──────────────> similarity::compute terpene edges below threshold
//!     ├──────────────> embedding::embed    2-D / 3-D coordinates (optional)
//!     └──────────────> StrainGraph ──> export::export ──> JSON payload
//! ```
//!
//! Every stage takes borrowed input and returns a new value. Nothing is
//! cached between runs; the [`resolve::CanonicalIndex`] is rebuilt on each
//! load and carried inside the graph.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strain_graph::{Pipeline, PipelineConfig};
//!
//! # fn example() -> strain_graph::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default().with_root("plants"))?;
//! let graph = pipeline.run()?;
//! let (payload, _warnings) = strain_graph::export::export(&graph);
//! strain_graph::export::write_json(&payload, &mut std::io::stdout())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `embedding` | yes | SMACOF metric MDS coordinates (ndarray + rand) |
//! | `cli` | yes | `strain-graph` binary |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod diagnostics;
pub mod config;
pub mod loader;
pub mod resolve;
pub mod similarity;
#[cfg(feature = "embedding")]
pub mod embedding;
pub mod export;
pub mod phylogeny;
pub mod store;

use std::path::PathBuf;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    CanonicalId, Coordinates, EdgeKey, EdgeSet, RelationshipEdge, SimilarityEdge,
    StrainGraph, StrainRecord, TerpeneProfile,
};
pub use config::PipelineConfig;
pub use diagnostics::Warning;
pub use export::ExportPayload;
pub use similarity::SimilarityMeasure;
pub use store::{Fetcher, GraphStore};

// ============================================================================
// Pipeline handle
// ============================================================================

/// The primary entry point: a validated configuration plus the stage wiring.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured root and build the graph.
    ///
    /// Only an unreadable root fails; everything else is degraded and listed
    /// in [`StrainGraph::warnings`].
    pub fn run(&self) -> Result<StrainGraph> {
        let loaded = loader::load(&self.config.root)?;
        Ok(self.build(loaded))
    }

    /// Resolve, compare and (optionally) embed an already loaded tree.
    pub fn build(&self, loaded: loader::LoadOutput) -> StrainGraph {
        let mut warnings = loaded.warnings;

        let resolved = resolve::resolve(&loaded.records, &loaded.edges);
        warnings.extend(resolved.warnings);

        let similarity_edges = similarity::compute(
            &resolved.records,
            self.config.similarity.measure,
            self.config.similarity.threshold,
        );

        let coordinates = if self.config.embedding.enabled && !resolved.records.is_empty() {
            match self.embed(&resolved.records, &resolved.edges) {
                Ok(coords) => Some(coords),
                Err(e) => {
                    let warning = Warning::EmbeddingFailure { reason: e.to_string() };
                    tracing::warn!(kind = warning.kind(), "{}", warning);
                    warnings.push(warning);
                    None
                }
            }
        } else {
            None
        };

        StrainGraph {
            nodes: resolved.records,
            edges: resolved.edges,
            similarity_edges,
            coordinates,
            index: resolved.index,
            warnings,
        }
    }

    /// Embed the genetic distances of `nodes` into the configured number of
    /// dimensions.
    #[cfg(feature = "embedding")]
    pub fn embed(
        &self,
        nodes: &std::collections::BTreeMap<String, StrainRecord>,
        edges: &EdgeSet<RelationshipEdge>,
    ) -> Result<Coordinates> {
        let params = &self.config.embedding;
        let matrix = embedding::DistanceMatrix::build(
            nodes.keys().map(String::as_str),
            edges,
            params.default_distance,
        );
        let result = embedding::embed(&matrix, params)?;
        Ok(result.into_coordinates())
    }

    #[cfg(not(feature = "embedding"))]
    pub fn embed(
        &self,
        _nodes: &std::collections::BTreeMap<String, StrainRecord>,
        _edges: &EdgeSet<RelationshipEdge>,
    ) -> Result<Coordinates> {
        Err(Error::FeatureDisabled("embedding"))
    }

    /// Nearest-relative tree of a graph built by this pipeline.
    pub fn phylogeny(&self, graph: &StrainGraph) -> phylogeny::PhylogenyTree {
        phylogeny::build(graph, &self.config.phylogeny)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot read bundle root {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[cfg(feature = "embedding")]
    #[error("Embedding error: {0}")]
    Embedding(#[from] embedding::EmbeddingError),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
