//! The resolved graph, the immutable value every consumer reads.

use std::collections::BTreeMap;

use super::{CanonicalId, EdgeSet, RelationshipEdge, SimilarityEdge, StrainRecord};
use crate::diagnostics::Warning;
use crate::resolve::CanonicalIndex;

/// Node name → layout coordinates (2 or 3 components).
pub type Coordinates = BTreeMap<String, Vec<f64>>;

/// Deduplicated nodes plus both edge sets, as produced by one pipeline run.
///
/// Never mutated after construction; the store hands it out behind an
/// `Arc` and replaces it wholesale on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct StrainGraph {
    pub nodes: BTreeMap<String, StrainRecord>,
    pub edges: EdgeSet<RelationshipEdge>,
    pub similarity_edges: EdgeSet<SimilarityEdge>,
    /// `None` when the embedding stage was disabled or failed.
    pub coordinates: Option<Coordinates>,
    pub index: CanonicalIndex,
    /// Every non-fatal condition raised while building this graph.
    pub warnings: Vec<Warning>,
}

impl StrainGraph {
    pub fn node(&self, name: &str) -> Option<&StrainRecord> {
        self.nodes.get(name)
    }

    /// The representative record for a canonical id.
    pub fn node_by_id(&self, id: &CanonicalId) -> Option<&StrainRecord> {
        self.index.representative(id).and_then(|name| self.nodes.get(name))
    }

    pub fn complete_count(&self) -> usize {
        self.nodes.values().filter(|n| n.complete).count()
    }

    /// Ids of incomplete nodes: the strains a fetch could fill in.
    pub fn missing_ids(&self) -> impl Iterator<Item = &CanonicalId> + '_ {
        self.nodes
            .values()
            .filter(|n| !n.complete)
            .filter_map(|n| n.canonical_id.as_ref())
    }
}
