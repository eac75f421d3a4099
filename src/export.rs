//! # Graph Exporter
//!
//! Serialises a [`StrainGraph`] into the payload the viewer consumes:
//!
//! ```text
//! {
//!   "nodes":                    [{ "id", "label", "complete", "rsp", "coordinates"? }],
//!   "relationships":            [{ "from", "to", "distance" }],
//!   "similarity_relationships": [{ "from", "to", "distance" }]
//! }
//! ```
//!
//! The payload carries data only. Colours, sizes and other presentation
//! choices belong to the viewer.

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, Warning};
use crate::model::*;
use crate::Result;

/// One node of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: String,
    pub label: String,
    pub complete: bool,
    /// Canonical reference id, `null` when unknown.
    pub rsp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Vec<f64>>,
}

/// One edge of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub from: String,
    pub to: String,
    pub distance: f64,
}

/// The complete export document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub nodes: Vec<ExportNode>,
    pub relationships: Vec<ExportEdge>,
    pub similarity_relationships: Vec<ExportEdge>,
}

impl ExportPayload {
    pub fn node(&self, id: &str) -> Option<&ExportNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Build the payload for a resolved graph.
///
/// Nodes are ordered by id; edges keep their edge-set order. An edge that
/// names a node outside `graph.nodes` gets a placeholder node rather than
/// being dropped, and a [`Warning::DanglingEdgeReference`] is returned.
pub fn export(graph: &StrainGraph) -> (ExportPayload, Vec<Warning>) {
    export_parts(
        &graph.nodes,
        &graph.edges,
        &graph.similarity_edges,
        graph.coordinates.as_ref(),
    )
}

/// Same as [`export`], from the individual pieces.
pub fn export_parts(
    nodes: &BTreeMap<String, StrainRecord>,
    edges: &EdgeSet<RelationshipEdge>,
    similarity_edges: &EdgeSet<SimilarityEdge>,
    coordinates: Option<&Coordinates>,
) -> (ExportPayload, Vec<Warning>) {
    let mut diags = Diagnostics::new();
    let mut out: BTreeMap<&str, ExportNode> = BTreeMap::new();
    let point = |name: &str| coordinates.and_then(|c| c.get(name)).cloned();

    for (name, record) in nodes {
        out.insert(name.as_str(), ExportNode {
            id: name.clone(),
            label: record.display_name.clone(),
            complete: record.complete,
            rsp: record.canonical_id.as_ref().map(|id| id.to_string()),
            coordinates: point(name),
        });
    }

    let keys = edges.iter().map(|e| e.key()).chain(similarity_edges.iter().map(|e| e.key()));
    for key in keys {
        for name in [key.a.as_str(), key.b.as_str()] {
            if !out.contains_key(name) {
                diags.push(Warning::DanglingEdgeReference { name: name.to_string() });
                out.insert(name, ExportNode {
                    id: name.to_string(),
                    label: name.to_string(),
                    complete: false,
                    rsp: None,
                    coordinates: point(name),
                });
            }
        }
    }

    let payload = ExportPayload {
        nodes: out.into_values().collect(),
        relationships: edges.iter().map(export_edge).collect(),
        similarity_relationships: similarity_edges.iter().map(export_edge).collect(),
    };
    tracing::info!(
        nodes = payload.nodes.len(),
        relationships = payload.relationships.len(),
        similarity_relationships = payload.similarity_relationships.len(),
        "exported graph"
    );
    (payload, diags.into_vec())
}

fn export_edge<E: UndirectedEdge>(edge: &E) -> ExportEdge {
    let key = edge.key();
    ExportEdge { from: key.a.clone(), to: key.b.clone(), distance: edge.distance() }
}

/// Write the payload as pretty-printed JSON.
pub fn write_json(payload: &ExportPayload, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, payload)?;
    writeln!(writer)?;
    Ok(())
}
