//! Non-fatal pipeline conditions.
//!
//! A malformed artifact never aborts a run. Each stage degrades the
//! affected entity and records a [`Warning`] here; the caller decides what
//! to do with them. Every warning is also emitted through `tracing` at the
//! point it is raised.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Which artifact of a bundle a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Artifact {
    Metadata,
    Chemicals,
    Relationships,
    /// The canonical id itself could not be recovered.
    CanonicalId,
    /// The bundle directory could not be listed.
    Bundle,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Artifact::Metadata => "metadata",
            Artifact::Chemicals => "chemical profile",
            Artifact::Relationships => "relationships",
            Artifact::CanonicalId => "canonical id",
            Artifact::Bundle => "bundle directory",
        };
        f.write_str(s)
    }
}

/// A degraded-but-continued condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Warning {
    /// An artifact is absent, empty, or unreadable; the record is incomplete.
    MissingArtifact { bundle: PathBuf, artifact: Artifact },
    /// A numeric field failed to parse and was replaced by `0.0`.
    MalformedNumeric { bundle: PathBuf, field: String, raw: String },
    /// Several records compete for one identity; `chosen` won the tie-break.
    AmbiguousIdentity { key: String, candidates: Vec<String>, chosen: String },
    /// An exported edge named a node outside the node set.
    DanglingEdgeReference { name: String },
    /// Coordinates could not be computed; the graph is exported without them.
    EmbeddingFailure { reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingArtifact { bundle, artifact } => {
                write!(f, "missing {} in {}", artifact, bundle.display())
            }
            Warning::MalformedNumeric { bundle, field, raw } => {
                write!(f, "malformed number {:?} for {} in {}, using 0.0", raw, field, bundle.display())
            }
            Warning::AmbiguousIdentity { key, candidates, chosen } => {
                write!(f, "{} is claimed by {:?}, chose {:?}", key, candidates, chosen)
            }
            Warning::DanglingEdgeReference { name } => {
                write!(f, "edge references unknown node {:?}, synthesized placeholder", name)
            }
            Warning::EmbeddingFailure { reason } => write!(f, "embedding skipped: {}", reason),
        }
    }
}

/// Warning accumulator threaded through one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!(kind = warning.kind(), "{}", warning);
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.warnings.iter()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}

impl Warning {
    /// Short taxonomy tag, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::MissingArtifact { .. } => "missing_artifact",
            Warning::MalformedNumeric { .. } => "malformed_numeric",
            Warning::AmbiguousIdentity { .. } => "ambiguous_identity",
            Warning::DanglingEdgeReference { .. } => "dangling_edge_reference",
            Warning::EmbeddingFailure { .. } => "embedding_failure",
        }
    }
}
