//! # Strain Graph Model
//!
//! Plain data shared by every stage: records, edges, and the resolved graph.
//! No I/O lives here.

pub mod record;
pub mod edge;
pub mod graph;

pub use record::{CanonicalId, RelationshipSource, StrainRecord, TerpeneProfile};
pub use edge::{EdgeKey, EdgeSet, RelationshipEdge, SimilarityEdge, UndirectedEdge};
pub use graph::{Coordinates, StrainGraph};
