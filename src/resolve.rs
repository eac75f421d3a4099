//! # Identity Resolver
//!
//! The catalog lists one strain under several spellings (`Blue_Dream`,
//! `blue dream `) that share a canonical id. This pass collapses each id
//! group to a single representative and rewrites edge endpoints onto it.
//!
//! ## Tie-break policy
//!
//! Within one id group, candidates are ordered by
//!
//! 1. `complete` records before incomplete ones, then
//! 2. display name, byte-wise ascending.
//!
//! The first candidate is the representative. The order depends only on the
//! records themselves, never on map iteration order. Two *complete* records
//! with one id is a data inconsistency, not something the catalog promises
//! cannot happen; it is resolved by the same rule and reported as
//! [`Warning::AmbiguousIdentity`] so it can be raised with the data owners.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::diagnostics::{Diagnostics, Warning};
use crate::model::{CanonicalId, EdgeSet, RelationshipEdge, StrainRecord, UndirectedEdge};

/// Canonical id → representative name, plus every known spelling → the
/// representative name.
///
/// Built once per resolution pass and read-only afterwards. It is passed
/// along explicitly; there is no process-wide identity cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalIndex {
    by_id: HashMap<CanonicalId, String>,
    aliases: HashMap<String, String>,
}

impl CanonicalIndex {
    pub fn representative(&self, id: &CanonicalId) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// The representative for a display-name spelling, if the spelling
    /// belongs to a record with a known id.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Number of distinct canonical ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub records: BTreeMap<String, StrainRecord>,
    pub edges: EdgeSet<RelationshipEdge>,
    pub index: CanonicalIndex,
    pub warnings: Vec<Warning>,
}

/// Collapse id groups and rewrite edges.
///
/// Records without an id pass through untouched, and edges between names
/// the index does not know are kept verbatim. An edge whose two endpoints
/// collapse onto the same representative is a self-relation and is dropped.
pub fn resolve(
    records: &BTreeMap<String, StrainRecord>,
    edges: &EdgeSet<RelationshipEdge>,
) -> Resolved {
    let mut diags = Diagnostics::new();
    let mut groups: BTreeMap<&CanonicalId, Vec<&StrainRecord>> = BTreeMap::new();
    let mut out: BTreeMap<String, StrainRecord> = BTreeMap::new();

    for record in records.values() {
        match &record.canonical_id {
            Some(id) => groups.entry(id).or_default().push(record),
            None => {
                out.insert(record.display_name.clone(), record.clone());
            }
        }
    }

    let mut index = CanonicalIndex::default();
    for (id, mut candidates) in groups {
        candidates.sort_by(|x, y| {
            (!x.complete, &x.display_name).cmp(&(!y.complete, &y.display_name))
        });
        let chosen = candidates[0];

        let complete: Vec<String> = candidates
            .iter()
            .filter(|r| r.complete)
            .map(|r| r.display_name.clone())
            .collect();
        if complete.len() > 1 {
            diags.push(Warning::AmbiguousIdentity {
                key: id.to_string(),
                candidates: complete,
                chosen: chosen.display_name.clone(),
            });
        } else if candidates.len() > 1 {
            tracing::debug!(
                id = %id,
                chosen = %chosen.display_name,
                merged = candidates.len() - 1,
                "collapsed display-name variants"
            );
        }

        for candidate in &candidates {
            index.aliases.insert(candidate.display_name.clone(), chosen.display_name.clone());
        }
        index.by_id.insert(id.clone(), chosen.display_name.clone());
        out.insert(chosen.display_name.clone(), chosen.clone());
    }

    let rewrite = |name: &str| index.resolve_name(name).unwrap_or(name).to_string();
    let mut rewritten = EdgeSet::new();
    for edge in edges {
        let key = edge.key();
        let (a, b) = (rewrite(&key.a), rewrite(&key.b));
        if a == b {
            tracing::debug!(a = %key.a, b = %key.b, "edge collapsed onto one strain");
            continue;
        }
        rewritten.insert(RelationshipEdge::new(a, b, edge.distance));
    }

    tracing::info!(
        records_in = records.len(),
        records_out = out.len(),
        ids = index.len(),
        edges_in = edges.len(),
        edges_out = rewritten.len(),
        "resolved identities"
    );

    Resolved { records: out, edges: rewritten, index, warnings: diags.into_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> Option<CanonicalId> {
        CanonicalId::parse(s)
    }

    fn records(list: Vec<StrainRecord>) -> BTreeMap<String, StrainRecord> {
        list.into_iter().map(|r| (r.display_name.clone(), r)).collect()
    }

    #[test]
    fn complete_record_wins_over_smaller_name() {
        let recs = records(vec![
            StrainRecord::new("Blue Dream").with_id(id("rsp100")),
            StrainRecord::new("blue dream").with_id(id("RSP100")).mark_complete(true),
        ]);
        let resolved = resolve(&recs, &EdgeSet::new());

        assert_eq!(resolved.records.len(), 1);
        assert!(resolved.records["blue dream"].complete);
        assert_eq!(resolved.index.resolve_name("Blue Dream"), Some("blue dream"));
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn equal_completeness_picks_smallest_name() {
        let recs = records(vec![
            StrainRecord::new("blue dream").with_id(id("rsp100")),
            StrainRecord::new("Blue Dream").with_id(id("rsp100")),
        ]);
        let resolved = resolve(&recs, &EdgeSet::new());
        assert_eq!(resolved.records.keys().collect::<Vec<_>>(), vec!["Blue Dream"]);
    }

    #[test]
    fn two_complete_records_warn() {
        let recs = records(vec![
            StrainRecord::new("B").with_id(id("rsp1")).mark_complete(true),
            StrainRecord::new("A").with_id(id("rsp1")).mark_complete(true),
        ]);
        let resolved = resolve(&recs, &EdgeSet::new());
        assert_eq!(resolved.records.len(), 1);
        assert!(resolved.records.contains_key("A"));
        assert!(matches!(
            &resolved.warnings[..],
            [Warning::AmbiguousIdentity { chosen, .. }] if chosen == "A"
        ));
    }

    #[test]
    fn edges_are_rewritten_and_unknown_names_kept() {
        let recs = records(vec![
            StrainRecord::new("OG Kush").with_id(id("rsp5")).mark_complete(true),
            StrainRecord::new("OG  kush").with_id(id("rsp5")),
            StrainRecord::new("Mystery"),
        ]);
        let edges: EdgeSet<RelationshipEdge> = [
            RelationshipEdge::new("OG  kush", "Mystery", 0.2),
            RelationshipEdge::new("Ghost", "Phantom", 0.3),
            RelationshipEdge::new("OG Kush", "OG  kush", 0.0),
        ]
        .into_iter()
        .collect();

        let resolved = resolve(&recs, &edges);
        assert_eq!(resolved.edges.len(), 2);
        assert_eq!(resolved.edges.get("OG Kush", "Mystery").map(|e| e.distance), Some(0.2));
        assert!(resolved.edges.get("Ghost", "Phantom").is_some());
        assert!(resolved.records.contains_key("Mystery"));
    }
}
