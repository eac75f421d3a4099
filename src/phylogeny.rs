//! Nearest-relative tree.
//!
//! A readable alternative to the full distance graph: starting from one
//! root, every strain takes its `max_children` closest relatives (genetic
//! distance below `max_distance`) and adopts those not already in the tree,
//! depth first. Already-placed relatives still count against the limit.
//!
//! The root is the strain with the smallest reference id; strains without
//! an id sort before all ids, then by name.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::PhylogenyConfig;
use crate::model::{StrainGraph, UndirectedEdge};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub rsp: Option<String>,
    /// Depth below the root (root is 0).
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeEdge {
    pub parent: String,
    pub child: String,
    pub distance: f64,
}

/// Nodes in visiting order, and the parent → child edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhylogenyTree {
    pub root: Option<String>,
    pub nodes: Vec<TreeNode>,
    pub edges: Vec<TreeEdge>,
}

struct Frame {
    name: String,
    level: usize,
    children: Vec<(String, f64)>,
    next: usize,
}

pub fn build(graph: &StrainGraph, config: &PhylogenyConfig) -> PhylogenyTree {
    let root = graph
        .nodes
        .values()
        .min_by_key(|r| (r.canonical_id.clone(), r.display_name.clone()))
        .map(|r| r.display_name.clone());

    let mut tree = PhylogenyTree { root: root.clone(), ..PhylogenyTree::default() };
    let Some(root) = root else { return tree };

    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut stack: Vec<Frame> = Vec::new();
    visit(graph, config, &root, 0, &mut visited, &mut tree, &mut stack);

    while let Some(frame) = stack.last_mut() {
        if frame.next >= frame.children.len() {
            stack.pop();
            continue;
        }
        let (child, distance) = frame.children[frame.next].clone();
        frame.next += 1;
        if visited.contains(&child) {
            continue;
        }
        let (parent, level) = (frame.name.clone(), frame.level + 1);
        tree.edges.push(TreeEdge { parent, child: child.clone(), distance });
        visit(graph, config, &child, level, &mut visited, &mut tree, &mut stack);
    }

    tracing::debug!(nodes = tree.nodes.len(), edges = tree.edges.len(), "built phylogeny tree");
    tree
}

/// Mark `name`, record it, and push a frame with its nearest relatives.
fn visit(
    graph: &StrainGraph,
    config: &PhylogenyConfig,
    name: &str,
    level: usize,
    visited: &mut BTreeSet<String>,
    tree: &mut PhylogenyTree,
    stack: &mut Vec<Frame>,
) {
    let Some(record) = graph.nodes.get(name) else { return };
    if !visited.insert(name.to_string()) {
        return;
    }
    tree.nodes.push(TreeNode {
        name: name.to_string(),
        rsp: record.canonical_id.as_ref().map(|id| id.to_string()),
        level,
    });

    let mut children: Vec<(String, f64)> = graph
        .edges
        .incident(name)
        .filter(|e| e.distance() < config.max_distance)
        .filter_map(|e| e.key().other(name).map(|other| (other.to_string(), e.distance())))
        .filter(|(other, _)| graph.nodes.contains_key(other))
        .collect();
    children.sort_by(|a, b| a.1.total_cmp(&b.1));
    children.truncate(config.max_children);

    stack.push(Frame { name: name.to_string(), level, children, next: 0 });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::resolve::CanonicalIndex;
    use pretty_assertions::assert_eq;

    fn graph(nodes: &[(&str, Option<&str>)], edges: &[(&str, &str, f64)]) -> StrainGraph {
        StrainGraph {
            nodes: nodes
                .iter()
                .map(|(n, id)| {
                    let rec = StrainRecord::new(*n).with_id(id.and_then(CanonicalId::parse));
                    (n.to_string(), rec)
                })
                .collect(),
            edges: edges.iter().map(|(a, b, d)| RelationshipEdge::new(*a, *b, *d)).collect(),
            similarity_edges: EdgeSet::new(),
            coordinates: None,
            index: CanonicalIndex::default(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn depth_first_nearest_relatives() {
        let g = graph(
            &[("Root", Some("RSP1")), ("A", Some("RSP5")), ("B", Some("RSP6")), ("C", Some("RSP7")), ("Far", Some("RSP8"))],
            &[
                ("Root", "A", 0.05),
                ("Root", "B", 0.10),
                ("A", "C", 0.02),
                ("A", "B", 0.01),
                ("Root", "Far", 0.5),
            ],
        );
        let tree = build(&g, &PhylogenyConfig::default());

        assert_eq!(tree.root.as_deref(), Some("Root"));
        let order: Vec<(&str, usize)> = tree.nodes.iter().map(|n| (n.name.as_str(), n.level)).collect();
        // A is nearest to Root; A then claims B (0.01) before Root gets to it.
        assert_eq!(order, vec![("Root", 0), ("A", 1), ("B", 2), ("C", 2)]);
        assert_eq!(tree.edges.len(), 3);
        assert!(tree.edges.iter().all(|e| e.child != "Far"));
    }

    #[test]
    fn child_limit_applies() {
        let g = graph(
            &[("R", Some("RSP1")), ("a", None), ("b", None), ("c", None), ("d", None)],
            &[("R", "a", 0.01), ("R", "b", 0.02), ("R", "c", 0.03), ("R", "d", 0.04)],
        );
        let config = PhylogenyConfig { max_children: 2, ..PhylogenyConfig::default() };
        let tree = build(&g, &config);
        // Nodes without an id sort first, so the root is "a". R's two
        // nearest are a (its parent) and b, so c and d stay out.
        assert_eq!(tree.root.as_deref(), Some("a"));
        let names: Vec<&str> = tree.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "R", "b"]);

        let g = graph(&[("R", Some("RSP1"))], &[]);
        assert_eq!(build(&g, &config).nodes.len(), 1);
    }

    #[test]
    fn empty_graph_has_no_root() {
        let g = graph(&[], &[]);
        assert_eq!(build(&g, &PhylogenyConfig::default()), PhylogenyTree::default());
    }
}
