//! Undirected weighted edges and the edge set they live in.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// Unordered endpoint pair, stored as `(min, max)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub a: String,
    pub b: String,
}

impl EdgeKey {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        let (x, y) = (x.into(), y.into());
        if x <= y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    pub fn is_loop(&self) -> bool {
        self.a == self.b
    }

    pub fn contains(&self, name: &str) -> bool {
        self.a == name || self.b == name
    }

    /// The endpoint opposite `name`, if `name` is an endpoint.
    pub fn other(&self, name: &str) -> Option<&str> {
        if self.a == name { Some(&self.b) }
        else if self.b == name { Some(&self.a) }
        else { None }
    }
}

/// Common surface of genetic and chemical edges.
pub trait UndirectedEdge {
    fn key(&self) -> &EdgeKey;
    fn distance(&self) -> f64;
}

/// Externally observed genetic distance between two strains.
/// 0 means identical; the scale is otherwise opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub key: EdgeKey,
    pub distance: f64,
}

impl RelationshipEdge {
    pub fn new(x: impl Into<String>, y: impl Into<String>, distance: f64) -> Self {
        Self { key: EdgeKey::new(x, y), distance }
    }
}

/// Terpene-profile distance between two complete strains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub key: EdgeKey,
    pub distance: f64,
}

impl SimilarityEdge {
    pub fn new(x: impl Into<String>, y: impl Into<String>, distance: f64) -> Self {
        Self { key: EdgeKey::new(x, y), distance }
    }
}

impl UndirectedEdge for RelationshipEdge {
    fn key(&self) -> &EdgeKey { &self.key }
    fn distance(&self) -> f64 { self.distance }
}

impl UndirectedEdge for SimilarityEdge {
    fn key(&self) -> &EdgeKey { &self.key }
    fn distance(&self) -> f64 { self.distance }
}

/// A set of undirected edges keyed by endpoint pair.
///
/// Re-inserting a pair overwrites the previous edge (last write wins).
/// Iteration is ordered by key, so output built from a set is reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSet<E> {
    edges: BTreeMap<EdgeKey, E>,
}

impl<E> Default for EdgeSet<E> {
    fn default() -> Self {
        Self { edges: BTreeMap::new() }
    }
}

impl<E: UndirectedEdge> EdgeSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge; returns the edge it replaced, if any.
    pub fn insert(&mut self, edge: E) -> Option<E> {
        self.edges.insert(edge.key().clone(), edge)
    }

    pub fn get(&self, x: &str, y: &str) -> Option<&E> {
        self.edges.get(&EdgeKey::new(x, y))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, EdgeKey, E> {
        self.edges.values()
    }

    /// Edges touching `name`.
    pub fn incident<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a E> + 'a {
        self.edges.values().filter(move |e| e.key().contains(name))
    }
}

impl<E: UndirectedEdge> FromIterator<E> for EdgeSet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut set = Self::new();
        for edge in iter {
            set.insert(edge);
        }
        set
    }
}

impl<E> IntoIterator for EdgeSet<E> {
    type Item = E;
    type IntoIter = btree_map::IntoValues<EdgeKey, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.into_values()
    }
}

impl<'a, E> IntoIterator for &'a EdgeSet<E> {
    type Item = &'a E;
    type IntoIter = btree_map::Values<'a, EdgeKey, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.values()
    }
}
