//! # Distance Embedding
//!
//! Places every strain in 2-D or 3-D space so that Euclidean distances
//! approximate the genetic distance matrix, using metric multidimensional
//! scaling by majorization (SMACOF).
//!
//! ```text
//! nodes + genetic edges
//!     │
//!     ├──> DistanceMatrix::build   n × n, diag 0, unknown pairs = default (1.0)
//!     │
//!     └──> embed                   n_init seeded starts × Guttman iterations
//!            └─ lowest-stress run wins
//! ```
//!
//! All randomness comes from one `StdRng` seeded from the configuration, and
//! every loop runs in index order, so identical input gives bit-identical
//! coordinates.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EmbeddingConfig;
use crate::model::{Coordinates, EdgeSet, RelationshipEdge, UndirectedEdge};

/// Distances below this are treated as coincident points in the Guttman
/// transform.
const COINCIDENT: f64 = 1e-12;

/// Why no embedding could be produced. Fatal to this stage only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbeddingError {
    #[error("distance matrix is empty")]
    Empty,

    #[error("distance between {a:?} and {b:?} is not finite")]
    NonFinite { a: String, b: String },

    #[error("distance between {a:?} and {b:?} is negative ({value})")]
    Negative { a: String, b: String, value: f64 },

    #[error("all {n} points are at distance zero from each other")]
    Degenerate { n: usize },

    #[error("stress minimisation diverged")]
    Diverged,
}

/// Symmetric `n × n` dissimilarity matrix over named points.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    labels: Vec<String>,
    values: Array2<f64>,
}

impl DistanceMatrix {
    /// Build the matrix over `names` plus every edge endpoint.
    ///
    /// Labels are sorted. The diagonal is 0, observed pairs take the edge
    /// distance, and every other pair takes `default_distance`.
    pub fn build<'a>(
        names: impl IntoIterator<Item = &'a str>,
        edges: &EdgeSet<RelationshipEdge>,
        default_distance: f64,
    ) -> Self {
        let mut set: BTreeSet<&str> = names.into_iter().collect();
        for edge in edges {
            set.insert(&edge.key().a);
            set.insert(&edge.key().b);
        }
        let labels: Vec<String> = set.into_iter().map(str::to_string).collect();
        let position: BTreeMap<&str, usize> =
            labels.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();

        let n = labels.len();
        let mut values = Array2::from_elem((n, n), default_distance);
        for i in 0..n {
            values[[i, i]] = 0.0;
        }
        for edge in edges {
            let key = edge.key();
            if let (Some(&i), Some(&j)) = (position.get(key.a.as_str()), position.get(key.b.as_str())) {
                values[[i, j]] = edge.distance();
                values[[j, i]] = edge.distance();
            }
        }

        Self { labels, values }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.binary_search_by(|l| l.as_str().cmp(a)).ok()?;
        let j = self.labels.binary_search_by(|l| l.as_str().cmp(b)).ok()?;
        Some(self.values[[i, j]])
    }

    fn validate(&self) -> Result<(), EmbeddingError> {
        let n = self.len();
        if n == 0 {
            return Err(EmbeddingError::Empty);
        }
        let mut any_positive = false;
        for i in 0..n {
            for j in (i + 1)..n {
                let v = self.values[[i, j]];
                let pair = || (self.labels[i].clone(), self.labels[j].clone());
                if !v.is_finite() {
                    let (a, b) = pair();
                    return Err(EmbeddingError::NonFinite { a, b });
                }
                if v < 0.0 {
                    let (a, b) = pair();
                    return Err(EmbeddingError::Negative { a, b, value: v });
                }
                any_positive |= v > 0.0;
            }
        }
        if n > 1 && !any_positive {
            return Err(EmbeddingError::Degenerate { n });
        }
        Ok(())
    }
}

/// Coordinates for each label of the matrix they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    labels: Vec<String>,
    points: Array2<f64>,
    stress: f64,
}

impl Embedding {
    /// Raw stress `Σ_{i<j} (‖x_i - x_j‖ - δ_ij)²` of the chosen layout.
    pub fn stress(&self) -> f64 {
        self.stress
    }

    pub fn dimensions(&self) -> usize {
        self.points.ncols()
    }

    pub fn point(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.labels.binary_search_by(|l| l.as_str().cmp(name)).ok()?;
        Some(self.points.row(i).to_vec())
    }

    pub fn into_coordinates(self) -> Coordinates {
        self.labels
            .into_iter()
            .zip(self.points.rows())
            .map(|(label, row)| (label, row.to_vec()))
            .collect()
    }
}

/// Run seeded SMACOF on `matrix`.
pub fn embed(matrix: &DistanceMatrix, params: &EmbeddingConfig) -> Result<Embedding, EmbeddingError> {
    matrix.validate()?;
    let k = params.dimensions.count();
    let n = matrix.len();

    if n == 1 {
        return Ok(Embedding {
            labels: matrix.labels.clone(),
            points: Array2::zeros((1, k)),
            stress: 0.0,
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<(Array2<f64>, f64)> = None;
    for run in 0..params.n_init.max(1) {
        let (points, stress, iterations) = smacof_single(&matrix.values, k, &mut rng, params);
        tracing::debug!(run, stress, iterations, "smacof run finished");
        if !stress.is_finite() || points.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::Diverged);
        }
        if best.as_ref().is_none_or(|(_, s)| stress < *s) {
            best = Some((points, stress));
        }
    }

    let (points, stress) = best.ok_or(EmbeddingError::Diverged)?;
    tracing::info!(points = n, dimensions = k, stress, "embedded distance matrix");
    Ok(Embedding { labels: matrix.labels.clone(), points, stress })
}

/// One SMACOF run from a uniform random start. Returns the final layout,
/// its stress, and the iteration count.
fn smacof_single(
    delta: &Array2<f64>,
    k: usize,
    rng: &mut StdRng,
    params: &EmbeddingConfig,
) -> (Array2<f64>, f64, usize) {
    let n = delta.nrows();
    let mut x = Array2::from_shape_fn((n, k), |_| rng.random::<f64>());
    let mut previous: Option<f64> = None;
    let mut iterations = 0;

    for _ in 0..params.max_iter {
        iterations += 1;
        let d = pairwise_distances(&x);
        let current = stress(&d, delta);

        // Guttman transform: X ← B(X) · X / n
        let mut b = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            let mut diagonal = 0.0;
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dij = d[[i, j]];
                let bij = if dij > COINCIDENT { -delta[[i, j]] / dij } else { 0.0 };
                b[[i, j]] = bij;
                diagonal -= bij;
            }
            b[[i, i]] = diagonal;
        }
        x = b.dot(&x) / n as f64;

        if current == 0.0 {
            break;
        }
        if let Some(prev) = previous {
            if prev - current <= params.eps * prev {
                break;
            }
        }
        previous = Some(current);
    }

    let final_stress = stress(&pairwise_distances(&x), delta);
    (x, final_stress, iterations)
}

fn pairwise_distances(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let mut d = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = x
                .row(i)
                .iter()
                .zip(x.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            d[[i, j]] = dist;
            d[[j, i]] = dist;
        }
    }
    d
}

fn stress(d: &Array2<f64>, delta: &Array2<f64>) -> f64 {
    let n = d.nrows();
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let r = d[[i, j]] - delta[[i, j]];
            total += r * r;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dimensions;

    fn params(dimensions: Dimensions) -> EmbeddingConfig {
        EmbeddingConfig { dimensions, ..EmbeddingConfig::default() }
    }

    fn triangle() -> DistanceMatrix {
        let edges: EdgeSet<RelationshipEdge> = [
            RelationshipEdge::new("A", "B", 0.3),
            RelationshipEdge::new("B", "C", 0.4),
            RelationshipEdge::new("A", "C", 0.5),
        ]
        .into_iter()
        .collect();
        DistanceMatrix::build(["A", "B", "C", "D"], &edges, 1.0)
    }

    #[test]
    fn matrix_defaults_unknown_pairs_to_max() {
        let m = triangle();
        assert_eq!(m.labels(), ["A", "B", "C", "D"]);
        assert_eq!(m.get("A", "A"), Some(0.0));
        assert_eq!(m.get("C", "A"), Some(0.5));
        assert_eq!(m.get("A", "D"), Some(1.0));
        assert_eq!(m.get("A", "Z"), None);
    }

    #[test]
    fn edge_endpoints_join_the_label_set() {
        let edges: EdgeSet<RelationshipEdge> =
            [RelationshipEdge::new("A", "Z", 0.2)].into_iter().collect();
        let m = DistanceMatrix::build(["A"], &edges, 1.0);
        assert_eq!(m.labels(), ["A", "Z"]);
    }

    #[test]
    fn embedding_is_bit_reproducible() {
        let m = triangle();
        let first = embed(&m, &params(Dimensions::Three)).unwrap();
        let second = embed(&m, &params(Dimensions::Three)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.dimensions(), 3);
    }

    #[test]
    fn embedding_approximates_a_metric_triangle() {
        let edges: EdgeSet<RelationshipEdge> = [
            RelationshipEdge::new("A", "B", 0.3),
            RelationshipEdge::new("B", "C", 0.4),
            RelationshipEdge::new("A", "C", 0.5),
        ]
        .into_iter()
        .collect();
        let m = DistanceMatrix::build(["A", "B", "C"], &edges, 1.0);
        let tight = EmbeddingConfig { eps: 1e-12, max_iter: 2000, ..params(Dimensions::Two) };
        let e = embed(&m, &tight).unwrap();
        assert!(e.stress() < 1e-3, "stress {}", e.stress());

        let (a, b) = (e.point("A").unwrap(), e.point("B").unwrap());
        let ab = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
        assert!((ab - 0.3).abs() < 0.05, "ab = {ab}");
    }

    #[test]
    fn degenerate_matrix_fails() {
        let edges: EdgeSet<RelationshipEdge> =
            [RelationshipEdge::new("A", "B", 0.0)].into_iter().collect();
        let m = DistanceMatrix::build(["A", "B"], &edges, 1.0);
        assert_eq!(embed(&m, &params(Dimensions::Two)), Err(EmbeddingError::Degenerate { n: 2 }));

        let empty = DistanceMatrix::build([], &EdgeSet::new(), 1.0);
        assert_eq!(embed(&empty, &params(Dimensions::Two)), Err(EmbeddingError::Empty));
    }

    #[test]
    fn non_finite_distance_fails() {
        let edges: EdgeSet<RelationshipEdge> =
            [RelationshipEdge::new("A", "B", f64::NAN)].into_iter().collect();
        let m = DistanceMatrix::build(["A", "B"], &edges, 1.0);
        assert!(matches!(embed(&m, &params(Dimensions::Two)), Err(EmbeddingError::NonFinite { .. })));
    }

    #[test]
    fn single_point_sits_at_origin() {
        let m = DistanceMatrix::build(["Solo"], &EdgeSet::new(), 1.0);
        let e = embed(&m, &params(Dimensions::Two)).unwrap();
        assert_eq!(e.into_coordinates()["Solo"], vec![0.0, 0.0]);
    }
}
