//! # Terpene Similarity Engine
//!
//! Compares the terpene profiles of complete strains pairwise and keeps only
//! the pairs close enough to be worth drawing. One measure is applied to the
//! whole run; mixing measures inside one export is not possible.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::model::{EdgeSet, SimilarityEdge, StrainRecord, TerpeneProfile};

/// Default cut-off: pairs at or above this distance produce no edge.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Dominant terpenes compared by [`SimilarityMeasure::WeightedPrimary`].
pub const PRIMARY_TERPENES: &[&str] = &[
    "myrcene", "limonene", "caryophyllene", "alpha-pinene", "beta-pinene",
    "linalool", "humulene", "terpinolene", "ocimene",
];

/// How two profiles are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMeasure {
    /// Cosine similarity over the union of terpene names; absent names
    /// count as 0.0. `distance = 1 - similarity`.
    #[default]
    Cosine,
    /// Weighted Ruzicka distance `1 - Σmin / Σmax` over
    /// [`PRIMARY_TERPENES`] only. Each terpene weighs in proportion to its
    /// concentration, so minor compounds barely move the result.
    WeightedPrimary,
}

impl SimilarityMeasure {
    /// Distance in `[0, 1]`, or `None` when the pair cannot be compared
    /// (a zero-norm profile under the chosen measure).
    pub fn distance(&self, a: &TerpeneProfile, b: &TerpeneProfile) -> Option<f64> {
        match self {
            SimilarityMeasure::Cosine => cosine_similarity(a, b).map(|s| (1.0 - s).clamp(0.0, 1.0)),
            SimilarityMeasure::WeightedPrimary => weighted_primary_distance(a, b),
        }
    }
}

/// Cosine similarity of two sparse profiles.
///
/// Terms are summed in sorted-name order and the norms are combined as
/// `sqrt(|a|² · |b|²)`, so `sim(a, b)` and `sim(b, a)` are bit-identical.
pub fn cosine_similarity(a: &TerpeneProfile, b: &TerpeneProfile) -> Option<f64> {
    let names: BTreeSet<&String> = a.keys().chain(b.keys()).collect();

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for name in names {
        let x = a.get(name).copied().unwrap_or(0.0);
        let y = b.get(name).copied().unwrap_or(0.0);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some((dot / denom).min(1.0))
}

/// `1 - Σ min(a_t, b_t) / Σ max(a_t, b_t)` over the primary terpenes.
pub fn weighted_primary_distance(a: &TerpeneProfile, b: &TerpeneProfile) -> Option<f64> {
    let (mut shared, mut total) = (0.0_f64, 0.0_f64);
    for name in PRIMARY_TERPENES {
        let x = a.get(*name).copied().unwrap_or(0.0);
        let y = b.get(*name).copied().unwrap_or(0.0);
        shared += x.min(y);
        total += x.max(y);
    }
    if total == 0.0 {
        return None;
    }
    Some((1.0 - shared / total).clamp(0.0, 1.0))
}

/// Compute every thresholded similarity edge.
///
/// Only records whose [`StrainRecord::comparable_profile`] is present take
/// part. Pairs are visited in sorted-name order (`i < j`), so the resulting
/// set and its iteration order are reproducible.
pub fn compute(
    records: &BTreeMap<String, StrainRecord>,
    measure: SimilarityMeasure,
    threshold: f64,
) -> EdgeSet<SimilarityEdge> {
    let profiles: Vec<(&str, &TerpeneProfile)> = records
        .iter()
        .filter_map(|(name, r)| r.comparable_profile().map(|p| (name.as_str(), p)))
        .collect();

    let mut edges = EdgeSet::new();
    let mut skipped = 0usize;
    for (i, (name_a, a)) in profiles.iter().enumerate() {
        for (name_b, b) in &profiles[i + 1..] {
            match measure.distance(a, b) {
                Some(d) if d < threshold => {
                    edges.insert(SimilarityEdge::new(*name_a, *name_b, d));
                }
                Some(_) => {}
                None => skipped += 1,
            }
        }
    }

    tracing::info!(
        ?measure,
        threshold,
        profiles = profiles.len(),
        edges = edges.len(),
        skipped,
        "computed terpene similarity"
    );
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn profile(pairs: &[(&str, f64)]) -> TerpeneProfile {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn complete(name: &str, pairs: &[(&str, f64)]) -> (String, StrainRecord) {
        let rec = StrainRecord::new(name).with_profile(profile(pairs)).mark_complete(true);
        (name.to_string(), rec)
    }

    #[test]
    fn identical_profiles_have_zero_distance() {
        let a = profile(&[("myrcene", 0.5), ("limonene", 0.3)]);
        let d = SimilarityMeasure::Cosine.distance(&a, &a.clone()).unwrap();
        assert!(d.abs() < 1e-12, "distance was {d}");
    }

    #[test]
    fn disjoint_profiles_are_maximally_distant() {
        let a = profile(&[("myrcene", 0.5)]);
        let b = profile(&[("limonene", 0.5)]);
        assert_eq!(SimilarityMeasure::Cosine.distance(&a, &b), Some(1.0));
        assert_eq!(SimilarityMeasure::WeightedPrimary.distance(&a, &b), Some(1.0));
    }

    #[test]
    fn zero_norm_is_skipped() {
        let a = profile(&[("myrcene", 0.0)]);
        let b = profile(&[("myrcene", 0.4)]);
        assert_eq!(cosine_similarity(&a, &b), None);
        assert_eq!(weighted_primary_distance(&a, &a), None);
    }

    #[test]
    fn weighted_primary_ignores_minor_terpenes() {
        let a = profile(&[("myrcene", 0.4), ("guaiol", 0.9)]);
        let b = profile(&[("myrcene", 0.2)]);
        let d = weighted_primary_distance(&a, &b).unwrap();
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn only_complete_records_participate() {
        let mut recs: BTreeMap<String, StrainRecord> = [
            complete("A", &[("myrcene", 0.5), ("limonene", 0.3)]),
            complete("B", &[("myrcene", 0.5), ("limonene", 0.3)]),
        ]
        .into_iter()
        .collect();
        recs.insert(
            "C".into(),
            StrainRecord::new("C").with_profile(profile(&[("myrcene", 0.5), ("limonene", 0.3)])),
        );

        let edges = compute(&recs, SimilarityMeasure::Cosine, DEFAULT_THRESHOLD);
        assert_eq!(edges.len(), 1);
        let e = edges.get("A", "B").unwrap();
        assert!(e.distance.abs() < 1e-12);
        assert!(edges.incident("C").next().is_none());
    }

    #[test]
    fn measure_deserializes_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrap {
            measure: SimilarityMeasure,
        }
        let w: Wrap = toml::from_str("measure = \"weighted_primary\"").unwrap();
        assert_eq!(w.measure, SimilarityMeasure::WeightedPrimary);
    }

    fn arb_profile() -> impl Strategy<Value = TerpeneProfile> {
        prop::collection::btree_map(
            prop::sample::select(vec![
                "myrcene".to_string(),
                "limonene".to_string(),
                "linalool".to_string(),
                "alpha-pinene".to_string(),
                "guaiol".to_string(),
            ]),
            0.0f64..5.0,
            0..5,
        )
    }

    proptest! {
        #[test]
        fn cosine_is_symmetric(a in arb_profile(), b in arb_profile()) {
            prop_assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        }

        #[test]
        fn self_distance_is_zero(a in arb_profile()) {
            if let Some(d) = SimilarityMeasure::Cosine.distance(&a, &a) {
                prop_assert!(d < 1e-9);
            }
        }

        #[test]
        fn no_edge_reaches_threshold(
            profiles in prop::collection::vec(arb_profile(), 0..8),
            threshold in 0.01f64..1.0,
        ) {
            let recs: BTreeMap<String, StrainRecord> = profiles
                .into_iter()
                .enumerate()
                .map(|(i, p)| {
                    let name = format!("S{i}");
                    (name.clone(), StrainRecord::new(name).with_profile(p).mark_complete(true))
                })
                .collect();
            for measure in [SimilarityMeasure::Cosine, SimilarityMeasure::WeightedPrimary] {
                for edge in &compute(&recs, measure, threshold) {
                    prop_assert!(edge.distance < threshold);
                }
            }
        }
    }
}
