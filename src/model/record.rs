//! Strain record: one entity of the catalog.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable external reference for one real-world strain (e.g. `RSP10234`).
///
/// Always stored uppercase, so equality and hashing are case-insensitive
/// by construction. The core never invents ids; they come from bundle
/// directory names, relationship rows, or summary titles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    const PREFIX: &'static str = "RSP";

    /// Parse an id token. Accepts `RSP` + one or more ASCII digits in any
    /// letter case, surrounding whitespace ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        let digits = upper.strip_prefix(Self::PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terpene name (canonical, lowercase) → concentration in percent.
pub type TerpeneProfile = BTreeMap<String, f64>;

/// Which artifact supplied a bundle's relationship rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipSource {
    /// `{name}.variants.csv`
    Variants,
    /// Legacy `{name}_summary.txt`
    Summary,
}

/// A strain in the graph.
///
/// Records loaded from a bundle carry whatever artifacts were found;
/// records known only as a relationship target are placeholders
/// (`complete = false`, no profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrainRecord {
    pub display_name: String,
    pub canonical_id: Option<CanonicalId>,
    /// True only when metadata, chemical profile and relationship
    /// artifacts all exist and are non-empty.
    pub complete: bool,
    pub terpene_profile: Option<TerpeneProfile>,
    /// `Field,Value` rows of the metadata artifact.
    pub metadata: BTreeMap<String, String>,
    pub relationship_source: Option<RelationshipSource>,
}

impl StrainRecord {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            canonical_id: None,
            complete: false,
            terpene_profile: None,
            metadata: BTreeMap::new(),
            relationship_source: None,
        }
    }

    /// Minimal record for an entity seen only from another record's rows.
    pub fn placeholder(display_name: impl Into<String>, canonical_id: Option<CanonicalId>) -> Self {
        Self::new(display_name).with_id(canonical_id)
    }

    pub fn with_id(mut self, canonical_id: Option<CanonicalId>) -> Self {
        self.canonical_id = canonical_id;
        self
    }

    pub fn with_profile(mut self, profile: TerpeneProfile) -> Self {
        self.terpene_profile = if profile.is_empty() { None } else { Some(profile) };
        self
    }

    pub fn mark_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    /// The profile eligible for similarity computation.
    ///
    /// `None` unless the record is complete and its profile has at least
    /// one entry. Incomplete records never contribute, even if a chemical
    /// artifact was read.
    pub fn comparable_profile(&self) -> Option<&TerpeneProfile> {
        if !self.complete {
            return None;
        }
        self.terpene_profile.as_ref().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_id_is_case_insensitive() {
        let a = CanonicalId::parse("rsp100").unwrap();
        let b = CanonicalId::parse(" RSP100 ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "RSP100");
    }

    #[test]
    fn canonical_id_rejects_other_tokens() {
        assert!(CanonicalId::parse("rsp").is_none());
        assert!(CanonicalId::parse("rsp12a").is_none());
        assert!(CanonicalId::parse("Kush").is_none());
        assert!(CanonicalId::parse("").is_none());
    }

    #[test]
    fn incomplete_record_has_no_comparable_profile() {
        let mut profile = TerpeneProfile::new();
        profile.insert("myrcene".into(), 0.5);
        let rec = StrainRecord::new("Blue Dream").with_profile(profile.clone());
        assert!(rec.comparable_profile().is_none());

        let rec = rec.mark_complete(true);
        assert_eq!(rec.comparable_profile(), Some(&profile));
    }

    #[test]
    fn empty_profile_is_not_stored() {
        let rec = StrainRecord::new("X").with_profile(TerpeneProfile::new()).mark_complete(true);
        assert!(rec.terpene_profile.is_none());
        assert!(rec.comparable_profile().is_none());
    }
}
