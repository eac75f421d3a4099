//! CSV artifact readers.
//!
//! Columns are read by position, not header text: the scraper has written
//! `Field,Value`, `Type,Name,Value` and `Type,Distance,Strain,RSP` headers,
//! but older bundles vary in capitalisation.

use std::collections::BTreeMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use super::bundle::display_name;
use super::terpene;
use crate::diagnostics::{Diagnostics, Warning};
use crate::model::{CanonicalId, TerpeneProfile};

/// One relationship row as written by the bundle's own strain.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// `all_samples`, `base_tree`, `most_distant`, ...
    pub relation: String,
    pub distance: f64,
    pub name: String,
    pub canonical_id: Option<CanonicalId>,
}

fn rows(path: &Path) -> Result<Vec<StringRecord>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;
    reader.records().collect()
}

/// `Field,Value` rows. Later duplicates overwrite earlier ones.
pub fn read_metadata(path: &Path) -> Result<BTreeMap<String, String>, csv::Error> {
    let mut fields = BTreeMap::new();
    for row in rows(path)? {
        if let (Some(field), Some(value)) = (row.get(0), row.get(1)) {
            if !field.is_empty() {
                fields.insert(field.to_string(), value.to_string());
            }
        }
    }
    Ok(fields)
}

/// Terpene rows of a `Type,Name,Value` file (two-column `Name,Value`
/// files are accepted too). Non-terpene rows are ignored.
pub fn read_chemicals(
    path: &Path,
    bundle: &Path,
    diags: &mut Diagnostics,
) -> Result<TerpeneProfile, csv::Error> {
    let mut profile = TerpeneProfile::new();
    for row in rows(path)? {
        let (name, value) = match row.len() {
            0 | 1 => continue,
            2 => (&row[0], &row[1]),
            _ => (&row[1], &row[2]),
        };
        let Some(key) = terpene::classify(name) else { continue };

        let amount = terpene::parse_percentage(value).unwrap_or_else(|| {
            diags.push(Warning::MalformedNumeric {
                bundle: bundle.to_path_buf(),
                field: format!("terpene {}", name),
                raw: value.to_string(),
            });
            0.0
        });
        // Synonyms that fold together are the same compound.
        *profile.entry(key).or_insert(0.0) += amount;
    }
    Ok(profile)
}

/// `Type,Distance,Strain,RSP` rows.
pub fn read_variants(
    path: &Path,
    bundle: &Path,
    diags: &mut Diagnostics,
) -> Result<Vec<Observation>, csv::Error> {
    let mut out = Vec::new();
    for row in rows(path)? {
        let name = display_name(row.get(2).unwrap_or_default());
        if name.is_empty() {
            tracing::debug!(bundle = %bundle.display(), "skipping relationship row without a name");
            continue;
        }
        let raw = row.get(1).unwrap_or_default();
        let distance = parse_distance(raw).unwrap_or_else(|| {
            diags.push(Warning::MalformedNumeric {
                bundle: bundle.to_path_buf(),
                field: format!("distance to {}", name),
                raw: raw.to_string(),
            });
            0.0
        });
        out.push(Observation {
            relation: row.get(0).unwrap_or_default().to_string(),
            distance,
            name,
            canonical_id: row.get(3).and_then(CanonicalId::parse),
        });
    }
    Ok(out)
}

/// Genetic distances are finite and non-negative.
pub(crate) fn parse_distance(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}
