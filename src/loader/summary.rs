//! Legacy `{name}_summary.txt` reader.
//!
//! Older bundles carry their relationships only in this human-readable
//! report. Relevant shape:
//!
//! ```text
//! Blue Dream (RSP100) Summary
//! ...
//! Nearest Genetic Relatives (All Samples):
//!   0.123 - Sour Diesel (RSP200)(rsp200)
//!
//! Nearest Genetic Relatives (Base Tree):
//!   0.150 - OG Kush (RSP300)(rsp300)
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::artifacts::{parse_distance, Observation};
use super::bundle::display_name;
use crate::diagnostics::{Diagnostics, Warning};
use crate::model::CanonicalId;

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(.+?)\s*\((RSP\d+)\)\s*Summary\s*$").expect("valid title regex")
});

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\S+)\s+-\s+(.+?)\s*\((RSP\d+)\)").expect("valid relative regex")
});

/// Section headers and the relation label their rows get.
const SECTIONS: &[(&str, &str)] = &[
    ("Nearest Genetic Relatives (All Samples):", "all_samples"),
    ("Nearest Genetic Relatives (Base Tree):", "base_tree"),
    ("Most Genetically Distant Strains:", "most_distant"),
];

/// What a summary report yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub name: Option<String>,
    pub canonical_id: Option<CanonicalId>,
    pub observations: Vec<Observation>,
}

pub fn parse(content: &str, bundle: &Path, diags: &mut Diagnostics) -> Summary {
    let mut summary = Summary::default();

    if let Some(caps) = TITLE.captures(content) {
        summary.name = Some(display_name(&caps[1]));
        summary.canonical_id = CanonicalId::parse(&caps[2]);
    }

    let mut relation: Option<&str> = None;
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some((_, label)) = SECTIONS.iter().find(|(header, _)| trimmed == *header) {
            relation = Some(*label);
            continue;
        }
        if trimmed.is_empty() {
            relation = None;
            continue;
        }
        let Some(label) = relation else { continue };
        let Some(caps) = RELATIVE.captures(line) else { continue };

        let name = display_name(&caps[2]);
        let raw = &caps[1];
        let distance = parse_distance(raw).unwrap_or_else(|| {
            diags.push(Warning::MalformedNumeric {
                bundle: bundle.to_path_buf(),
                field: format!("distance to {}", name),
                raw: raw.to_string(),
            });
            0.0
        });
        summary.observations.push(Observation {
            relation: label.to_string(),
            distance,
            name,
            canonical_id: CanonicalId::parse(&caps[3]),
        });
    }

    summary
}

pub fn read(path: &Path, bundle: &Path, diags: &mut Diagnostics) -> std::io::Result<Summary> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse(&content, bundle, diags))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
================================================================================
Blue Dream (RSP100) Summary
================================================================================

GENERAL INFORMATION
--------------------------------------------------------------------------------
Grower: Acme

GENETIC RELATIONSHIPS
--------------------------------------------------------------------------------
Nearest Genetic Relatives (All Samples):
  0.123 - Sour Diesel (RSP200)(rsp200)
  0.140 - Jack-Herer (RSP201)(rsp201)

Nearest Genetic Relatives (Base Tree):
  0.150 - OG Kush (RSP300)(rsp300)

Most Genetically Distant Strains:
  x.y - Hemp (RSP900)(rsp900)

BLOCKCHAIN INFORMATION
";

    #[test]
    fn parses_title_and_sections() {
        let mut diags = Diagnostics::new();
        let s = parse(REPORT, Path::new("b"), &mut diags);

        assert_eq!(s.name.as_deref(), Some("Blue Dream"));
        assert_eq!(s.canonical_id, CanonicalId::parse("RSP100"));
        assert_eq!(s.observations.len(), 4);

        assert_eq!(s.observations[1].name, "Jack-Herer");
        assert_eq!(s.observations[1].relation, "all_samples");
        assert_eq!(s.observations[2].relation, "base_tree");
        assert_eq!(s.observations[2].distance, 0.150);
        assert_eq!(s.observations[3].relation, "most_distant");
        assert_eq!(s.observations[3].distance, 0.0);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn lines_outside_sections_are_ignored() {
        let mut diags = Diagnostics::new();
        let s = parse("0.1 - Stray (RSP1)(rsp1)\n", Path::new("b"), &mut diags);
        assert!(s.observations.is_empty());
        assert!(s.name.is_none());
    }
}
