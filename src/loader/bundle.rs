//! Bundle directories: name parsing and artifact discovery.
//!
//! A bundle is one directory per strain named
//! `{display_name_with_underscores}-{canonical_id}`, holding up to four
//! artifacts. Display names may contain hyphens themselves
//! (`Sour-Diesel-rsp11033`), so the id is the rightmost hyphen token that
//! matches the id pattern, not the first split.

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::CanonicalId;

/// Parsed bundle directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleName {
    pub display_name: String,
    pub canonical_id: Option<CanonicalId>,
}

impl BundleName {
    /// Parse a directory name.
    ///
    /// When no token matches the id pattern the whole name is the display
    /// name and `canonical_id` is `None`; the loader reports that as a
    /// missing canonical id rather than guessing.
    pub fn parse(dir_name: &str) -> Self {
        let tokens: Vec<&str> = dir_name.split('-').collect();
        let found = tokens
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, t)| CanonicalId::parse(t).map(|id| (i, id)));

        match found {
            Some((i, id)) if i > 0 => Self {
                display_name: display_name(&tokens[..i].join("-")),
                canonical_id: Some(id),
            },
            // An id with nothing before it is not a name.
            _ => Self {
                display_name: display_name(dir_name),
                canonical_id: None,
            },
        }
    }
}

/// Underscores become spaces, whitespace runs collapse, ends are trimmed.
pub fn display_name(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// One artifact file and whether it carries content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub non_empty: bool,
}

impl ArtifactFile {
    fn probe(path: PathBuf) -> Self {
        let non_empty = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        Self { path, non_empty }
    }

    /// The path, only if the artifact has content.
    pub fn usable(&self) -> Option<&Path> {
        self.non_empty.then_some(self.path.as_path())
    }
}

/// Artifacts discovered inside one bundle directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleArtifacts {
    pub metadata: Option<ArtifactFile>,
    pub chemicals: Option<ArtifactFile>,
    pub variants: Option<ArtifactFile>,
    pub summary: Option<ArtifactFile>,
}

const METADATA_SUFFIX: &str = ".metadata.csv";
const CHEMICALS_SUFFIX: &str = ".chemicals.csv";
const VARIANTS_SUFFIX: &str = ".variants.csv";
const SUMMARY_SUFFIX: &str = "_summary.txt";

impl BundleArtifacts {
    /// List `dir` and classify its files by suffix. With several candidates
    /// for one artifact, the smallest file name wins.
    pub fn discover(dir: &Path) -> std::io::Result<Self> {
        let mut names: Vec<String> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        let pick = |suffix: &str| {
            names
                .iter()
                .find(|n| n.ends_with(suffix))
                .map(|n| ArtifactFile::probe(dir.join(n)))
        };

        Ok(Self {
            metadata: pick(METADATA_SUFFIX),
            chemicals: pick(CHEMICALS_SUFFIX),
            variants: pick(VARIANTS_SUFFIX),
            summary: pick(SUMMARY_SUFFIX),
        })
    }

    /// The relationship artifact: `variants.csv` when it has content,
    /// otherwise the legacy summary.
    pub fn relationships(&self) -> Option<(&Path, crate::model::RelationshipSource)> {
        use crate::model::RelationshipSource;

        if let Some(path) = self.variants.as_ref().and_then(ArtifactFile::usable) {
            return Some((path, RelationshipSource::Variants));
        }
        self.summary
            .as_ref()
            .and_then(ArtifactFile::usable)
            .map(|path| (path, RelationshipSource::Summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_rightmost_id_token() {
        let b = BundleName::parse("Sour-Diesel-rsp11033");
        assert_eq!(b.display_name, "Sour-Diesel");
        assert_eq!(b.canonical_id, CanonicalId::parse("RSP11033"));
    }

    #[test]
    fn underscores_become_spaces() {
        let b = BundleName::parse("Blue_Dream-rsp100");
        assert_eq!(b.display_name, "Blue Dream");
        assert_eq!(b.canonical_id.unwrap().as_str(), "RSP100");
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        let b = BundleName::parse("blue dream -rsp100");
        assert_eq!(b.display_name, "blue dream");
    }

    #[test]
    fn name_token_resembling_id_is_not_used_when_later_id_exists() {
        let b = BundleName::parse("RSP_Kush-rsp12-rsp99");
        assert_eq!(b.display_name, "RSP Kush-rsp12");
        assert_eq!(b.canonical_id.unwrap().as_str(), "RSP99");
    }

    #[test]
    fn missing_id_keeps_whole_name() {
        let b = BundleName::parse("Mystery_Strain");
        assert_eq!(b.display_name, "Mystery Strain");
        assert!(b.canonical_id.is_none());

        let b = BundleName::parse("rsp100");
        assert_eq!(b.display_name, "rsp100");
        assert!(b.canonical_id.is_none());
    }

    #[test]
    fn discovers_artifacts_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("X.metadata.csv"), "Field,Value\n").unwrap();
        fs::write(dir.path().join("X.chemicals.csv"), "").unwrap();
        fs::write(dir.path().join("X_summary.txt"), "X (RSP1) Summary\n").unwrap();

        let found = BundleArtifacts::discover(dir.path()).unwrap();
        assert!(found.metadata.as_ref().unwrap().non_empty);
        assert!(!found.chemicals.as_ref().unwrap().non_empty);
        assert!(found.variants.is_none());
        let (_, source) = found.relationships().unwrap();
        assert_eq!(source, crate::model::RelationshipSource::Summary);
    }

    proptest::proptest! {
        #[test]
        fn parse_recovers_name_and_id(
            name in "[A-Za-z][A-Za-z_ ]{0,20}",
            digits in "[0-9]{1,6}",
        ) {
            let b = BundleName::parse(&format!("{}-rsp{}", name, digits));
            proptest::prop_assert_eq!(b.display_name, display_name(&name));
            let id = b.canonical_id.unwrap();
            proptest::prop_assert_eq!(id.as_str(), format!("RSP{}", digits));
        }
    }
}
