//! # Record Loader
//!
//! Scans a root directory of per-strain bundles and produces the raw record
//! map plus every genetic-distance observation found inside the bundles.
//!
//! ```text
//! plants/
//!   Blue_Dream-rsp100/
//!     Blue_Dream.metadata.csv     Field,Value
//!     Blue_Dream.chemicals.csv    Type,Name,Value
//!     Blue_Dream.variants.csv     Type,Distance,Strain,RSP
//!     Blue_Dream_summary.txt      legacy report (optional)
//! ```
//!
//! Nothing in a single bundle can fail the load: missing or malformed
//! artifacts degrade that record and are reported as [`Warning`]s. The only
//! fatal condition is an unreadable root.

pub mod artifacts;
pub mod bundle;
pub mod summary;
pub mod terpene;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostics::{Artifact, Diagnostics, Warning};
use crate::model::{CanonicalId, EdgeSet, RelationshipEdge, RelationshipSource, StrainRecord};
use crate::{Error, Result};

use artifacts::Observation;
use bundle::{ArtifactFile, BundleArtifacts, BundleName};

/// Records and edges as found on disk, before identity resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutput {
    /// Node key (display name, or `"{name} ({id})"` for a second strain
    /// sharing a name) → record. Includes placeholders for strains that are
    /// only named by other strains' relationship rows.
    pub records: BTreeMap<String, StrainRecord>,
    pub edges: EdgeSet<RelationshipEdge>,
    pub warnings: Vec<Warning>,
}

/// One bundle directory, parsed.
struct LoadedBundle {
    record: StrainRecord,
    observations: Vec<Observation>,
}

/// Load every bundle under `root`.
///
/// Bundles are visited in directory-name order and relationship rows in file
/// order, so repeated loads of an unchanged tree are equal.
pub fn load(root: &Path) -> Result<LoadOutput> {
    let entries = fs::read_dir(root).map_err(|source| Error::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut diags = Diagnostics::new();
    let mut dir_names: Vec<String> = Vec::new();
    let mut unnamed: Vec<PathBuf> = Vec::new();
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        // Follows symlinks.
        if !path.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if name.starts_with('.') => {}
            Ok(name) => dir_names.push(name),
            Err(_) => unnamed.push(path),
        }
    }
    dir_names.sort();
    unnamed.sort();
    for bundle in unnamed {
        tracing::debug!(bundle = %bundle.display(), "bundle name is not valid UTF-8");
        diags.push(Warning::MissingArtifact { bundle, artifact: Artifact::Bundle });
    }

    let mut bundles: BTreeMap<String, LoadedBundle> = BTreeMap::new();
    for dir_name in &dir_names {
        let loaded = load_bundle(&root.join(dir_name), dir_name, &mut diags);
        insert_bundle(&mut bundles, loaded, &mut diags);
    }

    let mut records: BTreeMap<String, StrainRecord> = BTreeMap::new();
    let mut observations: Vec<(String, Observation)> = Vec::new();
    for (key, loaded) in bundles {
        observations.extend(loaded.observations.into_iter().map(|o| (key.clone(), o)));
        records.insert(key, loaded.record);
    }

    let mut by_id: BTreeMap<CanonicalId, String> = BTreeMap::new();
    for (key, record) in &records {
        if let Some(id) = &record.canonical_id {
            by_id.entry(id.clone()).or_insert_with(|| key.clone());
        }
    }

    let mut edges = EdgeSet::new();
    let mut placeholders: BTreeMap<String, Option<CanonicalId>> = BTreeMap::new();

    for (this, obs) in observations {
        let target = endpoint(&records, &by_id, &obs);
        if target == this {
            continue;
        }
        edges.insert(RelationshipEdge::new(this, target.clone(), obs.distance));

        match records.get_mut(&target) {
            Some(existing) => {
                if existing.canonical_id.is_none() && obs.canonical_id.is_some() {
                    tracing::debug!(name = %target, "canonical id recovered from a relationship row");
                    existing.canonical_id = obs.canonical_id;
                }
            }
            None => {
                let slot = placeholders.entry(target).or_insert(None);
                if slot.is_none() {
                    *slot = obs.canonical_id;
                }
            }
        }
    }

    for (name, id) in placeholders {
        records.insert(name.clone(), StrainRecord::placeholder(name, id));
    }

    let complete = records.values().filter(|r| r.complete).count();
    tracing::info!(
        root = %root.display(),
        bundles = dir_names.len(),
        records = records.len(),
        complete,
        edges = edges.len(),
        warnings = diags.len(),
        "loaded strain bundles"
    );

    Ok(LoadOutput { records, edges, warnings: diags.into_vec() })
}

/// Node key for a relationship row. A row whose id disagrees with the
/// record of the same name points at the record holding that id, or at a
/// disambiguated placeholder when no bundle has it.
fn endpoint(
    records: &BTreeMap<String, StrainRecord>,
    by_id: &BTreeMap<CanonicalId, String>,
    obs: &Observation,
) -> String {
    let Some(id) = &obs.canonical_id else { return obs.name.clone() };
    let named = records.get(&obs.name).and_then(|r| r.canonical_id.as_ref());
    match (named, by_id.get(id)) {
        (Some(own), _) if own == id => obs.name.clone(),
        (None, _) if records.contains_key(&obs.name) => obs.name.clone(),
        (_, Some(key)) => key.clone(),
        (Some(_), None) => disambiguated(&obs.name, id),
        (None, None) => obs.name.clone(),
    }
}

/// Name for a second strain that shares a display name with another id.
fn disambiguated(name: &str, id: &CanonicalId) -> String {
    format!("{} ({})", name, id)
}

/// Keep one bundle per node key.
///
/// Two bundles with the same display name but different ids are different
/// strains: the preferred one keeps the plain name and the other is renamed
/// `"{name} ({id})"`. Otherwise they are taken as one strain and only the
/// preferred bundle, with its relationship rows, is kept. Preference is
/// complete first, then the one with an id, then the smaller id.
fn insert_bundle(
    bundles: &mut BTreeMap<String, LoadedBundle>,
    loaded: LoadedBundle,
    diags: &mut Diagnostics,
) {
    let name = loaded.record.display_name.clone();
    let Some(existing) = bundles.get(&name) else {
        bundles.insert(name, loaded);
        return;
    };

    let rank = |r: &StrainRecord| (!r.complete, r.canonical_id.is_none(), r.canonical_id.clone());
    let describe = |r: &StrainRecord| match &r.canonical_id {
        Some(id) => format!("{} ({})", r.display_name, id),
        None => r.display_name.clone(),
    };

    let candidates = vec![describe(&existing.record), describe(&loaded.record)];
    let replace = rank(&loaded.record) < rank(&existing.record);
    let distinct = matches!(
        (&existing.record.canonical_id, &loaded.record.canonical_id),
        (Some(a), Some(b)) if a != b
    );
    let chosen = if replace { describe(&loaded.record) } else { describe(&existing.record) };
    diags.push(Warning::AmbiguousIdentity { key: name.clone(), candidates, chosen });

    let (winner, loser) = match bundles.remove(&name) {
        Some(existing) if replace => (loaded, existing),
        Some(existing) => (existing, loaded),
        None => return,
    };
    bundles.insert(name, winner);

    if distinct {
        let mut loser = loser;
        if let Some(id) = loser.record.canonical_id.clone() {
            loser.record.display_name = disambiguated(&loser.record.display_name, &id);
            tracing::debug!(name = %loser.record.display_name, "renamed strain sharing a display name");
            insert_bundle(bundles, loser, diags);
        }
    } else {
        tracing::debug!(
            name = %loser.record.display_name,
            rows = loser.observations.len(),
            "dropped duplicate bundle"
        );
    }
}

fn load_bundle(dir: &Path, dir_name: &str, diags: &mut Diagnostics) -> LoadedBundle {
    let BundleName { mut display_name, mut canonical_id } = BundleName::parse(dir_name);
    tracing::debug!(bundle = dir_name, name = %display_name, "loading bundle");

    let missing = |diags: &mut Diagnostics, artifact: Artifact| {
        diags.push(Warning::MissingArtifact { bundle: dir.to_path_buf(), artifact });
    };

    let found = match BundleArtifacts::discover(dir) {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(bundle = dir_name, error = %e, "bundle directory unreadable");
            missing(diags, Artifact::Bundle);
            if canonical_id.is_none() {
                missing(diags, Artifact::CanonicalId);
            }
            let record = StrainRecord::new(display_name).with_id(canonical_id);
            return LoadedBundle { record, observations: Vec::new() };
        }
    };

    // Metadata
    let metadata = match found.metadata.as_ref().and_then(ArtifactFile::usable) {
        Some(path) => artifacts::read_metadata(path)
            .inspect_err(|e| tracing::debug!(bundle = dir_name, error = %e, "metadata unreadable"))
            .ok(),
        None => None,
    };
    if metadata.is_none() {
        missing(diags, Artifact::Metadata);
    }

    // Chemical profile
    let profile = match found.chemicals.as_ref().and_then(ArtifactFile::usable) {
        Some(path) => artifacts::read_chemicals(path, dir, diags)
            .inspect_err(|e| tracing::debug!(bundle = dir_name, error = %e, "chemicals unreadable"))
            .ok(),
        None => None,
    };
    if profile.is_none() {
        missing(diags, Artifact::Chemicals);
    }

    // Relationships
    let relationships = match found.relationships() {
        Some((path, RelationshipSource::Variants)) => artifacts::read_variants(path, dir, diags)
            .inspect_err(|e| tracing::debug!(bundle = dir_name, error = %e, "variants unreadable"))
            .ok()
            .map(|obs| (obs, RelationshipSource::Variants)),
        Some((path, RelationshipSource::Summary)) => summary::read(path, dir, diags)
            .inspect_err(|e| tracing::debug!(bundle = dir_name, error = %e, "summary unreadable"))
            .ok()
            .map(|s| {
                adopt_title(&s, &mut display_name, &mut canonical_id);
                (s.observations, RelationshipSource::Summary)
            }),
        None => None,
    };
    if relationships.is_none() {
        missing(diags, Artifact::Relationships);
    }

    // The summary title is the id of last resort.
    if canonical_id.is_none() {
        if let Some(path) = found.summary.as_ref().and_then(ArtifactFile::usable) {
            let mut scratch = Diagnostics::new();
            if let Ok(s) = summary::read(path, dir, &mut scratch) {
                adopt_title(&s, &mut display_name, &mut canonical_id);
            }
        }
    }
    if canonical_id.is_none() {
        missing(diags, Artifact::CanonicalId);
    }

    let complete = metadata.is_some() && profile.is_some() && relationships.is_some();
    let (observations, source) = match relationships {
        Some((obs, source)) => (obs, Some(source)),
        None => (Vec::new(), None),
    };

    let mut record = StrainRecord::new(display_name)
        .with_id(canonical_id)
        .with_profile(profile.unwrap_or_default())
        .mark_complete(complete);
    record.metadata = metadata.unwrap_or_default();
    record.relationship_source = source;

    LoadedBundle { record, observations }
}

/// A directory name without an id takes both name and id from the summary
/// title, so `rsp500/` with `Lemon Haze (RSP500) Summary` becomes Lemon Haze.
fn adopt_title(summary: &summary::Summary, name: &mut String, id: &mut Option<CanonicalId>) {
    if id.is_some() {
        return;
    }
    let Some(title_id) = summary.canonical_id.clone() else { return };
    if let Some(title) = summary.name.as_ref().filter(|t| !t.is_empty()) {
        if title != name {
            tracing::debug!(from = %name, to = %title, "display name taken from summary title");
            *name = title.clone();
        }
    }
    *id = Some(title_id);
}
