//! Bundle-tree fixtures shared by the end-to-end tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const METADATA: &str = "Field,Value\nType,Hybrid\nRarity,Common\n";

/// Write one bundle directory with the given files.
pub fn bundle(root: &Path, dir: &str, files: &[(&str, &str)]) -> PathBuf {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    for (name, body) in files {
        fs::write(path.join(name), body).unwrap();
    }
    path
}

/// `Type,Name,Value` rows for the given terpenes, as percentages.
pub fn chemicals(terpenes: &[(&str, f64)]) -> String {
    let mut out = String::from("Type,Name,Value\n");
    for (name, value) in terpenes {
        out.push_str(&format!("Terpenoid,{},{}%\n", name, value));
    }
    out
}

/// `Type,Distance,Strain,RSP` rows.
pub fn variants(rows: &[(f64, &str, &str)]) -> String {
    let mut out = String::from("Type,Distance,Strain,RSP\n");
    for (distance, name, rsp) in rows {
        out.push_str(&format!("all_samples,{},{},{}\n", distance, name, rsp));
    }
    out
}

/// A complete bundle: metadata, chemicals and variants all present.
pub fn complete(
    root: &Path,
    dir: &str,
    terpenes: &[(&str, f64)],
    relatives: &[(f64, &str, &str)],
) -> PathBuf {
    let stem = dir.split('-').next().unwrap_or(dir);
    let (meta, chem, vars) = (
        format!("{stem}.metadata.csv"),
        format!("{stem}.chemicals.csv"),
        format!("{stem}.variants.csv"),
    );
    let (chem_body, vars_body) = (chemicals(terpenes), variants(relatives));
    bundle(
        root,
        dir,
        &[
            (meta.as_str(), METADATA),
            (chem.as_str(), chem_body.as_str()),
            (vars.as_str(), vars_body.as_str()),
        ],
    )
}
