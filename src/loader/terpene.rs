//! Terpene vocabulary and name normalisation.
//!
//! Lab reports spell the same compound many ways (`β-Myrcene`,
//! `beta myrcene`, `Myrcene`). Names are folded to one lowercase,
//! hyphen-joined form before they key a profile, so two strains measured
//! by different labs still compare on the same axes.

/// Terpene family names. A chemical row is a terpene iff its normalised
/// name contains one of these.
pub const TERPENE_FAMILIES: &[&str] = &[
    "pinene", "myrcene", "limonene", "caryophyllene", "humulene", "linalool",
    "terpinolene", "ocimene", "bisabolol", "nerolidol", "terpineol", "camphene",
    "carene", "fenchol", "fenchone", "borneol", "eucalyptol", "cineol", "geraniol",
    "guaiol", "phellandrene", "terpinene", "sabinene", "valencene", "farnesene",
    "cedrene", "isopulegol", "pulegone", "selinene", "eudesmol", "bergamotene",
    "cymene", "citral", "menthol", "camphor", "nerol",
];

/// Spellings that name the same compound as their target.
const SYNONYMS: &[(&str, &str)] = &[
    ("beta-myrcene", "myrcene"),
    ("beta-caryophyllene", "caryophyllene"),
    ("alpha-humulene", "humulene"),
    ("alpha-bisabolol", "bisabolol"),
    ("beta-ocimene", "ocimene"),
    ("alpha-terpinolene", "terpinolene"),
    ("1,8-cineole", "eucalyptol"),
    ("1,8-cineol", "eucalyptol"),
    ("cineole", "eucalyptol"),
    ("fenchyl-alcohol", "fenchol"),
    ("alpha-fenchol", "fenchol"),
    ("beta-linalool", "linalool"),
];

/// Stereo and isomer descriptors that do not change which axis a
/// concentration belongs to.
const DROPPED_TOKENS: &[&str] = &["d", "l", "r", "s", "e", "z", "+", "trans", "cis"];

/// Fold a raw compound name to its canonical key.
pub fn normalize(raw: &str) -> String {
    let mut expanded = String::with_capacity(raw.len() + 8);
    for ch in raw.trim().to_lowercase().chars() {
        match ch {
            'α' => expanded.push_str("alpha-"),
            'β' => expanded.push_str("beta-"),
            'γ' => expanded.push_str("gamma-"),
            'δ' => expanded.push_str("delta-"),
            '(' | ')' | '[' | ']' | '_' => expanded.push('-'),
            c if c.is_whitespace() => expanded.push('-'),
            c => expanded.push(c),
        }
    }

    let tokens: Vec<&str> = expanded
        .split('-')
        .filter(|t| !t.is_empty())
        .filter(|t| !DROPPED_TOKENS.contains(t))
        .map(|t| match t {
            "a" => "alpha",
            "b" => "beta",
            "g" => "gamma",
            other => other,
        })
        .collect();
    let joined = tokens.join("-");

    SYNONYMS
        .iter()
        .find(|(from, _)| *from == joined)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or(joined)
}

/// Canonical key for `raw` if it names a terpene, `None` otherwise.
pub fn classify(raw: &str) -> Option<String> {
    let name = normalize(raw);
    if TERPENE_FAMILIES.iter().any(|family| name.contains(family)) {
        Some(name)
    } else {
        None
    }
}

/// Parse a concentration cell such as `" 0.42 %"`.
///
/// Returns `None` for anything that is not a finite, non-negative number;
/// the caller substitutes `0.0` and reports it.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
