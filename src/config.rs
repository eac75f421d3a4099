//! Pipeline configuration.
//!
//! Every field has a default, so an empty TOML file is a valid config.
//! `STRAIN_GRAPH_ROOT` overrides `root` after the file is read.
//!
//! ```toml
//! root = "plants"
//!
//! [similarity]
//! measure = "cosine"          # or "weighted_primary"
//! threshold = 0.8
//!
//! [embedding]
//! enabled = true
//! dimensions = 3
//! seed = 42
//!
//! [phylogeny]
//! max_distance = 0.2
//! max_children = 3
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::similarity::{SimilarityMeasure, DEFAULT_THRESHOLD};
use crate::{Error, Result};

/// Environment variable that overrides [`PipelineConfig::root`].
pub const ROOT_ENV: &str = "STRAIN_GRAPH_ROOT";

/// Fully-resolved pipeline configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding one bundle directory per strain.
    pub root: PathBuf,
    pub similarity: SimilarityConfig,
    pub embedding: EmbeddingConfig,
    pub phylogeny: PhylogenyConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("plants"),
            similarity: SimilarityConfig::default(),
            embedding: EmbeddingConfig::default(),
            phylogeny: PhylogenyConfig::default(),
        }
    }
}

/// `[similarity]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimilarityConfig {
    pub measure: SimilarityMeasure,
    /// Edges are kept only when `distance < threshold`.
    pub threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self { measure: SimilarityMeasure::Cosine, threshold: DEFAULT_THRESHOLD }
    }
}

/// Output dimensionality of the embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum Dimensions {
    Two,
    Three,
}

impl Dimensions {
    pub fn count(self) -> usize {
        match self {
            Dimensions::Two => 2,
            Dimensions::Three => 3,
        }
    }
}

impl TryFrom<u8> for Dimensions {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            2 => Ok(Dimensions::Two),
            3 => Ok(Dimensions::Three),
            other => Err(format!("dimensions must be 2 or 3, got {}", other)),
        }
    }
}

/// `[embedding]`: metric MDS parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Defaults to off when built without the `embedding` feature.
    pub enabled: bool,
    pub dimensions: Dimensions,
    /// Seed for the random starting layouts.
    pub seed: u64,
    /// Number of random starts; the lowest-stress layout is kept.
    pub n_init: usize,
    pub max_iter: usize,
    /// Stop a run once relative stress improvement falls to this.
    pub eps: f64,
    /// Distance assumed between strains with no observed relationship.
    pub default_distance: f64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(feature = "embedding"),
            dimensions: Dimensions::Three,
            seed: 42,
            n_init: 4,
            max_iter: 300,
            eps: 1e-3,
            default_distance: 1.0,
        }
    }
}

/// `[phylogeny]`: nearest-relative tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhylogenyConfig {
    /// Only relationships strictly closer than this become tree edges.
    pub max_distance: f64,
    /// Children attached per node, nearest first.
    pub max_children: usize,
}

impl Default for PhylogenyConfig {
    fn default() -> Self {
        Self { max_distance: 0.2, max_children: 3 }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, apply env overrides, validate.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(root) = env::var(ROOT_ENV) {
            if !root.is_empty() {
                self.root = PathBuf::from(root);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if !positive(self.similarity.threshold) {
            return Err(Error::InvalidConfig(format!(
                "similarity.threshold must be a positive number, got {}",
                self.similarity.threshold
            )));
        }
        let e = &self.embedding;
        if e.n_init == 0 || e.max_iter == 0 {
            return Err(Error::InvalidConfig(
                "embedding.n_init and embedding.max_iter must be at least 1".into(),
            ));
        }
        if !e.eps.is_finite() || e.eps < 0.0 {
            return Err(Error::InvalidConfig(format!("embedding.eps must be >= 0, got {}", e.eps)));
        }
        if !positive(e.default_distance) {
            return Err(Error::InvalidConfig(format!(
                "embedding.default_distance must be a positive number, got {}",
                e.default_distance
            )));
        }
        if !positive(self.phylogeny.max_distance) {
            return Err(Error::InvalidConfig(format!(
                "phylogeny.max_distance must be a positive number, got {}",
                self.phylogeny.max_distance
            )));
        }
        Ok(())
    }
}
