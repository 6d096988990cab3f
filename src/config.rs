//! Analysis configuration.
//!
//! Every parameter of a run lives in [`AnalysisConfig`]; defaults reproduce
//! the reference analysis (K range 2..=15, reported K of 2 and 3, 25
//! restarts, seed 42, average linkage). Configs load from JSON, and any
//! missing field takes its default.

use crate::cluster::{KMeansInit, Linkage};
use crate::data::{DatasetLoader, DEFAULT_AGGREGATE_PATTERNS};
use crate::error::{KlyngeError, Result};
use crate::preprocessing::{StandardizeOptions, StdKind, ZeroVariancePolicy};
use crate::primitives::Matrix;
use crate::selection::{ClusterCountSelector, VoteMethod};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Parameters of one analysis run.
///
/// # Examples
///
/// ```
/// use klynge::config::AnalysisConfig;
///
/// let config = AnalysisConfig::from_json_str(r#"{"report_ks": [4], "seed": 7}"#)
///     .expect("valid config");
/// assert_eq!(config.report_ks, vec![4]);
/// assert_eq!(config.restarts, 25);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Input table; CLI arguments take precedence.
    pub data_path: Option<PathBuf>,
    /// Field delimiter of the input table.
    pub delimiter: char,
    /// Column holding municipality names.
    pub id_column: String,
    /// Case-insensitive substrings marking aggregate rows.
    pub aggregate_patterns: Vec<String>,
    /// Reject values outside 0..=100.
    pub check_percentages: bool,
    /// Standard deviation used for z-scores.
    pub std_kind: StdKind,
    /// Handling of constant columns.
    pub zero_variance: ZeroVariancePolicy,
    /// Smallest K for the selection diagnostics.
    pub k_min: usize,
    /// Largest K for the selection diagnostics.
    pub k_max: usize,
    /// K values to fit, summarize and compare.
    pub report_ks: Vec<usize>,
    /// k-means restarts per K.
    pub restarts: usize,
    /// k-means iteration cap per restart.
    pub max_iter: usize,
    /// Seed for every k-means fit.
    pub seed: u64,
    /// k-means centroid seeding.
    pub init: KMeansInit,
    /// Hierarchical linkage.
    pub linkage: Linkage,
    /// Run the multi-index vote.
    pub vote: bool,
    /// Partition family the vote's indices score.
    pub vote_method: VoteMethod,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            delimiter: ',',
            id_column: "kommune".to_string(),
            aggregate_patterns: DEFAULT_AGGREGATE_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            check_percentages: true,
            std_kind: StdKind::default(),
            zero_variance: ZeroVariancePolicy::default(),
            k_min: 2,
            k_max: 15,
            report_ks: vec![2, 3],
            restarts: 25,
            max_iter: 100,
            seed: 42,
            init: KMeansInit::default(),
            linkage: Linkage::default(),
            vote: true,
            vote_method: VoteMethod::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parses a JSON config.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON or unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text).map_err(|e| match e {
            KlyngeError::Json(err) => {
                KlyngeError::Config(format!("{}: {err}", path.display()))
            }
            other => other,
        })
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values no run could use.
    ///
    /// # Errors
    ///
    /// Returns [`KlyngeError::InvalidRange`] for a bad K range,
    /// [`KlyngeError::Config`] for other problems.
    pub fn validate(&self) -> Result<()> {
        if self.k_min == 0 || self.k_min > self.k_max {
            return Err(KlyngeError::InvalidRange {
                k_min: self.k_min,
                k_max: self.k_max,
            });
        }
        if self.report_ks.is_empty() {
            return Err(KlyngeError::Config("report_ks is empty".to_string()));
        }
        if let Some(&k) = self.report_ks.iter().find(|&&k| k == 0) {
            return Err(KlyngeError::Config(format!("report_ks contains K = {k}")));
        }
        if self.restarts == 0 {
            return Err(KlyngeError::Config("restarts must be at least 1".to_string()));
        }
        if self.max_iter == 0 {
            return Err(KlyngeError::Config("max_iter must be at least 1".to_string()));
        }
        if !self.delimiter.is_ascii() || self.delimiter.is_ascii_alphanumeric() {
            return Err(KlyngeError::Config(format!(
                "delimiter {:?} must be a single ASCII punctuation or whitespace character",
                self.delimiter
            )));
        }
        if self.id_column.trim().is_empty() {
            return Err(KlyngeError::Config("id_column is empty".to_string()));
        }
        Ok(())
    }

    /// Loader configured from this config.
    #[must_use]
    pub fn loader(&self) -> DatasetLoader {
        // validate() restricts the delimiter to ASCII
        let delimiter = u8::try_from(self.delimiter).unwrap_or(b',');
        DatasetLoader::new(self.id_column.clone())
            .with_delimiter(delimiter)
            .with_aggregate_patterns(self.aggregate_patterns.iter().cloned())
            .with_percentage_check(self.check_percentages)
    }

    /// Standardization options.
    #[must_use]
    pub fn standardize_options(&self) -> StandardizeOptions {
        StandardizeOptions {
            std_kind: self.std_kind,
            zero_variance: self.zero_variance,
        }
    }

    /// Lowers `k_max` to the number of distinct rows of `x`, returning the
    /// warning to record when it had to.
    ///
    /// K-means cannot fill more clusters than there are distinct locations,
    /// and the diagnostics fit every K up to `k_max`.
    pub fn clamp_k_max(&mut self, x: &Matrix<f64>) -> Option<String> {
        let n = x.n_rows();
        let distinct = x.n_distinct_rows();
        if self.k_max <= distinct {
            return None;
        }
        warn!(k_max = self.k_max, n, distinct, "K range exceeds distinct profiles; clamped");
        let message = if distinct == n {
            format!("k_max {} exceeds {n} municipalities; clamped to {n}", self.k_max)
        } else {
            format!(
                "k_max {} exceeds {distinct} distinct profiles among {n} municipalities; clamped to {distinct}",
                self.k_max
            )
        };
        self.k_max = distinct;
        Some(message)
    }

    /// Selector over `k_min..=k_max` with this config's k-means settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the K range is invalid.
    pub fn selector(&self) -> Result<ClusterCountSelector> {
        self.selector_for(self.k_min, self.k_max)
    }

    pub(crate) fn selector_for(&self, k_min: usize, k_max: usize) -> Result<ClusterCountSelector> {
        Ok(ClusterCountSelector::new(k_min, k_max)?
            .with_n_init(self.restarts)
            .with_max_iter(self.max_iter)
            .with_seed(self.seed)
            .with_init(self.init))
    }
}
