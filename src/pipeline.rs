//! The whole workflow: load, standardize, choose K, partition, summarize,
//! compare.
//!
//! [`Analysis`] runs every step from an [`AnalysisConfig`] and collects the
//! artifacts in a serializable [`AnalysisReport`].

use crate::cluster::{AgglomerativeClustering, Assignment, Dendrogram};
use crate::config::AnalysisConfig;
use crate::data::Dataset;
use crate::error::{KlyngeError, Result};
use crate::metrics::Contingency;
use crate::preprocessing::standardize;
use crate::report::{align_labels, ClusterSummary, Deviation};
use crate::selection::{default_indices, SelectionDiagnostics};
use crate::traits::UnsupervisedEstimator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Activities listed per cluster in [`KMeansRun::distinguishing`].
pub const DISTINGUISHING_PER_CLUSTER: usize = 3;

/// One k-means fit at a reported K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansRun {
    /// Number of clusters.
    pub k: usize,
    /// Keyed labels `1..=K`.
    pub assignment: Assignment,
    /// Total within-cluster sum of squares (standardized units).
    pub total_within_ss: f64,
    /// Between-cluster sum of squares.
    pub between_ss: f64,
    /// False if the winning restart hit the iteration cap.
    pub converged: bool,
    /// Lloyd iterations of the winning restart.
    pub n_iter: usize,
    /// Restarts lost to empty clusters.
    pub restarts_discarded: usize,
    /// Profile over raw percentages.
    pub summary: ClusterSummary,
    /// Label to the activities where that cluster departs most from the
    /// overall mean.
    pub distinguishing: BTreeMap<usize, Vec<Deviation>>,
}

/// One dendrogram cut at a reported K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalCut {
    /// Number of clusters.
    pub k: usize,
    /// Keyed labels `1..=K`, numbered by first appearance.
    pub assignment: Assignment,
    /// Profile over raw percentages.
    pub summary: ClusterSummary,
}

/// k-means against the hierarchical cut at the same K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Number of clusters.
    pub k: usize,
    /// Rows: k-means labels; columns: hierarchical labels.
    pub contingency: Contingency,
    /// `(k-means label, hierarchical label)` pairs of the best matching.
    pub matching: Vec<(usize, usize)>,
    /// Municipalities on matched cells.
    pub agreement: usize,
    /// Adjusted Rand index of the two partitions.
    pub adjusted_rand_index: f64,
    /// Hierarchical labels renamed to agree with k-means.
    pub aligned: Assignment,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Configuration after clamping.
    pub config: AnalysisConfig,
    /// Municipalities in the analysis, in row order.
    pub keys: Vec<String>,
    /// Activity columns.
    pub features: Vec<String>,
    /// Raw column means used for standardization.
    pub mean: Vec<f64>,
    /// Raw column standard deviations used for standardization.
    pub std: Vec<f64>,
    /// The standardized table the methods ran on.
    pub standardized: Dataset,
    /// Elbow, silhouette and vote.
    pub diagnostics: SelectionDiagnostics,
    /// k-means fits at each reported K.
    pub kmeans: Vec<KMeansRun>,
    /// Full merge history on the standardized data.
    pub dendrogram: Dendrogram,
    /// Dendrogram cuts at each reported K.
    pub hierarchical: Vec<HierarchicalCut>,
    /// Cross-method comparisons at each reported K.
    pub comparisons: Vec<Comparison>,
    /// Recorded degradations.
    pub warnings: Vec<String>,
}

/// A configured analysis.
///
/// # Examples
///
/// ```
/// use klynge::config::AnalysisConfig;
/// use klynge::data::Dataset;
/// use klynge::pipeline::Analysis;
/// use klynge::primitives::Matrix;
///
/// let raw = Dataset::new(
///     (1..=6).map(|i| format!("Kommune {i}")).collect(),
///     vec!["teater".into(), "koncert".into()],
///     Matrix::from_vec(6, 2, vec![
///         10.0, 12.0, 11.0, 13.0, 10.5, 12.5,
///         60.0, 70.0, 61.0, 71.0, 59.0, 69.5,
///     ]).expect("valid matrix"),
/// ).expect("valid dataset");
///
/// let config = AnalysisConfig { k_max: 4, report_ks: vec![2], ..AnalysisConfig::default() };
/// let report = Analysis::new(config).expect("valid config").run(&raw).expect("run succeeds");
///
/// assert_eq!(report.comparisons[0].agreement, 6);
/// ```
#[derive(Debug, Clone)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    /// Validates `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns any error from [`AnalysisConfig::validate`].
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Loads `path` with the configured loader and runs the analysis.
    ///
    /// # Errors
    ///
    /// Returns load errors or any error from [`Analysis::run`].
    pub fn run_path(&self, path: impl AsRef<Path>) -> Result<AnalysisReport> {
        let raw = self.config.loader().load_path(path)?;
        self.run(&raw)
    }

    /// Runs every step on an already loaded raw dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if a reported K exceeds the number of
    /// municipalities, standardization fails, or a k-means fit fails.
    pub fn run(&self, raw: &Dataset) -> Result<AnalysisReport> {
        let n = raw.n_observations();
        let mut config = self.config.clone();
        let mut warnings = Vec::new();

        if let Some(&k) = config.report_ks.iter().find(|&&k| k > n) {
            return Err(KlyngeError::InvalidK { k, n_samples: n });
        }
        warnings.extend(config.clamp_k_max(raw.values()));
        let selector = config.selector_for(config.k_min, config.k_max)?;

        info!(
            municipalities = n,
            activities = raw.n_features(),
            "starting analysis"
        );

        let z = standardize(raw, config.standardize_options())?;
        warnings.extend(z.warnings.iter().cloned());
        let x = z.dataset.values();

        let indices = if config.vote {
            default_indices()
        } else {
            Vec::new()
        };
        let diagnostics = selector.diagnostics(x, &indices, config.vote_method)?;
        if let Some(sil) = &diagnostics.silhouette {
            info!(best_k = sil.best_k, "silhouette curve computed");
        }
        if let Some(vote) = &diagnostics.vote {
            info!(leaders = ?vote.leaders(), "index vote tallied");
        }

        let dendrogram = AgglomerativeClustering::new(config.linkage).fit(x)?;
        debug!(linkage = %config.linkage, "dendrogram built");

        let mut kmeans = Vec::with_capacity(config.report_ks.len());
        let mut hierarchical = Vec::with_capacity(config.report_ks.len());
        let mut comparisons = Vec::with_capacity(config.report_ks.len());

        for &k in &config.report_ks {
            let fit = selector.kmeans(k).fit(x)?;
            if !fit.converged() {
                warnings.push(format!(
                    "k-means at K={k} stopped at the iteration cap without converging"
                ));
            }
            let km_assignment = fit.to_assignment(&z.dataset)?;
            let hc_assignment = dendrogram.to_assignment(&z.dataset, k)?;

            let contingency = Contingency::from_assignments(&km_assignment, &hc_assignment)?;
            let matching = contingency.best_matching();
            let agreement = contingency.matched_count();
            info!(k, agreement, n, "k-means and hierarchical cut compared");

            comparisons.push(Comparison {
                k,
                adjusted_rand_index: contingency.adjusted_rand_index(),
                aligned: align_labels(&hc_assignment, &km_assignment)?,
                contingency,
                matching,
                agreement,
            });
            let summary = ClusterSummary::new(raw, &km_assignment)?;
            let distinguishing = summary
                .clusters()
                .iter()
                .map(|c| {
                    (
                        c.label,
                        summary.distinguishing(c.label, DISTINGUISHING_PER_CLUSTER),
                    )
                })
                .collect();
            kmeans.push(KMeansRun {
                k,
                summary,
                distinguishing,
                assignment: km_assignment,
                total_within_ss: fit.total_within_ss(),
                between_ss: fit.between_ss(),
                converged: fit.converged(),
                n_iter: fit.n_iter(),
                restarts_discarded: fit.restarts_discarded(),
            });
            hierarchical.push(HierarchicalCut {
                k,
                summary: ClusterSummary::new(raw, &hc_assignment)?,
                assignment: hc_assignment,
            });
        }

        Ok(AnalysisReport {
            config,
            keys: raw.keys().to_vec(),
            features: raw.features().to_vec(),
            mean: z.mean,
            std: z.std,
            standardized: z.dataset,
            diagnostics,
            kmeans,
            dendrogram,
            hierarchical,
            comparisons,
            warnings,
        })
    }
}
