//! Per-cluster summaries and label alignment.
//!
//! A [`ClusterSummary`] joins an [`Assignment`] onto the raw (unstandardized)
//! percentages and reports each cluster's size and mean per activity.
//! [`align_labels`] renames one assignment's labels to agree with another's
//! through the contingency best matching.

use crate::cluster::Assignment;
use crate::data::Dataset;
use crate::error::Result;
use crate::metrics::Contingency;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Size and activity means of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    /// Cluster label (`1..=K`).
    pub label: usize,
    /// Number of municipalities.
    pub size: usize,
    /// Mean percentage per activity, in feature order.
    pub means: Vec<f64>,
}

/// One activity's deviation of a cluster mean from the overall mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    /// Activity column.
    pub feature: String,
    /// Cluster mean.
    pub cluster_mean: f64,
    /// Mean over all municipalities.
    pub overall_mean: f64,
    /// `cluster_mean - overall_mean`.
    pub difference: f64,
}

/// Per-cluster activity profile of an assignment over raw percentages.
///
/// # Examples
///
/// ```
/// use klynge::prelude::*;
///
/// let raw = Dataset::new(
///     vec!["A".into(), "B".into(), "C".into()],
///     vec!["teater".into()],
///     Matrix::from_vec(3, 1, vec![10.0, 20.0, 61.0]).expect("valid matrix"),
/// ).expect("valid dataset");
/// let labels = Assignment::from_pairs("k-means@2", [("A", 1), ("B", 1), ("C", 2)])
///     .expect("valid labels");
///
/// let summary = ClusterSummary::new(&raw, &labels).expect("keys match");
/// assert_eq!(summary.profile(1).map(|p| p.size), Some(2));
/// assert_eq!(summary.profile(1).map(|p| p.means[0]), Some(15.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    method: String,
    features: Vec<String>,
    overall_means: Vec<f64>,
    clusters: Vec<ClusterProfile>,
}

impl ClusterSummary {
    /// Summarizes `assignment` over `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`KlyngeError::KeyMismatch`](crate::KlyngeError::KeyMismatch)
    /// if the assignment does not label exactly the dataset's municipalities.
    pub fn new(raw: &Dataset, assignment: &Assignment) -> Result<Self> {
        let labels = assignment.labels_for(raw.keys())?;
        let n_features = raw.n_features();

        let mut sums: BTreeMap<usize, (usize, Vec<f64>)> = BTreeMap::new();
        for (row, &label) in raw.values().rows().zip(&labels) {
            let (count, sum) = sums
                .entry(label)
                .or_insert_with(|| (0, vec![0.0; n_features]));
            *count += 1;
            for (s, &v) in sum.iter_mut().zip(row) {
                *s += v;
            }
        }

        let clusters = sums
            .into_iter()
            .map(|(label, (size, sum))| ClusterProfile {
                label,
                size,
                means: sum.into_iter().map(|s| s / size as f64).collect(),
            })
            .collect();

        Ok(Self {
            method: assignment.method().to_string(),
            features: raw.features().to_vec(),
            overall_means: raw.values().column_means(),
            clusters,
        })
    }

    /// Method of the summarized assignment.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Activity columns.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Mean per activity over all municipalities.
    #[must_use]
    pub fn overall_means(&self) -> &[f64] {
        &self.overall_means
    }

    /// Profiles in increasing label order.
    #[must_use]
    pub fn clusters(&self) -> &[ClusterProfile] {
        &self.clusters
    }

    /// Profile of one label.
    #[must_use]
    pub fn profile(&self, label: usize) -> Option<&ClusterProfile> {
        self.clusters.iter().find(|c| c.label == label)
    }

    /// Label to size.
    #[must_use]
    pub fn sizes(&self) -> BTreeMap<usize, usize> {
        self.clusters.iter().map(|c| (c.label, c.size)).collect()
    }

    /// The `n` activities where `label` departs most from the overall mean,
    /// largest absolute difference first. Empty for an unknown label.
    #[must_use]
    pub fn distinguishing(&self, label: usize, n: usize) -> Vec<Deviation> {
        let Some(profile) = self.profile(label) else {
            return Vec::new();
        };
        let mut deviations: Vec<Deviation> = self
            .features
            .iter()
            .zip(&profile.means)
            .zip(&self.overall_means)
            .map(|((feature, &cluster_mean), &overall_mean)| Deviation {
                feature: feature.clone(),
                cluster_mean,
                overall_mean,
                difference: cluster_mean - overall_mean,
            })
            .collect();
        deviations.sort_by(|a, b| b.difference.abs().total_cmp(&a.difference.abs()));
        deviations.truncate(n);
        deviations
    }
}

/// Rounds to one decimal for display.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl fmt::Display for ClusterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .features
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("activity".len());

        writeln!(f, "{}", self.method)?;
        write!(f, "{:<name_width$}", "activity")?;
        for c in &self.clusters {
            write!(f, " {:>8}", format!("#{}", c.label))?;
        }
        writeln!(f, " {:>8}", "all")?;

        write!(f, "{:<name_width$}", "n")?;
        for c in &self.clusters {
            write!(f, " {:>8}", c.size)?;
        }
        let total: usize = self.clusters.iter().map(|c| c.size).sum();
        writeln!(f, " {total:>8}")?;

        for (j, feature) in self.features.iter().enumerate() {
            write!(f, "{feature:<name_width$}")?;
            for c in &self.clusters {
                write!(f, " {:>8.1}", round1(c.means[j]))?;
            }
            writeln!(f, " {:>8.1}", round1(self.overall_means[j]))?;
        }
        Ok(())
    }
}

/// Renames `target`'s labels to agree with `reference` where the two overlap.
///
/// Label pairs come from [`Contingency::best_matching`]; labels of `target`
/// left unmatched get fresh labels above every label in `reference`.
///
/// # Errors
///
/// Returns an error if the assignments cover different municipalities.
pub fn align_labels(target: &Assignment, reference: &Assignment) -> Result<Assignment> {
    let table = Contingency::from_assignments(reference, target)?;
    let mut mapping: BTreeMap<usize, usize> = table
        .best_matching()
        .into_iter()
        .map(|(reference_label, target_label)| (target_label, reference_label))
        .collect();

    let mut next = reference.labels().iter().copied().max().unwrap_or(0);
    for &label in table.col_labels() {
        mapping.entry(label).or_insert_with(|| {
            next += 1;
            next
        });
    }
    target.relabel(&mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Matrix;

    fn raw() -> Dataset {
        Dataset::new(
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            vec!["teater".into(), "koncert".into()],
            Matrix::from_vec(4, 2, vec![10.0, 50.0, 20.0, 52.0, 60.0, 48.0, 70.0, 50.0]).unwrap(),
        )
        .unwrap()
    }

    fn kmeans() -> Assignment {
        Assignment::from_pairs("k-means@2", [("A", 1), ("B", 1), ("C", 2), ("D", 2)]).unwrap()
    }

    #[test]
    fn test_profiles() {
        let summary = ClusterSummary::new(&raw(), &kmeans()).unwrap();
        assert_eq!(summary.method(), "k-means@2");
        assert_eq!(summary.clusters().len(), 2);
        let first = summary.profile(1).unwrap();
        assert_eq!(first.size, 2);
        assert_eq!(first.means, vec![15.0, 51.0]);
        assert_eq!(summary.profile(2).unwrap().means, vec![65.0, 49.0]);
        assert_eq!(summary.overall_means(), &[40.0, 50.0]);
        assert_eq!(summary.sizes(), BTreeMap::from([(1, 2), (2, 2)]));
    }

    #[test]
    fn test_assignment_order_does_not_matter() {
        let shuffled =
            Assignment::from_pairs("k-means@2", [("D", 2), ("A", 1), ("C", 2), ("B", 1)]).unwrap();
        assert_eq!(
            ClusterSummary::new(&raw(), &shuffled).unwrap(),
            ClusterSummary::new(&raw(), &kmeans()).unwrap()
        );
    }

    #[test]
    fn test_key_mismatch() {
        let partial = Assignment::from_pairs("x", [("A", 1), ("B", 1)]).unwrap();
        assert!(ClusterSummary::new(&raw(), &partial).is_err());
    }

    #[test]
    fn test_distinguishing_ranks_by_absolute_difference() {
        let summary = ClusterSummary::new(&raw(), &kmeans()).unwrap();
        let top = summary.distinguishing(1, 2);
        assert_eq!(top[0].feature, "teater");
        assert_eq!(top[0].difference, -25.0);
        assert_eq!(top[1].feature, "koncert");
        assert_eq!(summary.distinguishing(1, 1).len(), 1);
        assert!(summary.distinguishing(9, 3).is_empty());
    }

    #[test]
    fn test_display_rounds_to_one_decimal() {
        let raw = Dataset::new(
            vec!["A".into(), "B".into(), "C".into()],
            vec!["museum".into()],
            Matrix::from_vec(3, 1, vec![10.0, 10.0, 10.5]).unwrap(),
        )
        .unwrap();
        let a = Assignment::from_pairs("k-means@1", [("A", 1), ("B", 1), ("C", 1)]).unwrap();
        let text = ClusterSummary::new(&raw, &a).unwrap().to_string();
        assert!(text.contains("10.2"), "{text}");
        assert!(text.starts_with("k-means@1"));
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(12.345), 12.3);
        assert_eq!(round1(12.36), 12.4);
    }

    #[test]
    fn test_align_labels_swapped() {
        let hier =
            Assignment::from_pairs("hierarchical-cut@2", [("A", 2), ("B", 2), ("C", 1), ("D", 1)])
                .unwrap();
        let aligned = align_labels(&hier, &kmeans()).unwrap();
        assert_eq!(aligned.labels(), kmeans().labels());
        assert_eq!(aligned.method(), "hierarchical-cut@2");
    }

    #[test]
    fn test_align_labels_extra_cluster_gets_fresh_label() {
        let three =
            Assignment::from_pairs("k-means@3", [("A", 3), ("B", 1), ("C", 2), ("D", 2)]).unwrap();
        let aligned = align_labels(&three, &kmeans()).unwrap();
        assert_eq!(aligned.label_of("C"), Some(2));
        assert_eq!(aligned.label_of("D"), Some(2));
        // A and B compete for reference label 1; one of them is renamed to 3
        let ab = [aligned.label_of("A").unwrap(), aligned.label_of("B").unwrap()];
        assert!(ab.contains(&1) && ab.contains(&3));
    }
}
