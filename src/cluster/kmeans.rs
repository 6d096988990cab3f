//! K-Means clustering algorithm.
//!
//! Lloyd iterations with several seeded restarts; the restart with the
//! lowest within-cluster sum of squares wins.

use super::Assignment;
use crate::data::Dataset;
use crate::error::{KlyngeError, Result};
use crate::metrics::{total_sum_of_squares, within_cluster_ss};
use crate::primitives::{squared_euclidean, Matrix};
use crate::traits::UnsupervisedEstimator;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How initial centroids are drawn for each restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KMeansInit {
    /// K distinct observations chosen uniformly at random.
    #[default]
    Random,
    /// k-means++ seeding (D² weighted sampling).
    PlusPlus,
}

/// K-Means clustering algorithm.
///
/// # Algorithm
///
/// For each of `n_init` restarts:
///
/// 1. Pick K distinct observations as initial centroids
/// 2. Assign each observation to its nearest centroid (ties go to the lower index)
/// 3. Move each centroid to the mean of its members
/// 4. Repeat until no assignment changes or `max_iter` is reached
///
/// A restart that leaves a cluster empty is discarded. The surviving
/// restart with the lowest total WSS is returned.
///
/// All randomness comes from one `StdRng` seeded with `random_state`, so
/// the result is a pure function of the data, the seed and the restart count.
///
/// # Examples
///
/// ```
/// use klynge::prelude::*;
///
/// let data = Matrix::from_vec(6, 2, vec![
///     1.0, 2.0,
///     1.5, 1.8,
///     5.0, 8.0,
///     8.0, 8.0,
///     1.0, 0.6,
///     9.0, 11.0,
/// ]).expect("Valid matrix dimensions and data length");
///
/// let fit = KMeans::new(2)
///     .with_n_init(10)
///     .with_random_state(1)
///     .fit(&data)
///     .expect("Fit succeeds with valid data");
///
/// assert_eq!(fit.labels().len(), 6);
/// assert!(fit.converged());
/// ```
///
/// # Performance
///
/// - Time complexity: O(r·n·k·d·i) where r=restarts, n=samples, k=clusters, d=features, i=iterations
/// - Space complexity: O(n + k·d)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters.
    n_clusters: usize,
    /// Number of independent restarts.
    n_init: usize,
    /// Maximum Lloyd iterations per restart.
    max_iter: usize,
    /// Centroid seeding.
    init: KMeansInit,
    /// Random seed for all restarts.
    random_state: u64,
}

impl KMeans {
    /// Restarts used unless overridden.
    pub const DEFAULT_N_INIT: usize = 25;
    /// Iteration cap used unless overridden.
    pub const DEFAULT_MAX_ITER: usize = 100;
    /// Seed used unless overridden.
    pub const DEFAULT_SEED: u64 = 42;

    /// Creates a new K-Means with the specified number of clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            n_init: Self::DEFAULT_N_INIT,
            max_iter: Self::DEFAULT_MAX_ITER,
            init: KMeansInit::Random,
            random_state: Self::DEFAULT_SEED,
        }
    }

    /// Sets the number of restarts.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Sets the maximum number of iterations per restart.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the centroid seeding strategy.
    #[must_use]
    pub fn with_init(mut self, init: KMeansInit) -> Self {
        self.init = init;
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Number of clusters.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of restarts.
    #[must_use]
    pub fn n_init(&self) -> usize {
        self.n_init
    }

    /// Iteration cap.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Random seed.
    #[must_use]
    pub fn random_state(&self) -> u64 {
        self.random_state
    }

    fn validate(&self, n_samples: usize) -> Result<()> {
        if self.n_clusters == 0 || self.n_clusters > n_samples {
            return Err(KlyngeError::InvalidK {
                k: self.n_clusters,
                n_samples,
            });
        }
        if self.n_init == 0 {
            return Err(KlyngeError::hyperparameter("n_init", self.n_init, ">= 1"));
        }
        if self.max_iter == 0 {
            return Err(KlyngeError::hyperparameter(
                "max_iter",
                self.max_iter,
                ">= 1",
            ));
        }
        Ok(())
    }

    /// Chooses initial centroids, or `None` when k-means++ runs out of
    /// distinct points.
    fn init_centroids(&self, x: &Matrix<f64>, rng: &mut StdRng) -> Option<Matrix<f64>> {
        let n = x.n_rows();
        let k = self.n_clusters;
        let chosen = match self.init {
            KMeansInit::Random => {
                // distinct locations, so duplicated rows cannot seed an empty cluster
                let distinct = x.distinct_row_indices();
                if distinct.len() < k {
                    return None;
                }
                rand::seq::index::sample(rng, distinct.len(), k)
                    .into_iter()
                    .map(|i| distinct[i])
                    .collect()
            }
            KMeansInit::PlusPlus => {
                let mut chosen = vec![rng.gen_range(0..n)];
                let mut d2: Vec<f64> = x
                    .rows()
                    .map(|row| squared_euclidean(row, x.row(chosen[0])))
                    .collect();
                while chosen.len() < k {
                    let next = WeightedIndex::new(&d2).ok()?.sample(rng);
                    chosen.push(next);
                    for (i, d) in d2.iter_mut().enumerate() {
                        *d = d.min(squared_euclidean(x.row(i), x.row(next)));
                    }
                }
                chosen
            }
        };
        Some(x.select_rows(&chosen))
    }

    /// One restart. `None` means a cluster went empty.
    fn run_once(&self, x: &Matrix<f64>, rng: &mut StdRng) -> Option<Run> {
        let k = self.n_clusters;
        let mut centroids = self.init_centroids(x, rng)?;
        let mut labels = assign_labels(x, &centroids);
        let mut converged = false;
        let mut n_iter = 0;

        while n_iter < self.max_iter {
            n_iter += 1;
            centroids = update_centroids(x, &labels, k)?;
            let next = assign_labels(x, &centroids);
            if next == labels {
                converged = true;
                break;
            }
            labels = next;
        }

        if !converged {
            // labels came from the previous centroids; report the means of
            // the final partition
            centroids = update_centroids(x, &labels, k)?;
        }

        let total_within_ss = within_cluster_ss(x, &centroids, &labels).iter().sum();
        Some(Run {
            labels,
            centroids,
            n_iter,
            converged,
            total_within_ss,
        })
    }
}

/// State of one finished restart.
struct Run {
    labels: Vec<usize>,
    centroids: Matrix<f64>,
    n_iter: usize,
    converged: bool,
    total_within_ss: f64,
}

/// Index of the nearest centroid for every row; ties go to the lowest index.
pub(crate) fn assign_labels(x: &Matrix<f64>, centroids: &Matrix<f64>) -> Vec<usize> {
    x.rows()
        .map(|point| {
            let mut min_dist = f64::INFINITY;
            let mut min_cluster = 0;
            for (c, centroid) in centroids.rows().enumerate() {
                let dist = squared_euclidean(point, centroid);
                if dist < min_dist {
                    min_dist = dist;
                    min_cluster = c;
                }
            }
            min_cluster
        })
        .collect()
}

/// Coordinate-wise member means, or `None` if some cluster has no members.
fn update_centroids(x: &Matrix<f64>, labels: &[usize], k: usize) -> Option<Matrix<f64>> {
    let n_features = x.n_cols();
    let mut sums = vec![0.0; k * n_features];
    let mut counts = vec![0usize; k];

    for (row, &label) in x.rows().zip(labels) {
        counts[label] += 1;
        for (s, &v) in sums[label * n_features..(label + 1) * n_features]
            .iter_mut()
            .zip(row)
        {
            *s += v;
        }
    }

    if counts.contains(&0) {
        return None;
    }

    for (c, &count) in counts.iter().enumerate() {
        for s in &mut sums[c * n_features..(c + 1) * n_features] {
            *s /= count as f64;
        }
    }

    Matrix::from_vec(k, n_features, sums).ok()
}

impl UnsupervisedEstimator for KMeans {
    type Fitted = KMeansFit;

    /// Fits K-Means to the rows of `x`.
    ///
    /// # Errors
    ///
    /// - [`KlyngeError::InvalidK`] if K is 0 or exceeds the number of rows
    /// - [`KlyngeError::InvalidHyperparameter`] if `n_init` or `max_iter` is 0
    /// - [`KlyngeError::AllRestartsFailed`] if every restart hit an empty cluster
    fn fit(&self, x: &Matrix<f64>) -> Result<KMeansFit> {
        self.validate(x.n_rows())?;

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut best: Option<Run> = None;
        let mut discarded = 0;

        for restart in 0..self.n_init {
            let Some(run) = self.run_once(x, &mut rng) else {
                discarded += 1;
                warn!(k = self.n_clusters, restart, "restart discarded: empty cluster");
                continue;
            };
            debug!(
                k = self.n_clusters,
                restart,
                wss = run.total_within_ss,
                n_iter = run.n_iter,
                converged = run.converged,
                "restart finished"
            );
            if best
                .as_ref()
                .map_or(true, |b| run.total_within_ss < b.total_within_ss)
            {
                best = Some(run);
            }
        }

        let best = best.ok_or(KlyngeError::AllRestartsFailed {
            k: self.n_clusters,
            restarts: self.n_init,
        })?;

        if !best.converged {
            warn!(
                k = self.n_clusters,
                max_iter = self.max_iter,
                "k-means did not converge; returning best-effort partition"
            );
        }

        let within_ss = within_cluster_ss(x, &best.centroids, &best.labels);
        let mut sizes = vec![0usize; self.n_clusters];
        for &label in &best.labels {
            sizes[label] += 1;
        }

        Ok(KMeansFit {
            n_clusters: self.n_clusters,
            labels: best.labels,
            centroids: best.centroids,
            sizes,
            within_ss,
            total_within_ss: best.total_within_ss,
            total_ss: total_sum_of_squares(x),
            n_iter: best.n_iter,
            converged: best.converged,
            n_init: self.n_init,
            restarts_discarded: discarded,
            seed: self.random_state,
        })
    }
}

/// Immutable result of one [`KMeans`] fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansFit {
    n_clusters: usize,
    labels: Vec<usize>,
    centroids: Matrix<f64>,
    sizes: Vec<usize>,
    within_ss: Vec<f64>,
    total_within_ss: f64,
    total_ss: f64,
    n_iter: usize,
    converged: bool,
    n_init: usize,
    restarts_discarded: usize,
    seed: u64,
}

impl KMeansFit {
    /// Number of clusters.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Zero-based cluster index per observation.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Final centroids (K × features).
    #[must_use]
    pub fn centroids(&self) -> &Matrix<f64> {
        &self.centroids
    }

    /// Members per cluster.
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Within-cluster sum of squares per cluster.
    #[must_use]
    pub fn within_ss(&self) -> &[f64] {
        &self.within_ss
    }

    /// Total within-cluster sum of squares.
    #[must_use]
    pub fn total_within_ss(&self) -> f64 {
        self.total_within_ss
    }

    /// Total sum of squares about the grand mean.
    #[must_use]
    pub fn total_ss(&self) -> f64 {
        self.total_ss
    }

    /// Between-cluster sum of squares.
    #[must_use]
    pub fn between_ss(&self) -> f64 {
        self.total_ss - self.total_within_ss
    }

    /// Iterations run by the winning restart.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// False if the winning restart hit the iteration cap.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Restarts attempted.
    #[must_use]
    pub fn n_init(&self) -> usize {
        self.n_init
    }

    /// Restarts discarded because a cluster went empty.
    #[must_use]
    pub fn restarts_discarded(&self) -> usize {
        self.restarts_discarded
    }

    /// Seed the fit was run with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Nearest-centroid labels for new rows.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has a different number of columns.
    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<usize>> {
        if x.n_cols() != self.centroids.n_cols() {
            return Err(KlyngeError::DimensionMismatch {
                expected: format!("{} columns", self.centroids.n_cols()),
                actual: format!("{} columns", x.n_cols()),
            });
        }
        Ok(assign_labels(x, &self.centroids))
    }

    /// Keyed assignment (labels 1..=K) over the rows of `dataset`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dataset` has a different number of rows.
    pub fn to_assignment(&self, dataset: &Dataset) -> Result<Assignment> {
        Assignment::from_zero_based(
            format!("k-means@{}", self.n_clusters),
            dataset.keys(),
            &self.labels,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Matrix<f64> {
        // Two well-separated clusters
        Matrix::from_vec(
            6,
            2,
            vec![1.0, 2.0, 1.5, 1.8, 1.0, 0.6, 8.0, 8.0, 9.0, 11.0, 8.5, 9.0],
        )
        .unwrap()
    }

    #[test]
    fn test_new_defaults() {
        let km = KMeans::new(3);
        assert_eq!(km.n_clusters(), 3);
        assert_eq!(km.n_init(), KMeans::DEFAULT_N_INIT);
        assert_eq!(km.max_iter(), KMeans::DEFAULT_MAX_ITER);
        assert_eq!(km.random_state(), KMeans::DEFAULT_SEED);
    }

    #[test]
    fn test_fit_basic() {
        let fit = KMeans::new(2).fit(&sample_data()).unwrap();
        assert_eq!(fit.centroids().shape(), (2, 2));
        assert_eq!(fit.labels().len(), 6);
        assert!(fit.total_within_ss() >= 0.0);
        assert_eq!(fit.sizes().iter().sum::<usize>(), 6);
    }

    #[test]
    fn test_labels_consistency() {
        let fit = KMeans::new(2).fit(&sample_data()).unwrap();
        let labels = fit.labels();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_invalid_k() {
        let data = sample_data();
        assert!(matches!(
            KMeans::new(0).fit(&data),
            Err(KlyngeError::InvalidK { k: 0, n_samples: 6 })
        ));
        assert!(matches!(
            KMeans::new(7).fit(&data),
            Err(KlyngeError::InvalidK { k: 7, n_samples: 6 })
        ));
    }

    #[test]
    fn test_empty_data_error() {
        let data = Matrix::from_vec(0, 2, vec![]).unwrap();
        assert!(KMeans::new(2).fit(&data).is_err());
    }

    #[test]
    fn test_zero_restarts_rejected() {
        let result = KMeans::new(2).with_n_init(0).fit(&sample_data());
        assert!(matches!(
            result,
            Err(KlyngeError::InvalidHyperparameter { .. })
        ));
    }

    #[test]
    fn test_single_cluster_is_grand_mean() {
        let data = sample_data();
        let fit = KMeans::new(1).fit(&data).unwrap();
        assert!(fit.labels().iter().all(|&l| l == 0));
        let means = data.column_means();
        assert!((fit.centroids().get(0, 0) - means[0]).abs() < 1e-12);
        assert!((fit.total_within_ss() - fit.total_ss()).abs() < 1e-9);
        assert!(fit.between_ss().abs() < 1e-9);
    }

    #[test]
    fn test_reproducibility() {
        let data = sample_data();
        let a = KMeans::new(3).with_random_state(9).fit(&data).unwrap();
        let b = KMeans::new(3).with_random_state(9).fit(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_plus_plus_init() {
        let fit = KMeans::new(2)
            .with_init(KMeansInit::PlusPlus)
            .with_random_state(3)
            .fit(&sample_data())
            .unwrap();
        assert_ne!(fit.labels()[0], fit.labels()[3]);
    }

    #[test]
    fn test_exact_k_samples() {
        let data = Matrix::from_vec(3, 2, vec![0.0, 0.0, 5.0, 5.0, 10.0, 10.0]).unwrap();
        let fit = KMeans::new(3).fit(&data).unwrap();
        let labels = fit.labels();
        assert_ne!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
        assert_ne!(labels[0], labels[2]);
        assert!(fit.total_within_ss() < 1e-12);
    }

    #[test]
    fn test_identical_points_all_restarts_fail() {
        // two clusters over one distinct location always leave one empty
        let data = Matrix::from_vec(4, 1, vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        let result = KMeans::new(2).with_n_init(5).fit(&data);
        assert!(matches!(
            result,
            Err(KlyngeError::AllRestartsFailed { k: 2, restarts: 5 })
        ));
    }

    #[test]
    fn test_duplicate_rows_seed_distinct_centroids() {
        // three distinct locations over four rows: K = 3 always succeeds
        let data = Matrix::from_vec(4, 1, vec![0.0, 0.0, 10.0, 11.0]).unwrap();
        let fit = KMeans::new(3).with_n_init(50).fit(&data).unwrap();
        assert_eq!(fit.restarts_discarded(), 0);
        assert_eq!(fit.labels()[0], fit.labels()[1]);
        assert_eq!(fit.sizes().iter().filter(|&&s| s == 0).count(), 0);
    }

    #[test]
    fn test_k_above_distinct_rows_fails_every_restart() {
        let data = Matrix::from_vec(4, 1, vec![0.0, 0.0, 10.0, 11.0]).unwrap();
        assert!(matches!(
            KMeans::new(4).with_n_init(3).fit(&data),
            Err(KlyngeError::AllRestartsFailed { k: 4, restarts: 3 })
        ));
    }

    #[test]
    fn test_max_iter_cap_reports_non_convergence() {
        // a chain where Lloyd needs several moves from a poor seed
        let data = Matrix::from_vec(
            8,
            1,
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 100.0],
        )
        .unwrap();
        let fit = KMeans::new(2)
            .with_n_init(1)
            .with_max_iter(1)
            .with_random_state(0)
            .fit(&data)
            .unwrap();
        assert!(!fit.converged());
        assert_eq!(fit.n_iter(), 1);
        assert_eq!(fit.labels().len(), 8);
        assert_eq!(fit.sizes().iter().sum::<usize>(), 8);

        // the same start with room to move settles
        let settled = KMeans::new(2)
            .with_n_init(1)
            .with_random_state(0)
            .fit(&data)
            .unwrap();
        assert!(settled.converged());
        assert!(settled.n_iter() > 1);
    }

    #[test]
    fn test_predict_new_data() {
        let fit = KMeans::new(2).fit(&sample_data()).unwrap();
        let near_first = Matrix::from_vec(1, 2, vec![1.2, 1.5]).unwrap();
        assert_eq!(fit.predict(&near_first).unwrap()[0], fit.labels()[0]);

        let wrong = Matrix::from_vec(1, 3, vec![0.0; 3]).unwrap();
        assert!(fit.predict(&wrong).is_err());
    }

    #[test]
    fn test_assign_labels_tie_goes_to_lowest_index() {
        let x = Matrix::from_vec(1, 1, vec![5.0]).unwrap();
        let centroids = Matrix::from_vec(2, 1, vec![4.0, 6.0]).unwrap();
        assert_eq!(assign_labels(&x, &centroids), vec![0]);
    }

    #[test]
    fn test_update_centroids_empty_cluster_is_none() {
        let x = Matrix::from_vec(2, 1, vec![1.0, 2.0]).unwrap();
        assert!(update_centroids(&x, &[0, 0], 2).is_none());
        let c = update_centroids(&x, &[0, 1], 2).unwrap();
        assert_eq!(c.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn test_to_assignment_is_one_based() {
        let data = sample_data();
        let ds = Dataset::new(
            (0..6).map(|i| format!("m{i}")).collect(),
            vec!["a".into(), "b".into()],
            data.clone(),
        )
        .unwrap();
        let fit = KMeans::new(2).fit(&data).unwrap();
        let assignment = fit.to_assignment(&ds).unwrap();
        assert_eq!(assignment.method(), "k-means@2");
        assert!(assignment.labels().iter().all(|&l| (1..=2).contains(&l)));
        assert_eq!(assignment.label_of("m0"), Some(fit.labels()[0] + 1));
    }
}
