//! Evaluation metrics for partitions.
//!
//! Includes compactness measures (inertia / WSS), the silhouette, internal
//! validity indices used by the cluster-count vote (Calinski–Harabasz,
//! Davies–Bouldin, Dunn, McClain–Rao) and, in [`contingency`], agreement
//! between two partitions.
//!
//! Labels are zero-based cluster indices; gaps are allowed (an index that no
//! observation uses is an empty cluster and is ignored).

pub mod contingency;

pub use contingency::{adjusted_rand_index, Contingency};

use crate::primitives::{euclidean, squared_euclidean, DistanceMatrix, Matrix};

/// Computes the inertia (within-cluster sum of squares).
///
/// Inertia = Σ ||x - centroid||²
///
/// # Examples
///
/// ```
/// use klynge::metrics::inertia;
/// use klynge::primitives::Matrix;
///
/// let data = Matrix::from_vec(4, 2, vec![
///     0.0, 0.0,
///     1.0, 0.0,
///     0.0, 1.0,
///     1.0, 1.0,
/// ]).expect("Matrix dimensions and data length are valid");
/// let centroids = Matrix::from_vec(1, 2, vec![0.5, 0.5]).expect("Matrix dimensions and data length are valid");
/// let labels = vec![0, 0, 0, 0];
/// assert!((inertia(&data, &centroids, &labels) - 2.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn inertia(data: &Matrix<f64>, centroids: &Matrix<f64>, labels: &[usize]) -> f64 {
    within_cluster_ss(data, centroids, labels).iter().sum()
}

/// Within-cluster sum of squares, one entry per centroid.
///
/// # Panics
///
/// Panics if a label has no matching centroid row.
#[must_use]
pub fn within_cluster_ss(data: &Matrix<f64>, centroids: &Matrix<f64>, labels: &[usize]) -> Vec<f64> {
    let mut wss = vec![0.0; centroids.n_rows()];
    for (point, &label) in data.rows().zip(labels) {
        wss[label] += squared_euclidean(point, centroids.row(label));
    }
    wss
}

/// Total sum of squares about the column means.
#[must_use]
pub fn total_sum_of_squares(data: &Matrix<f64>) -> f64 {
    let means = data.column_means();
    data.rows().map(|row| squared_euclidean(row, &means)).sum()
}

/// Total within-cluster sum of squares about the member means of each label.
///
/// Equals the k-means objective of a partition whose centroids are its
/// cluster means, so it applies to any labelling (e.g. a dendrogram cut).
#[must_use]
pub fn pooled_within_ss(data: &Matrix<f64>, labels: &[usize]) -> f64 {
    let (means, _) = cluster_means(data, labels);
    data.rows()
        .zip(labels)
        .map(|(row, &l)| squared_euclidean(row, &means[l]))
        .sum()
}

/// Number of distinct labels in use.
#[must_use]
pub fn n_distinct(labels: &[usize]) -> usize {
    let mut seen: Vec<usize> = labels.to_vec();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// Member means and member counts per label index (`max + 1` entries).
fn cluster_means(data: &Matrix<f64>, labels: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
    let k = labels.iter().max().map_or(0, |&m| m + 1);
    let mut sums = vec![vec![0.0; data.n_cols()]; k];
    let mut counts = vec![0usize; k];
    for (row, &label) in data.rows().zip(labels) {
        counts[label] += 1;
        for (s, &v) in sums[label].iter_mut().zip(row) {
            *s += v;
        }
    }
    for (sum, &count) in sums.iter_mut().zip(&counts) {
        if count > 0 {
            for s in sum.iter_mut() {
                *s /= count as f64;
            }
        }
    }
    (sums, counts)
}

/// Per-observation silhouette widths.
///
/// s(i) = (b(i) - a(i)) / max(a(i), b(i)), where a(i) is the mean distance
/// to the other members of i's cluster and b(i) the smallest mean distance
/// to the members of another cluster. Members of singleton clusters get 0.
///
/// Returns `None` when fewer than two clusters are in use, since the
/// silhouette is undefined for a single cluster.
///
/// # Panics
///
/// Panics if `labels` and `data` have different lengths.
#[must_use]
pub fn silhouette_samples(data: &Matrix<f64>, labels: &[usize]) -> Option<Vec<f64>> {
    assert_eq!(data.n_rows(), labels.len(), "one label per row required");
    silhouette_samples_precomputed(&DistanceMatrix::from_rows(data), labels)
}

/// [`silhouette_samples`] over a precomputed distance matrix.
///
/// # Panics
///
/// Panics if `labels` and `distances` have different lengths.
#[must_use]
pub fn silhouette_samples_precomputed(
    distances: &DistanceMatrix,
    labels: &[usize],
) -> Option<Vec<f64>> {
    assert_eq!(distances.len(), labels.len(), "one label per row required");
    if n_distinct(labels) < 2 {
        return None;
    }

    let k = labels.iter().max().map_or(0, |&m| m + 1);
    let mut counts = vec![0usize; k];
    for &label in labels {
        counts[label] += 1;
    }

    let widths = (0..labels.len())
        .map(|i| {
            let own = labels[i];
            if counts[own] == 1 {
                return 0.0;
            }
            let mut sums = vec![0.0; k];
            for (j, &label) in labels.iter().enumerate() {
                if j != i {
                    sums[label] += distances.get(i, j);
                }
            }
            let a = sums[own] / (counts[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && counts[c] > 0)
                .map(|c| sums[c] / counts[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let max_ab = a.max(b);
            if max_ab == 0.0 {
                0.0
            } else {
                (b - a) / max_ab
            }
        })
        .collect();

    Some(widths)
}

/// Average silhouette width of a partition.
///
/// Values range from -1 to 1, higher is better. `None` for a single cluster.
///
/// # Examples
///
/// ```
/// use klynge::metrics::silhouette_score;
/// use klynge::primitives::Matrix;
///
/// let data = Matrix::from_vec(4, 2, vec![
///     0.0, 0.0,
///     0.1, 0.1,
///     5.0, 5.0,
///     5.1, 5.1,
/// ]).expect("Matrix dimensions and data length are valid");
/// assert!(silhouette_score(&data, &[0, 0, 1, 1]).expect("two clusters") > 0.9);
/// assert!(silhouette_score(&data, &[0, 0, 0, 0]).is_none());
/// ```
#[must_use]
pub fn silhouette_score(data: &Matrix<f64>, labels: &[usize]) -> Option<f64> {
    silhouette_samples(data, labels).map(|s| mean(&s))
}

/// [`silhouette_score`] over a precomputed distance matrix.
#[must_use]
pub fn silhouette_score_precomputed(distances: &DistanceMatrix, labels: &[usize]) -> Option<f64> {
    silhouette_samples_precomputed(distances, labels).map(|s| mean(&s))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calinski–Harabasz pseudo-F: (B / (k - 1)) / (W / (n - k)). Higher is better.
///
/// `None` unless `2 <= k < n` and the within-cluster scatter is positive.
#[must_use]
pub fn calinski_harabasz(data: &Matrix<f64>, labels: &[usize]) -> Option<f64> {
    let n = data.n_rows();
    let k = n_distinct(labels);
    if k < 2 || k >= n {
        return None;
    }
    let within = pooled_within_ss(data, labels);
    if within <= 0.0 {
        return None;
    }
    let between = total_sum_of_squares(data) - within;
    Some((between / (k - 1) as f64) / (within / (n - k) as f64))
}

/// Davies–Bouldin index: mean over clusters of the worst
/// (scatter_i + scatter_j) / separation_ij ratio. Lower is better.
///
/// `None` for fewer than two clusters or coincident centroids.
#[must_use]
pub fn davies_bouldin(data: &Matrix<f64>, labels: &[usize]) -> Option<f64> {
    if n_distinct(labels) < 2 {
        return None;
    }
    let (means, counts) = cluster_means(data, labels);
    let mut scatter = vec![0.0; means.len()];
    for (row, &l) in data.rows().zip(labels) {
        scatter[l] += euclidean(row, &means[l]);
    }
    let used: Vec<usize> = (0..means.len()).filter(|&c| counts[c] > 0).collect();
    for &c in &used {
        scatter[c] /= counts[c] as f64;
    }

    let mut total = 0.0;
    for &i in &used {
        let mut worst = f64::NEG_INFINITY;
        for &j in &used {
            if i == j {
                continue;
            }
            let separation = euclidean(&means[i], &means[j]);
            if separation == 0.0 {
                return None;
            }
            worst = worst.max((scatter[i] + scatter[j]) / separation);
        }
        total += worst;
    }
    Some(total / used.len() as f64)
}

/// Dunn index: smallest between-cluster distance over largest cluster
/// diameter. Higher is better.
///
/// `None` for fewer than two clusters or when every cluster is a single point.
#[must_use]
pub fn dunn_index(distances: &DistanceMatrix, labels: &[usize]) -> Option<f64> {
    if n_distinct(labels) < 2 {
        return None;
    }
    let mut min_between = f64::INFINITY;
    let mut max_diameter: f64 = 0.0;
    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            let d = distances.get(i, j);
            if labels[i] == labels[j] {
                max_diameter = max_diameter.max(d);
            } else {
                min_between = min_between.min(d);
            }
        }
    }
    if max_diameter == 0.0 {
        return None;
    }
    Some(min_between / max_diameter)
}

/// McClain–Rao index: mean within-cluster pair distance over mean
/// between-cluster pair distance. Lower is better.
///
/// `None` if there are no within-cluster pairs or no between-cluster pairs.
#[must_use]
pub fn mcclain_rao(distances: &DistanceMatrix, labels: &[usize]) -> Option<f64> {
    let (mut within, mut n_within) = (0.0, 0usize);
    let (mut between, mut n_between) = (0.0, 0usize);
    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            let d = distances.get(i, j);
            if labels[i] == labels[j] {
                within += d;
                n_within += 1;
            } else {
                between += d;
                n_between += 1;
            }
        }
    }
    if n_within == 0 || n_between == 0 || between == 0.0 {
        return None;
    }
    Some((within / n_within as f64) / (between / n_between as f64))
}


#[cfg(test)]
#[path = "tests_clustering_contract.rs"]
mod tests_clustering_contract;
