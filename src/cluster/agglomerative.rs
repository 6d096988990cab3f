//! Agglomerative hierarchical clustering.
//!
//! Bottom-up merging over a full pairwise distance matrix with
//! Lance–Williams updates. The whole merge history is kept in a
//! [`Dendrogram`], which can then be cut at any K without refitting.

use super::Assignment;
use crate::data::Dataset;
use crate::error::{KlyngeError, Result};
use crate::primitives::{DistanceMatrix, Matrix};
use crate::traits::UnsupervisedEstimator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Linkage criterion: how the distance between two clusters is defined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Minimum pairwise distance.
    Single,
    /// Maximum pairwise distance.
    Complete,
    /// Mean pairwise distance (UPGMA).
    #[default]
    Average,
    /// Ward's minimum-variance criterion on Euclidean distances (ward.D2).
    Ward,
}

impl Linkage {
    /// Distance from the merge of `i` and `j` to a third cluster `k`.
    ///
    /// `d_ik`, `d_jk`, `d_ij` are current inter-cluster distances (squared
    /// for Ward) and `n_*` the cluster sizes.
    fn update(self, d_ik: f64, d_jk: f64, d_ij: f64, n_i: usize, n_j: usize, n_k: usize) -> f64 {
        let (n_i, n_j, n_k) = (n_i as f64, n_j as f64, n_k as f64);
        match self {
            Self::Single => d_ik.min(d_jk),
            Self::Complete => d_ik.max(d_jk),
            Self::Average => (n_i * d_ik + n_j * d_jk) / (n_i + n_j),
            Self::Ward => {
                ((n_i + n_k) * d_ik + (n_j + n_k) * d_jk - n_k * d_ij) / (n_i + n_j + n_k)
            }
        }
    }

    /// Name accepted by [`Linkage::from_str`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Complete => "complete",
            Self::Average => "average",
            Self::Ward => "ward",
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Linkage {
    type Err = KlyngeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "complete" => Ok(Self::Complete),
            "average" | "upgma" => Ok(Self::Average),
            "ward" | "ward.d2" => Ok(Self::Ward),
            other => Err(KlyngeError::hyperparameter(
                "linkage",
                other,
                "one of single, complete, average, ward",
            )),
        }
    }
}

/// One merge step.
///
/// Node ids: leaves are `0..n`; the cluster created by merge `s` is `n + s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Smaller child node id.
    pub left: usize,
    /// Larger child node id.
    pub right: usize,
    /// Linkage distance at which the children were joined.
    pub distance: f64,
    /// Observations in the merged cluster.
    pub size: usize,
}

/// Agglomerative hierarchical clustering.
///
/// Fitting always runs to a single cluster; choose K afterwards with
/// [`Dendrogram::cut`].
///
/// # Algorithm
///
/// 1. Start with every observation as a singleton
/// 2. Merge the closest pair of clusters (ties: lowest index pair)
/// 3. Update distances to the merged cluster (Lance–Williams)
/// 4. Repeat until one cluster remains
///
/// # Examples
///
/// ```
/// use klynge::prelude::*;
///
/// let data = Matrix::from_vec(4, 1, vec![0.0, 0.2, 9.0, 9.5]).expect("valid matrix");
/// let tree = AgglomerativeClustering::new(Linkage::Average)
///     .fit(&data)
///     .expect("fit succeeds");
///
/// assert_eq!(tree.merges().len(), 3);
/// assert_eq!(tree.cut(2).expect("valid K"), vec![0, 0, 1, 1]);
/// ```
///
/// # Performance
///
/// - Time complexity: O(n³)
/// - Space complexity: O(n²)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgglomerativeClustering {
    linkage: Linkage,
}

impl AgglomerativeClustering {
    /// Creates an estimator with the given linkage.
    #[must_use]
    pub fn new(linkage: Linkage) -> Self {
        Self { linkage }
    }

    /// Linkage criterion.
    #[must_use]
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Builds the dendrogram from precomputed Euclidean distances.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no observations.
    pub fn fit_precomputed(&self, distances: &DistanceMatrix) -> Result<Dendrogram> {
        let n = distances.len();
        if n == 0 {
            return Err(KlyngeError::InsufficientData(
                "hierarchical clustering needs at least one observation".to_string(),
            ));
        }

        let ward = self.linkage == Linkage::Ward;
        let mut d = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let v = distances.get(i, j);
                let v = if ward { v * v } else { v };
                d[i][j] = v;
                d[j][i] = v;
            }
        }

        let mut active = vec![true; n];
        let mut sizes = vec![1usize; n];
        let mut node_of_slot: Vec<usize> = (0..n).collect();
        let mut merges = Vec::with_capacity(n - 1);

        for step in 0..n - 1 {
            let mut best = (usize::MAX, usize::MAX, f64::INFINITY);
            for i in (0..n).filter(|&i| active[i]) {
                for j in ((i + 1)..n).filter(|&j| active[j]) {
                    if d[i][j] < best.2 {
                        best = (i, j, d[i][j]);
                    }
                }
            }
            let (i, j, d_ij) = best;
            if i == usize::MAX {
                // only reachable with NaN distances
                return Err(KlyngeError::InsufficientData(
                    "distances are not comparable".to_string(),
                ));
            }

            let (n_i, n_j) = (sizes[i], sizes[j]);
            for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
                let v = self.linkage.update(d[i][k], d[j][k], d_ij, n_i, n_j, sizes[k]);
                d[i][k] = v;
                d[k][i] = v;
            }

            let (a, b) = (node_of_slot[i], node_of_slot[j]);
            let merge = Merge {
                left: a.min(b),
                right: a.max(b),
                distance: if ward { d_ij.max(0.0).sqrt() } else { d_ij },
                size: n_i + n_j,
            };
            debug!(
                step,
                left = merge.left,
                right = merge.right,
                distance = merge.distance,
                "merge"
            );
            merges.push(merge);

            active[j] = false;
            sizes[i] = n_i + n_j;
            node_of_slot[i] = n + step;
        }

        Ok(Dendrogram {
            n_leaves: n,
            linkage: self.linkage,
            merges,
        })
    }
}

impl UnsupervisedEstimator for AgglomerativeClustering {
    type Fitted = Dendrogram;

    /// Builds the full dendrogram over the rows of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has no rows.
    fn fit(&self, x: &Matrix<f64>) -> Result<Dendrogram> {
        self.fit_precomputed(&DistanceMatrix::from_rows(x))
    }
}

/// Full merge history of an agglomerative fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    n_leaves: usize,
    linkage: Linkage,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Number of observations.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Linkage used to build the tree.
    #[must_use]
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Merges in the order they happened (`n - 1` of them).
    #[must_use]
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Merge distances in merge order.
    #[must_use]
    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }

    /// Zero-based labels from the first `n - k` merges.
    ///
    /// Labels are numbered in order of first appearance over observations.
    ///
    /// # Errors
    ///
    /// Returns [`KlyngeError::InvalidK`] unless `1 <= k <= n`.
    pub fn cut(&self, k: usize) -> Result<Vec<usize>> {
        if k == 0 || k > self.n_leaves {
            return Err(KlyngeError::InvalidK {
                k,
                n_samples: self.n_leaves,
            });
        }
        Ok(self.labels_after(self.n_leaves - k))
    }

    /// Zero-based labels after applying every merge at or below `height`.
    #[must_use]
    pub fn cut_height(&self, height: f64) -> Vec<usize> {
        let applied = self
            .merges
            .iter()
            .take_while(|m| m.distance <= height)
            .count();
        self.labels_after(applied)
    }

    fn labels_after(&self, n_merges: usize) -> Vec<usize> {
        let n = self.n_leaves;
        let mut parent: Vec<usize> = (0..n).collect();
        // one leaf inside each node, for mapping merge children to the union-find
        let mut leaf_of_node: Vec<usize> = (0..n).collect();

        for merge in &self.merges[..n_merges] {
            let a = find(&mut parent, leaf_of_node[merge.left]);
            let b = find(&mut parent, leaf_of_node[merge.right]);
            parent[b] = a;
            leaf_of_node.push(a);
        }

        let mut label_of_root = vec![usize::MAX; n];
        let mut next = 0;
        (0..n)
            .map(|leaf| {
                let root = find(&mut parent, leaf);
                if label_of_root[root] == usize::MAX {
                    label_of_root[root] = next;
                    next += 1;
                }
                label_of_root[root]
            })
            .collect()
    }

    /// Leaves in left-to-right order for drawing the tree without crossings.
    #[must_use]
    pub fn leaf_order(&self) -> Vec<usize> {
        let n = self.n_leaves;
        if self.merges.is_empty() {
            return (0..n).collect();
        }
        let mut order = Vec::with_capacity(n);
        let mut stack = vec![n + self.merges.len() - 1];
        while let Some(node) = stack.pop() {
            if node < n {
                order.push(node);
            } else {
                let merge = &self.merges[node - n];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        order
    }

    /// Cophenetic distances: the height at which each pair is first joined.
    ///
    /// # Errors
    ///
    /// Returns an error only if the merge list does not span the leaves.
    pub fn cophenetic(&self) -> Result<DistanceMatrix> {
        let n = self.n_leaves;
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut full = vec![0.0; n * n];
        for merge in &self.merges {
            for &a in &members[merge.left] {
                for &b in &members[merge.right] {
                    full[a * n + b] = merge.distance;
                    full[b * n + a] = merge.distance;
                }
            }
            let mut joined = members[merge.left].clone();
            joined.extend_from_slice(&members[merge.right]);
            members.push(joined);
        }

        let condensed = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| full[i * n + j])
            .collect();
        DistanceMatrix::from_condensed(n, condensed)
    }

    /// Keyed assignment (labels 1..=K) from cutting at `k`.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is out of range or `dataset` has a different
    /// number of rows.
    pub fn to_assignment(&self, dataset: &Dataset, k: usize) -> Result<Assignment> {
        Assignment::from_zero_based(
            format!("hierarchical-cut@{k}"),
            dataset.keys(),
            &self.cut(k)?,
        )
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}
