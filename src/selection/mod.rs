//! Choosing the number of clusters.
//!
//! [`ClusterCountSelector`] fits a family of partitions over a K range and
//! derives three diagnostics from it:
//!
//! - the WSS "elbow" curve (reported in full, no automatic decision)
//! - the average silhouette curve with its arg-max
//! - a vote across independent [`ClusterCountIndex`] heuristics
//!
//! # Example
//!
//! ```
//! use klynge::prelude::*;
//! use klynge::selection::{default_indices, VoteMethod};
//!
//! let data = Matrix::from_vec(6, 2, vec![
//!     0.0, 0.0, 0.3, 0.1, 0.1, 0.4,
//!     10.0, 10.0, 10.2, 9.9, 9.8, 10.3,
//! ]).expect("valid matrix");
//!
//! let selector = ClusterCountSelector::new(2, 4).expect("valid range");
//! let silhouette = selector.silhouette(&data).expect("curve computes");
//! assert_eq!(silhouette.best_k, 2);
//!
//! let votes = selector
//!     .vote(&data, &default_indices(), VoteMethod::KMeans)
//!     .expect("vote runs");
//! assert_eq!(votes.leaders(), vec![2]);
//! ```

mod indices;

pub use indices::{
    default_indices, BallHall, CalinskiHarabasz, DaviesBouldin, Dunn, Hartigan, KrzanowskiLai,
    McClainRao, Silhouette,
};

use crate::cluster::{AgglomerativeClustering, KMeans, KMeansInit, Linkage};
use crate::error::{KlyngeError, Result};
use crate::metrics::{pooled_within_ss, silhouette_score_precomputed};
use crate::primitives::{DistanceMatrix, Matrix};
use crate::traits::UnsupervisedEstimator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::debug;

/// One (K, score) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Number of clusters.
    pub k: usize,
    /// Score at K.
    pub score: f64,
}

/// Per-K scores in increasing K.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    /// Builds a curve from `(k, score)` pairs, sorting by K.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut points: Vec<CurvePoint> = points
            .into_iter()
            .map(|(k, score)| CurvePoint { k, score })
            .collect();
        points.sort_by_key(|p| p.k);
        Self { points }
    }

    /// Points in increasing K.
    #[must_use]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Score at `k`, if computed.
    #[must_use]
    pub fn score(&self, k: usize) -> Option<f64> {
        self.points.iter().find(|p| p.k == k).map(|p| p.score)
    }

    /// K with the highest score; the smallest such K on ties.
    #[must_use]
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<CurvePoint> = None;
        for &p in &self.points {
            if best.map_or(true, |b| p.score > b.score) {
                best = Some(p);
            }
        }
        best.map(|p| p.k)
    }

    /// Drops `score(k) - score(k + 1)` between consecutive K.
    #[must_use]
    pub fn drops(&self) -> Vec<(usize, usize, f64)> {
        self.points
            .windows(2)
            .map(|w| (w[0].k, w[1].k, w[0].score - w[1].score))
            .collect()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no K was scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Silhouette curve over K >= 2 and its arg-max.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilhouetteCurve {
    /// Average silhouette width per K.
    pub curve: Curve,
    /// K with the widest average silhouette (smallest K on ties).
    pub best_k: usize,
}

/// Partition family used to fit the candidates of a vote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method", content = "linkage")]
pub enum VoteMethod {
    /// One k-means fit per K.
    #[default]
    KMeans,
    /// Cuts of one dendrogram.
    Hierarchical(Linkage),
}

/// Frequency distribution of recommended K across indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteDistribution {
    votes: BTreeMap<usize, Vec<String>>,
    abstained: Vec<String>,
}

impl VoteDistribution {
    /// Records one index's recommendation (`None` abstains).
    pub fn record(&mut self, index: &str, recommendation: Option<usize>) {
        match recommendation {
            Some(k) => self.votes.entry(k).or_default().push(index.to_string()),
            None => self.abstained.push(index.to_string()),
        }
    }

    /// Votes per K.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<usize, usize> {
        self.votes.iter().map(|(&k, v)| (k, v.len())).collect()
    }

    /// Votes for `k`.
    #[must_use]
    pub fn count(&self, k: usize) -> usize {
        self.votes.get(&k).map_or(0, Vec::len)
    }

    /// Names of the indices that voted for `k`.
    #[must_use]
    pub fn voters(&self, k: usize) -> &[String] {
        self.votes.get(&k).map_or(&[][..], Vec::as_slice)
    }

    /// Indices that could not decide.
    #[must_use]
    pub fn abstained(&self) -> &[String] {
        &self.abstained
    }

    /// Total votes cast.
    #[must_use]
    pub fn n_votes(&self) -> usize {
        self.votes.values().map(Vec::len).sum()
    }

    /// Every K with the most votes, in increasing order; empty if nobody voted.
    #[must_use]
    pub fn leaders(&self) -> Vec<usize> {
        let max = self.votes.values().map(Vec::len).max().unwrap_or(0);
        if max == 0 {
            return Vec::new();
        }
        self.votes
            .iter()
            .filter(|(_, v)| v.len() == max)
            .map(|(&k, _)| k)
            .collect()
    }
}

/// Everything an index may look at when recommending K.
///
/// Partitions cover the candidate range extended by one on each side
/// (clipped to `1..=n`), so indices comparing K with K-1 or K+1 can score
/// every candidate.
#[derive(Debug, Clone)]
pub struct PartitionContext<'a> {
    data: &'a Matrix<f64>,
    distances: &'a DistanceMatrix,
    candidates: RangeInclusive<usize>,
    partitions: BTreeMap<usize, Vec<usize>>,
}

impl<'a> PartitionContext<'a> {
    /// Bundles data, distances, the candidate K range and zero-based labels per K.
    #[must_use]
    pub fn new(
        data: &'a Matrix<f64>,
        distances: &'a DistanceMatrix,
        candidates: RangeInclusive<usize>,
        partitions: BTreeMap<usize, Vec<usize>>,
    ) -> Self {
        Self {
            data,
            distances,
            candidates,
            partitions,
        }
    }

    /// Data the partitions were fitted on.
    #[must_use]
    pub fn data(&self) -> &Matrix<f64> {
        self.data
    }

    /// Pairwise distances between observations.
    #[must_use]
    pub fn distances(&self) -> &DistanceMatrix {
        self.distances
    }

    /// Number of observations.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.n_rows()
    }

    /// Number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.data.n_cols()
    }

    /// K values an index may recommend.
    pub fn candidates(&self) -> RangeInclusive<usize> {
        self.candidates.clone()
    }

    /// Zero-based labels at `k`, if fitted.
    #[must_use]
    pub fn labels(&self, k: usize) -> Option<&[usize]> {
        self.partitions.get(&k).map(Vec::as_slice)
    }

    /// Total within-cluster sum of squares at `k`.
    #[must_use]
    pub fn within_ss(&self, k: usize) -> Option<f64> {
        self.labels(k).map(|l| pooled_within_ss(self.data, l))
    }

    /// WSS over the candidate range.
    #[must_use]
    pub fn elbow_curve(&self) -> Curve {
        Curve::new(
            self.candidates()
                .filter_map(|k| self.within_ss(k).map(|w| (k, w))),
        )
    }

    /// Average silhouette over the candidates with K >= 2.
    #[must_use]
    pub fn silhouette_curve(&self) -> Curve {
        Curve::new(self.candidates().filter(|&k| k >= 2).filter_map(|k| {
            self.labels(k)
                .and_then(|l| silhouette_score_precomputed(self.distances, l))
                .map(|s| (k, s))
        }))
    }
}

/// A heuristic that recommends a number of clusters.
///
/// Implementations return `None` to abstain when the partitions give them
/// nothing to decide on.
pub trait ClusterCountIndex {
    /// Short name reported with the vote.
    fn name(&self) -> &'static str;

    /// Recommended K within [`PartitionContext::candidates`].
    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize>;
}

/// All cluster-count diagnostics over one K range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDiagnostics {
    /// Total WSS per K.
    pub elbow: Curve,
    /// Silhouette curve, absent when the range holds no K >= 2.
    pub silhouette: Option<SilhouetteCurve>,
    /// Index vote, absent when no indices were given.
    pub vote: Option<VoteDistribution>,
}

/// Computes cluster-count diagnostics over `k_min..=k_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCountSelector {
    k_min: usize,
    k_max: usize,
    n_init: usize,
    max_iter: usize,
    seed: u64,
    init: KMeansInit,
}

impl ClusterCountSelector {
    /// Creates a selector for `k_min..=k_max` with k-means defaults.
    ///
    /// # Errors
    ///
    /// Returns [`KlyngeError::InvalidRange`] if `k_min` is 0 or exceeds `k_max`.
    pub fn new(k_min: usize, k_max: usize) -> Result<Self> {
        if k_min == 0 || k_min > k_max {
            return Err(KlyngeError::InvalidRange { k_min, k_max });
        }
        Ok(Self {
            k_min,
            k_max,
            n_init: KMeans::DEFAULT_N_INIT,
            max_iter: KMeans::DEFAULT_MAX_ITER,
            seed: KMeans::DEFAULT_SEED,
            init: KMeansInit::default(),
        })
    }

    /// Sets k-means restarts per K.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Sets the k-means iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the seed used for every K.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the k-means seeding strategy.
    #[must_use]
    pub fn with_init(mut self, init: KMeansInit) -> Self {
        self.init = init;
        self
    }

    /// Candidate range.
    #[must_use]
    pub fn range(&self) -> RangeInclusive<usize> {
        self.k_min..=self.k_max
    }

    /// Configured k-means estimator for `k`.
    #[must_use]
    pub fn kmeans(&self, k: usize) -> KMeans {
        KMeans::new(k)
            .with_n_init(self.n_init)
            .with_max_iter(self.max_iter)
            .with_random_state(self.seed)
            .with_init(self.init)
    }

    fn check_size(&self, x: &Matrix<f64>) -> Result<()> {
        if self.k_max > x.n_rows() {
            return Err(KlyngeError::InvalidK {
                k: self.k_max,
                n_samples: x.n_rows(),
            });
        }
        Ok(())
    }

    /// Zero-based labels for every K in `ks`.
    fn partitions(
        &self,
        x: &Matrix<f64>,
        distances: &DistanceMatrix,
        method: VoteMethod,
        ks: RangeInclusive<usize>,
    ) -> Result<BTreeMap<usize, Vec<usize>>> {
        match method {
            VoteMethod::KMeans => ks
                .map(|k| -> Result<(usize, Vec<usize>)> {
                    let fit = self.kmeans(k).fit(x)?;
                    debug!(k, wss = fit.total_within_ss(), "k-means candidate fitted");
                    Ok((k, fit.labels().to_vec()))
                })
                .collect(),
            VoteMethod::Hierarchical(linkage) => {
                let tree = AgglomerativeClustering::new(linkage).fit_precomputed(distances)?;
                ks.map(|k| -> Result<(usize, Vec<usize>)> { Ok((k, tree.cut(k)?)) })
                    .collect()
            }
        }
    }

    /// Candidate range widened by one each way, within `1..=` distinct rows.
    fn extended(&self, x: &Matrix<f64>) -> RangeInclusive<usize> {
        self.k_min.saturating_sub(1).max(1)..=(self.k_max + 1).min(x.n_distinct_rows())
    }

    /// Total WSS per K over the whole range (K=1 allowed).
    ///
    /// # Errors
    ///
    /// Returns an error if `k_max` exceeds the number of rows or a k-means
    /// fit fails.
    pub fn elbow(&self, x: &Matrix<f64>) -> Result<Curve> {
        self.check_size(x)?;
        let distances = DistanceMatrix::from_rows(x);
        let partitions = self.partitions(x, &distances, VoteMethod::KMeans, self.range())?;
        Ok(PartitionContext::new(x, &distances, self.range(), partitions).elbow_curve())
    }

    /// Average silhouette per K for K >= 2, with its arg-max.
    ///
    /// # Errors
    ///
    /// Returns [`KlyngeError::InvalidRange`] if the range holds no K >= 2,
    /// or any error from [`ClusterCountSelector::elbow`].
    pub fn silhouette(&self, x: &Matrix<f64>) -> Result<SilhouetteCurve> {
        self.check_size(x)?;
        let ks = self.k_min.max(2)..=self.k_max;
        if ks.is_empty() {
            return Err(KlyngeError::InvalidRange {
                k_min: 2,
                k_max: self.k_max,
            });
        }
        let distances = DistanceMatrix::from_rows(x);
        let partitions = self.partitions(x, &distances, VoteMethod::KMeans, ks.clone())?;
        silhouette_from(&PartitionContext::new(x, &distances, ks, partitions))
    }

    /// Lets every index in `indices` recommend a K and tallies the votes.
    ///
    /// # Errors
    ///
    /// Returns an error if `k_max` exceeds the number of rows or fitting fails.
    pub fn vote(
        &self,
        x: &Matrix<f64>,
        indices: &[Box<dyn ClusterCountIndex>],
        method: VoteMethod,
    ) -> Result<VoteDistribution> {
        self.check_size(x)?;
        let distances = DistanceMatrix::from_rows(x);
        let partitions = self.partitions(x, &distances, method, self.extended(x))?;
        Ok(tally(
            &PartitionContext::new(x, &distances, self.range(), partitions),
            indices,
        ))
    }

    /// Elbow, silhouette and vote from one shared k-means family.
    ///
    /// # Errors
    ///
    /// Returns an error if `k_max` exceeds the number of rows or fitting fails.
    pub fn diagnostics(
        &self,
        x: &Matrix<f64>,
        indices: &[Box<dyn ClusterCountIndex>],
        method: VoteMethod,
    ) -> Result<SelectionDiagnostics> {
        self.check_size(x)?;
        let distances = DistanceMatrix::from_rows(x);
        let family = self.partitions(x, &distances, VoteMethod::KMeans, self.extended(x))?;
        let kmeans_ctx = PartitionContext::new(x, &distances, self.range(), family);

        let elbow = kmeans_ctx.elbow_curve();
        let silhouette = silhouette_from(&kmeans_ctx).ok();
        let vote = if indices.is_empty() {
            None
        } else if method == VoteMethod::KMeans {
            Some(tally(&kmeans_ctx, indices))
        } else {
            let partitions = self.partitions(x, &distances, method, self.extended(x))?;
            Some(tally(
                &PartitionContext::new(x, &distances, self.range(), partitions),
                indices,
            ))
        };

        Ok(SelectionDiagnostics {
            elbow,
            silhouette,
            vote,
        })
    }
}

fn silhouette_from(ctx: &PartitionContext<'_>) -> Result<SilhouetteCurve> {
    let curve = ctx.silhouette_curve();
    let best_k = curve.argmax().ok_or(KlyngeError::InvalidRange {
        k_min: 2,
        k_max: *ctx.candidates().end(),
    })?;
    Ok(SilhouetteCurve { curve, best_k })
}

fn tally(ctx: &PartitionContext<'_>, indices: &[Box<dyn ClusterCountIndex>]) -> VoteDistribution {
    let mut votes = VoteDistribution::default();
    for index in indices {
        let k = index.recommend(ctx);
        debug!(index = index.name(), recommendation = ?k, "index voted");
        votes.record(index.name(), k);
    }
    votes
}


#[cfg(test)]
#[path = "tests_selection_contract.rs"]
mod tests_selection_contract;
