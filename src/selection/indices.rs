//! Built-in cluster-count indices.
//!
//! Each index scores the candidate partitions and recommends one K. Ties go
//! to the smallest K; an index with nothing to score abstains.

use super::{ClusterCountIndex, PartitionContext};
use crate::metrics::{calinski_harabasz, davies_bouldin, dunn_index, mcclain_rao};

/// The eight built-in indices, in reporting order.
#[must_use]
pub fn default_indices() -> Vec<Box<dyn ClusterCountIndex>> {
    vec![
        Box::new(Silhouette),
        Box::new(CalinskiHarabasz),
        Box::new(DaviesBouldin),
        Box::new(Hartigan::default()),
        Box::new(KrzanowskiLai),
        Box::new(BallHall),
        Box::new(Dunn),
        Box::new(McClainRao),
    ]
}

/// K with the largest finite score, smallest K on ties.
fn argmax(scores: impl Iterator<Item = (usize, Option<f64>)>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (k, score) in scores {
        let Some(score) = score.filter(|s| s.is_finite()) else {
            continue;
        };
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((k, score));
        }
    }
    best.map(|(k, _)| k)
}

fn argmin(scores: impl Iterator<Item = (usize, Option<f64>)>) -> Option<usize> {
    argmax(scores.map(|(k, s)| (k, s.map(|v| -v))))
}

/// Widest average silhouette.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silhouette;

impl ClusterCountIndex for Silhouette {
    fn name(&self) -> &'static str {
        "silhouette"
    }

    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize> {
        ctx.silhouette_curve().argmax()
    }
}

/// Largest Calinski–Harabasz pseudo-F.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalinskiHarabasz;

impl ClusterCountIndex for CalinskiHarabasz {
    fn name(&self) -> &'static str {
        "calinski_harabasz"
    }

    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize> {
        argmax(
            ctx.candidates()
                .map(|k| (k, ctx.labels(k).and_then(|l| calinski_harabasz(ctx.data(), l)))),
        )
    }
}

/// Smallest Davies–Bouldin index.
#[derive(Debug, Clone, Copy, Default)]
pub struct DaviesBouldin;

impl ClusterCountIndex for DaviesBouldin {
    fn name(&self) -> &'static str {
        "davies_bouldin"
    }

    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize> {
        argmin(
            ctx.candidates()
                .map(|k| (k, ctx.labels(k).and_then(|l| davies_bouldin(ctx.data(), l)))),
        )
    }
}

/// Hartigan's rule: the smallest K for which adding a cluster no longer pays,
/// H(K) = (W_K / W_{K+1} - 1)(n - K - 1) <= threshold.
#[derive(Debug, Clone, Copy)]
pub struct Hartigan {
    /// Cut-off for H(K); Hartigan suggests 10.
    pub threshold: f64,
}

impl Default for Hartigan {
    fn default() -> Self {
        Self { threshold: 10.0 }
    }
}

impl ClusterCountIndex for Hartigan {
    fn name(&self) -> &'static str {
        "hartigan"
    }

    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize> {
        let n = ctx.n_samples();
        ctx.candidates().find(|&k| {
            let (Some(w_k), Some(w_next)) = (ctx.within_ss(k), ctx.within_ss(k + 1)) else {
                return false;
            };
            if k + 1 >= n || w_next <= 0.0 {
                return false;
            }
            let h = (w_k / w_next - 1.0) * (n - k - 1) as f64;
            h <= self.threshold
        })
    }
}

/// Krzanowski–Lai: largest |DIFF(K) / DIFF(K+1)| with
/// DIFF(K) = (K-1)^(2/p) W_{K-1} - K^(2/p) W_K.
#[derive(Debug, Clone, Copy, Default)]
pub struct KrzanowskiLai;

impl KrzanowskiLai {
    fn diff(ctx: &PartitionContext<'_>, k: usize) -> Option<f64> {
        if k < 2 {
            return None;
        }
        let exponent = 2.0 / ctx.n_features() as f64;
        let prev = ctx.within_ss(k - 1)?;
        let here = ctx.within_ss(k)?;
        Some(((k - 1) as f64).powf(exponent) * prev - (k as f64).powf(exponent) * here)
    }
}

impl ClusterCountIndex for KrzanowskiLai {
    fn name(&self) -> &'static str {
        "krzanowski_lai"
    }

    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize> {
        argmax(ctx.candidates().map(|k| {
            let score = match (Self::diff(ctx, k), Self::diff(ctx, k + 1)) {
                (Some(d), Some(next)) if next != 0.0 => Some((d / next).abs()),
                _ => None,
            };
            (k, score)
        }))
    }
}

/// Ball–Hall: largest drop in mean within-cluster dispersion W_K / K.
#[derive(Debug, Clone, Copy, Default)]
pub struct BallHall;

impl ClusterCountIndex for BallHall {
    fn name(&self) -> &'static str {
        "ball_hall"
    }

    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize> {
        let dispersion = |k: usize| ctx.within_ss(k).map(|w| w / k as f64);
        argmax(ctx.candidates().map(|k| {
            let drop = if k < 2 {
                None
            } else {
                dispersion(k - 1).zip(dispersion(k)).map(|(a, b)| a - b)
            };
            (k, drop)
        }))
    }
}

/// Largest Dunn index.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dunn;

impl ClusterCountIndex for Dunn {
    fn name(&self) -> &'static str {
        "dunn"
    }

    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize> {
        argmax(
            ctx.candidates()
                .map(|k| (k, ctx.labels(k).and_then(|l| dunn_index(ctx.distances(), l)))),
        )
    }
}

/// Smallest McClain–Rao ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct McClainRao;

impl ClusterCountIndex for McClainRao {
    fn name(&self) -> &'static str {
        "mcclain_rao"
    }

    fn recommend(&self, ctx: &PartitionContext<'_>) -> Option<usize> {
        argmin(
            ctx.candidates()
                .map(|k| (k, ctx.labels(k).and_then(|l| mcclain_rao(ctx.distances(), l)))),
        )
    }
}
