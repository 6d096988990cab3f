// =========================================================================
// FALSIFY-KM: k-means contract
//
// Labels are valid cluster indices, every observation sits with its nearest
// final centroid, WSS is non-negative and never exceeds the total SS, and
// results are a pure function of data, seed and restart count.
//
// References:
//   - Lloyd (1982) "Least Squares Quantization in PCM"
//   - Hartigan & Wong (1979) "A K-Means Clustering Algorithm"
// =========================================================================

use super::*;
use crate::primitives::{squared_euclidean, Matrix};
use crate::traits::UnsupervisedEstimator;

fn six_points() -> Matrix<f64> {
    Matrix::from_vec(
        6,
        2,
        vec![0.0, 0.0, 0.3, 0.1, 0.1, 0.4, 10.0, 10.0, 10.2, 9.9, 9.8, 10.3],
    )
    .expect("valid matrix")
}

fn scattered() -> Matrix<f64> {
    Matrix::from_vec(
        10,
        2,
        vec![
            1.0, 2.0, 1.5, 1.8, 5.0, 8.0, 8.0, 8.0, 1.0, 0.6, 9.0, 11.0, 4.0, 4.5, 6.0, 2.0,
            2.5, 7.0, 7.5, 3.5,
        ],
    )
    .expect("valid matrix")
}

/// FALSIFY-KM-001: valid cluster indices, all labels in [0, K-1]
#[test]
fn falsify_km_001_valid_indices() {
    for k in 1..=5 {
        let fit = KMeans::new(k).fit(&scattered()).expect("fit succeeds");
        for (i, &label) in fit.labels().iter().enumerate() {
            assert!(
                label < k,
                "FALSIFIED KM-001: label[{i}] = {label}, expected < {k}"
            );
        }
    }
}

/// FALSIFY-KM-002: 0 <= total WSS <= total SS
#[test]
fn falsify_km_002_wss_bounded() {
    for k in 1..=5 {
        let fit = KMeans::new(k).fit(&scattered()).expect("fit succeeds");
        assert!(
            fit.total_within_ss() >= 0.0,
            "FALSIFIED KM-002: WSS = {} < 0 at K={k}",
            fit.total_within_ss()
        );
        assert!(
            fit.total_within_ss() <= fit.total_ss() + 1e-9,
            "FALSIFIED KM-002: WSS {} > total SS {} at K={k}",
            fit.total_within_ss(),
            fit.total_ss()
        );
    }
}

/// FALSIFY-KM-003: every observation is assigned to its nearest final centroid
#[test]
fn falsify_km_003_nearest_centroid() {
    let data = scattered();
    for k in 2..=4 {
        let fit = KMeans::new(k).with_random_state(7).fit(&data).expect("fit succeeds");
        assert!(fit.converged(), "K={k} did not converge");
        for (i, row) in data.rows().enumerate() {
            let own = squared_euclidean(row, fit.centroids().row(fit.labels()[i]));
            for c in 0..k {
                let other = squared_euclidean(row, fit.centroids().row(c));
                assert!(
                    own <= other + 1e-12,
                    "FALSIFIED KM-003: point {i} is closer to centroid {c} ({other}) than to its own ({own})"
                );
            }
        }
    }
}

/// FALSIFY-KM-004: identical seed and restarts give identical results
#[test]
fn falsify_km_004_deterministic() {
    let a = KMeans::new(3).with_random_state(123).with_n_init(8);
    let first = a.fit(&scattered()).expect("fit succeeds");
    let second = a.fit(&scattered()).expect("fit succeeds");
    assert_eq!(first, second, "FALSIFIED KM-004: refit changed the result");
}

/// FALSIFY-KM-005: two separated groups split exactly at K=2
#[test]
fn falsify_km_005_separates_groups() {
    let fit = KMeans::new(2).fit(&six_points()).expect("fit succeeds");
    let labels = fit.labels();
    assert!(
        labels[..3].iter().all(|&l| l == labels[0]) && labels[3..].iter().all(|&l| l == labels[3]),
        "FALSIFIED KM-005: groups were mixed: {labels:?}"
    );
    assert_ne!(labels[0], labels[3], "FALSIFIED KM-005: one cluster only");
}

/// FALSIFY-KM-006: the sharpest WSS drop on two groups is between K=1 and K=2
#[test]
fn falsify_km_006_elbow_at_two() {
    let data = six_points();
    let wss: Vec<f64> = (1..=4)
        .map(|k| KMeans::new(k).fit(&data).expect("fit succeeds").total_within_ss())
        .collect();
    let drops: Vec<f64> = wss.windows(2).map(|w| w[0] - w[1]).collect();
    for (i, &d) in drops.iter().enumerate().skip(1) {
        assert!(
            drops[0] > d,
            "FALSIFIED KM-006: drop K={}->{} ({d}) >= drop 1->2 ({})",
            i + 1,
            i + 2,
            drops[0]
        );
    }
}

/// FALSIFY-KM-007: fitting does not change the estimator
#[test]
fn falsify_km_007_estimator_unchanged() {
    let km = KMeans::new(2).with_random_state(5);
    let before = km.clone();
    let _ = km.fit(&six_points()).expect("fit succeeds");
    assert_eq!(km, before, "FALSIFIED KM-007: estimator mutated by fit");
}
