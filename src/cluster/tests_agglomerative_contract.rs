// =========================================================================
// FALSIFY-HC: agglomerative (hierarchical) clustering contract
//
// The dendrogram has n - 1 merges with non-decreasing heights for the
// reducible linkages, cuts at the extremes give singletons and one
// cluster, and a cut at K uses exactly K labels.
//
// References:
//   - Lance & Williams (1967) "A general theory of classificatory sorting strategies"
//   - Ward (1963) "Hierarchical grouping to optimize an objective function"
// =========================================================================

use super::*;
use crate::metrics::adjusted_rand_index;
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;

const LINKAGES: [Linkage; 4] = [
    Linkage::Single,
    Linkage::Complete,
    Linkage::Average,
    Linkage::Ward,
];

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
        9,
        2,
        vec![
            1.0, 2.0, 1.5, 1.8, 5.0, 8.0, 8.0, 8.0, 1.0, 0.6, 9.0, 11.0, 4.0, 4.5, 6.0, 2.0,
            2.5, 7.0,
        ],
    )
    .expect("valid matrix")
}

/// FALSIFY-HC-001: n - 1 merges, final merge holds everything
#[test]
fn falsify_hc_001_full_history() {
    for linkage in LINKAGES {
        let tree = AgglomerativeClustering::new(linkage)
            .fit(&scattered())
            .expect("fit succeeds");
        assert_eq!(
            tree.merges().len(),
            8,
            "FALSIFIED HC-001: {linkage} produced {} merges",
            tree.merges().len()
        );
        assert_eq!(tree.merges()[7].size, 9, "FALSIFIED HC-001: {linkage} root size");
    }
}

/// FALSIFY-HC-002: merge heights never decrease
#[test]
fn falsify_hc_002_monotone_heights() {
    for linkage in LINKAGES {
        let tree = AgglomerativeClustering::new(linkage)
            .fit(&scattered())
            .expect("fit succeeds");
        for w in tree.heights().windows(2) {
            assert!(
                w[1] >= w[0] - 1e-9,
                "FALSIFIED HC-002: {linkage} height {} after {}",
                w[1],
                w[0]
            );
        }
    }
}

/// FALSIFY-HC-003: cut(N) gives singletons, cut(1) gives one cluster
#[test]
fn falsify_hc_003_cut_extremes() {
    let tree = AgglomerativeClustering::default()
        .fit(&scattered())
        .expect("fit succeeds");
    assert_eq!(
        tree.cut(9).expect("valid K"),
        (0..9).collect::<Vec<_>>(),
        "FALSIFIED HC-003: cut at N is not all singletons"
    );
    assert_eq!(
        tree.cut(1).expect("valid K"),
        vec![0; 9],
        "FALSIFIED HC-003: cut at 1 is not one cluster"
    );
}

/// FALSIFY-HC-004: cut at K uses labels 0..K exactly
#[test]
fn falsify_hc_004_cut_uses_k_labels() {
    let tree = AgglomerativeClustering::default()
        .fit(&scattered())
        .expect("fit succeeds");
    for k in 1..=9 {
        let mut labels = tree.cut(k).expect("valid K");
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(
            labels,
            (0..k).collect::<Vec<_>>(),
            "FALSIFIED HC-004: cut at {k}"
        );
    }
}

/// FALSIFY-HC-005: on two separated groups the K=2 cut equals k-means up to renaming
#[test]
fn falsify_hc_005_agrees_with_kmeans() {
    let data = six_points();
    let tree = AgglomerativeClustering::default()
        .fit(&data)
        .expect("fit succeeds");
    let kmeans = KMeans::new(2).fit(&data).expect("fit succeeds");
    let ari = adjusted_rand_index(&tree.cut(2).expect("valid K"), kmeans.labels())
        .expect("same length");
    assert!(
        (ari - 1.0).abs() < 1e-12,
        "FALSIFIED HC-005: ARI = {ari}"
    );
}

/// FALSIFY-HC-006: single-linkage cophenetic distances never exceed direct
/// distances and never exceed the root height
#[test]
fn falsify_hc_006_cophenetic_consistent() {
    let data = scattered();
    let tree = AgglomerativeClustering::new(Linkage::Single)
        .fit(&data)
        .expect("fit succeeds");
    let coph = tree.cophenetic().expect("spanning tree");
    let direct = crate::primitives::DistanceMatrix::from_rows(&data);
    for i in 0..9 {
        for j in (i + 1)..9 {
            assert!(
                coph.get(i, j) <= direct.get(i, j) + 1e-12,
                "FALSIFIED HC-006: single-linkage cophenetic exceeds the direct distance for ({i}, {j})"
            );
        }
    }
    let top = tree.heights()[7];
    assert!(coph.as_condensed().iter().all(|&c| c <= top + 1e-12));
}
