// =========================================================================
// FALSIFY-CM: partition metric contract
//
// Silhouette widths lie in [-1, 1] and are defined only for two or more
// clusters. Total SS decomposes into within SS plus between SS. The
// adjusted Rand index ignores label names.
// =========================================================================

use super::*;

fn grid() -> Matrix<f64> {
    Matrix::from_vec(
        8,
        2,
        vec![
            0.0, 0.0, 1.0, 0.3, 0.2, 1.1, 4.0, 4.2, 4.5, 3.9, 9.0, 0.5, 8.7, 1.2, 9.4, 0.1,
        ],
    )
    .expect("valid matrix")
}

/// FALSIFY-CM-001: every silhouette width is within [-1, 1]
#[test]
fn falsify_cm_001_silhouette_bounded() {
    let labels = [0, 1, 2, 0, 1, 2, 0, 1];
    let widths = silhouette_samples(&grid(), &labels).expect("three clusters");
    for (i, s) in widths.iter().enumerate() {
        assert!(
            (-1.0..=1.0).contains(s),
            "FALSIFIED CM-001: s[{i}] = {s} outside [-1, 1]"
        );
    }
}

/// FALSIFY-CM-002: silhouette undefined for one cluster
#[test]
fn falsify_cm_002_single_cluster_has_no_silhouette() {
    assert!(
        silhouette_score(&grid(), &[2; 8]).is_none(),
        "FALSIFIED CM-002: silhouette reported for a single cluster"
    );
}

/// FALSIFY-CM-003: total SS = within SS + between SS, between SS >= 0
#[test]
fn falsify_cm_003_sum_of_squares_decomposition() {
    let data = grid();
    let labels = [0, 0, 0, 1, 1, 2, 2, 2];
    let centroids = Matrix::from_rows(&cluster_means(&data, &labels).0).expect("rectangular");
    let within = inertia(&data, &centroids, &labels);
    let total = total_sum_of_squares(&data);
    assert!(
        within <= total + 1e-9,
        "FALSIFIED CM-003: within {within} exceeds total {total}"
    );

    // between SS computed directly from the centroids
    let grand = data.column_means();
    let between: f64 = labels
        .iter()
        .map(|&l| squared_euclidean(centroids.row(l), &grand))
        .sum();
    assert!(
        (total - within - between).abs() < 1e-9,
        "FALSIFIED CM-003: {total} != {within} + {between}"
    );
}

/// FALSIFY-CM-004: ARI is invariant under renaming labels
#[test]
fn falsify_cm_004_ari_label_invariant() {
    let a = [0, 0, 1, 1, 2, 2, 2, 0];
    let b = [1, 1, 1, 0, 2, 2, 0, 0];
    let renamed: Vec<usize> = b.iter().map(|&l| [7, 3, 5][l]).collect();
    let ari = adjusted_rand_index(&a, &b).expect("same length");
    let ari_renamed = adjusted_rand_index(&a, &renamed).expect("same length");
    assert!(
        (ari - ari_renamed).abs() < 1e-12,
        "FALSIFIED CM-004: {ari} != {ari_renamed}"
    );
}
