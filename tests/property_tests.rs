//! Property-based tests using proptest.
//!
//! These tests verify invariants of standardization, k-means and
//! hierarchical clustering on random inputs.

use klynge::metrics::{adjusted_rand_index, pooled_within_ss, silhouette_samples};
use klynge::prelude::*;
use klynge::primitives::squared_euclidean;
use proptest::prelude::*;

// Strategy for matrices with rows x cols percentages
fn matrix_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Matrix<f64>> {
    proptest::collection::vec(0.0f64..100.0, rows * cols).prop_map(move |data| {
        Matrix::from_vec(rows, cols, data).expect("Test data should be valid")
    })
}

// Strategy for variable-size matrices
fn sized_matrix_strategy() -> impl Strategy<Value = Matrix<f64>> {
    (4usize..12, 1usize..5).prop_flat_map(|(rows, cols)| matrix_strategy(rows, cols))
}

fn dataset(values: Matrix<f64>) -> Dataset {
    let keys = (0..values.n_rows()).map(|i| format!("k{i}")).collect();
    let features = (0..values.n_cols()).map(|j| format!("f{j}")).collect();
    Dataset::new(keys, features, values).expect("valid dataset")
}

fn has_constant_column(x: &Matrix<f64>) -> bool {
    (0..x.n_cols()).any(|j| {
        let col = x.column(j);
        col.iter().all(|v| (v - col[0]).abs() < 1e-9)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn standardized_columns_have_mean_zero_std_one(x in sized_matrix_strategy()) {
        prop_assume!(!has_constant_column(&x));
        let n = x.n_rows() as f64;
        let z = standardize(&dataset(x), Default::default()).unwrap();
        let values = z.dataset.values();
        for j in 0..values.n_cols() {
            let col = values.column(j);
            let mean = col.iter().sum::<f64>() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            prop_assert!(mean.abs() < 1e-9);
            prop_assert!((var.sqrt() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn kmeans_assigns_nearest_centroid(x in sized_matrix_strategy(), k in 1usize..4, seed in 0u64..1000) {
        let fit = KMeans::new(k).with_n_init(3).with_random_state(seed).fit(&x).unwrap();
        let centroids = fit.centroids();
        for (i, row) in x.rows().enumerate() {
            let own = squared_euclidean(row, centroids.row(fit.labels()[i]));
            for c in 0..k {
                prop_assert!(own <= squared_euclidean(row, centroids.row(c)) + 1e-9);
            }
        }
    }

    #[test]
    fn kmeans_within_ss_bounded_by_total(x in sized_matrix_strategy(), k in 1usize..4) {
        let fit = KMeans::new(k).with_n_init(3).fit(&x).unwrap();
        let wss = pooled_within_ss(&x, fit.labels());
        prop_assert!(wss >= 0.0);
        prop_assert!((wss - fit.total_within_ss()).abs() < 1e-6);
        prop_assert!(fit.total_within_ss() <= fit.total_ss() + 1e-6);
    }

    #[test]
    fn kmeans_is_deterministic_given_seed(x in sized_matrix_strategy(), seed in 0u64..1000) {
        let model = KMeans::new(2).with_n_init(4).with_random_state(seed);
        prop_assert_eq!(model.fit(&x).unwrap(), model.fit(&x).unwrap());
    }

    #[test]
    fn average_linkage_heights_are_monotone(x in sized_matrix_strategy()) {
        let tree = AgglomerativeClustering::new(Linkage::Average).fit(&x).unwrap();
        let heights = tree.heights();
        prop_assert_eq!(heights.len(), x.n_rows() - 1);
        for w in heights.windows(2) {
            prop_assert!(w[1] >= w[0] - 1e-9);
        }
    }

    #[test]
    fn cut_extremes(x in sized_matrix_strategy()) {
        let n = x.n_rows();
        let tree = AgglomerativeClustering::new(Linkage::Complete).fit(&x).unwrap();
        prop_assert!(tree.cut(1).unwrap().iter().all(|&l| l == 0));
        let mut singletons = tree.cut(n).unwrap();
        singletons.sort_unstable();
        prop_assert_eq!(singletons, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn cut_uses_exactly_k_labels(x in sized_matrix_strategy(), k in 1usize..4) {
        let tree = AgglomerativeClustering::new(Linkage::Ward).fit(&x).unwrap();
        let mut labels = tree.cut(k).unwrap();
        labels.sort_unstable();
        labels.dedup();
        prop_assert_eq!(labels.len(), k);
    }

    #[test]
    fn silhouette_values_in_range(x in sized_matrix_strategy(), k in 2usize..4) {
        let labels = AgglomerativeClustering::new(Linkage::Average).fit(&x).unwrap().cut(k).unwrap();
        if let Some(values) = silhouette_samples(&x, &labels) {
            for s in values {
                prop_assert!((-1.0 - 1e-12..=1.0 + 1e-12).contains(&s));
            }
        }
    }

    #[test]
    fn ari_is_symmetric(a in proptest::collection::vec(0usize..3, 8), b in proptest::collection::vec(0usize..3, 8)) {
        let ab = adjusted_rand_index(&a, &b).unwrap();
        let ba = adjusted_rand_index(&b, &a).unwrap();
        prop_assert!((ab - ba).abs() < 1e-12);
    }
}
