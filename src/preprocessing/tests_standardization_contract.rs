// =========================================================================
// FALSIFY-ZS: z-score standardization contract
//
// Every non-degenerate column of the output has mean 0 and unit standard
// deviation (of the same flavour used to fit), for any input.
// =========================================================================

use super::*;

fn column_stats(x: &Matrix<f64>, j: usize, kind: StdKind) -> (f64, f64) {
    let col = x.column(j);
    let n = col.len() as f64;
    let mean = col.iter().sum::<f64>() / n;
    let ss: f64 = col.iter().map(|v| (v - mean).powi(2)).sum();
    let denom = match kind {
        StdKind::Sample => n - 1.0,
        StdKind::Population => n,
    };
    (mean, (ss / denom).sqrt())
}

/// FALSIFY-ZS-001: mean ≈ 0 and std ≈ 1 after standardization (sample std)
#[test]
fn falsify_zs_001_zero_mean_unit_std_sample() {
    let data = Matrix::from_vec(
        5,
        3,
        vec![
            12.0, 80.5, 3.0, 18.5, 77.0, 9.5, 25.0, 60.0, 1.0, 9.0, 91.0, 4.5, 30.5, 66.5, 2.0,
        ],
    )
    .expect("valid matrix");

    let mut scaler = StandardScaler::new();
    let z = scaler.fit_transform(&data).expect("fit succeeds");

    for j in 0..3 {
        let (mean, std) = column_stats(&z, j, StdKind::Sample);
        assert!(mean.abs() < 1e-10, "FALSIFIED ZS-001: column {j} mean = {mean}");
        assert!(
            (std - 1.0).abs() < 1e-10,
            "FALSIFIED ZS-001: column {j} std = {std}"
        );
    }
}

/// FALSIFY-ZS-002: same property with population std
#[test]
fn falsify_zs_002_zero_mean_unit_std_population() {
    let data = Matrix::from_vec(4, 2, vec![1.0, 100.0, 2.0, 150.0, 4.0, 175.0, 8.0, 300.0])
        .expect("valid matrix");

    let mut scaler = StandardScaler::new().with_std_kind(StdKind::Population);
    let z = scaler.fit_transform(&data).expect("fit succeeds");

    for j in 0..2 {
        let (mean, std) = column_stats(&z, j, StdKind::Population);
        assert!(mean.abs() < 1e-10, "FALSIFIED ZS-002: column {j} mean = {mean}");
        assert!(
            (std - 1.0).abs() < 1e-10,
            "FALSIFIED ZS-002: column {j} std = {std}"
        );
    }
}

/// FALSIFY-ZS-003: a constant column never yields NaN or infinity
#[test]
fn falsify_zs_003_no_silent_division_by_zero() {
    let data = Matrix::from_vec(3, 2, vec![0.1, 1.0, 0.1, 2.0, 0.1, 3.0]).expect("valid matrix");

    let mut failing = StandardScaler::new();
    assert!(
        matches!(failing.fit(&data), Err(KlyngeError::ZeroVariance { index: 0, .. })),
        "FALSIFIED ZS-003: constant column accepted under Fail policy"
    );

    let mut lenient = StandardScaler::new().with_zero_variance(ZeroVariancePolicy::ZeroWithWarning);
    let z = lenient.fit_transform(&data).expect("fit succeeds");
    assert!(
        z.as_slice().iter().all(|v| v.is_finite()),
        "FALSIFIED ZS-003: non-finite output"
    );
    assert_eq!(lenient.zero_variance_columns(), &[0]);
}
