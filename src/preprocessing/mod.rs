//! Z-score standardization of activity columns.
//!
//! # Example
//!
//! ```
//! use klynge::prelude::*;
//!
//! let data = Matrix::from_vec(4, 2, vec![
//!     1.0, 100.0,
//!     2.0, 200.0,
//!     3.0, 300.0,
//!     4.0, 400.0,
//! ]).expect("valid matrix dimensions");
//!
//! let mut scaler = StandardScaler::new();
//! let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
//!
//! // Both columns now share the same scale
//! assert!((scaled.get(0, 0) - scaled.get(0, 1)).abs() < 1e-12);
//! ```

use crate::data::Dataset;
use crate::error::{KlyngeError, Result};
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which standard deviation to divide by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdKind {
    /// Divide the sum of squares by `n - 1` (what R's `scale()` does).
    #[default]
    Sample,
    /// Divide the sum of squares by `n`.
    Population,
}

/// What to do with a column whose values are all equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVariancePolicy {
    /// Return [`KlyngeError::ZeroVariance`].
    #[default]
    Fail,
    /// Map the column to zeros and record a warning.
    ZeroWithWarning,
}

/// Options for [`standardize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizeOptions {
    /// Standard deviation flavour.
    pub std_kind: StdKind,
    /// Zero-variance handling.
    pub zero_variance: ZeroVariancePolicy,
}

/// Standardizes features by removing the mean and scaling to unit variance.
///
/// The standard score of a sample x is: z = (x - mean) / std
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f64>>,
    /// Standard deviation of each feature (computed during fit).
    std: Option<Vec<f64>>,
    /// Columns found to have no variation.
    zero_variance: Vec<usize>,
    std_kind: StdKind,
    policy: ZeroVariancePolicy,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Creates a scaler using the sample standard deviation that fails on
    /// zero-variance columns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
            zero_variance: Vec::new(),
            std_kind: StdKind::Sample,
            policy: ZeroVariancePolicy::Fail,
        }
    }

    /// Sets the standard deviation flavour.
    #[must_use]
    pub fn with_std_kind(mut self, std_kind: StdKind) -> Self {
        self.std_kind = std_kind;
        self
    }

    /// Sets the zero-variance policy.
    #[must_use]
    pub fn with_zero_variance(mut self, policy: ZeroVariancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the mean of each feature.
    ///
    /// # Panics
    ///
    /// Panics if the scaler is not fitted.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        self.mean
            .as_ref()
            .expect("Scaler not fitted. Call fit() first.")
    }

    /// Returns the standard deviation of each feature.
    ///
    /// # Panics
    ///
    /// Panics if the scaler is not fitted.
    #[must_use]
    pub fn std(&self) -> &[f64] {
        self.std
            .as_ref()
            .expect("Scaler not fitted. Call fit() first.")
    }

    /// Indices of columns without variation (only non-empty under
    /// [`ZeroVariancePolicy::ZeroWithWarning`]).
    #[must_use]
    pub fn zero_variance_columns(&self) -> &[usize] {
        &self.zero_variance
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// Transforms standardized data back to the original scale.
    ///
    /// # Errors
    ///
    /// Returns an error if the scaler is not fitted or dimensions mismatch.
    pub fn inverse_transform(&self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        let (mean, std) = self.fitted(x)?;
        let (n_samples, n_features) = x.shape();
        let mut result = Vec::with_capacity(n_samples * n_features);
        for row in x.rows() {
            for (j, &z) in row.iter().enumerate() {
                let value = if self.zero_variance.contains(&j) {
                    mean[j]
                } else {
                    z * std[j] + mean[j]
                };
                result.push(value);
            }
        }
        Matrix::from_vec(n_samples, n_features, result)
    }

    fn fitted(&self, x: &Matrix<f64>) -> Result<(&[f64], &[f64])> {
        let (Some(mean), Some(std)) = (self.mean.as_ref(), self.std.as_ref()) else {
            return Err(KlyngeError::InsufficientData(
                "scaler not fitted".to_string(),
            ));
        };
        if x.n_cols() != mean.len() {
            return Err(KlyngeError::DimensionMismatch {
                expected: format!("{} columns", mean.len()),
                actual: format!("{} columns", x.n_cols()),
            });
        }
        Ok((mean, std))
    }
}

/// A column has no variation when its spread is negligible relative to its level.
fn is_degenerate(std: f64, mean: f64) -> bool {
    std <= 1e-12 * mean.abs().max(1.0)
}

impl Transformer for StandardScaler {
    /// Computes the mean and standard deviation of each feature.
    fn fit(&mut self, x: &Matrix<f64>) -> Result<()> {
        let (n_samples, n_features) = x.shape();

        let min_samples = match self.std_kind {
            StdKind::Sample => 2,
            StdKind::Population => 1,
        };
        if n_samples < min_samples {
            return Err(KlyngeError::InsufficientData(format!(
                "standardization needs at least {min_samples} observations, got {n_samples}"
            )));
        }

        let mean = x.column_means();

        let denom = match self.std_kind {
            StdKind::Sample => (n_samples - 1) as f64,
            StdKind::Population => n_samples as f64,
        };
        let mut std = vec![0.0; n_features];
        for row in x.rows() {
            for (j, &v) in row.iter().enumerate() {
                let diff = v - mean[j];
                std[j] += diff * diff;
            }
        }
        for s in &mut std {
            *s = (*s / denom).sqrt();
        }

        let zero_variance: Vec<usize> = (0..n_features)
            .filter(|&j| is_degenerate(std[j], mean[j]))
            .collect();

        if let Some(&index) = zero_variance.first() {
            if self.policy == ZeroVariancePolicy::Fail {
                return Err(KlyngeError::ZeroVariance {
                    index,
                    column: format!("#{index}"),
                });
            }
        }

        self.mean = Some(mean);
        self.std = Some(std);
        self.zero_variance = zero_variance;

        Ok(())
    }

    /// Standardizes the data using fitted mean and std.
    fn transform(&self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        let (mean, std) = self.fitted(x)?;
        let (n_samples, n_features) = x.shape();

        let mut result = Vec::with_capacity(n_samples * n_features);
        for row in x.rows() {
            for (j, &v) in row.iter().enumerate() {
                let z = if self.zero_variance.contains(&j) {
                    0.0
                } else {
                    (v - mean[j]) / std[j]
                };
                result.push(z);
            }
        }

        Matrix::from_vec(n_samples, n_features, result)
    }
}

/// The standardized view of a dataset together with its scaling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardized {
    /// Z-scored dataset, same keys and order as the input.
    pub dataset: Dataset,
    /// Column means of the raw data.
    pub mean: Vec<f64>,
    /// Column standard deviations of the raw data.
    pub std: Vec<f64>,
    /// Recorded degradations (zero-variance columns mapped to zero).
    pub warnings: Vec<String>,
}

/// Z-scores every activity column of `raw`.
///
/// # Errors
///
/// Returns [`KlyngeError::ZeroVariance`] naming the column under
/// [`ZeroVariancePolicy::Fail`], or an error if there are too few
/// observations.
///
/// # Examples
///
/// ```
/// use klynge::data::Dataset;
/// use klynge::preprocessing::{standardize, StandardizeOptions};
/// use klynge::primitives::Matrix;
///
/// let raw = Dataset::new(
///     vec!["A".into(), "B".into(), "C".into()],
///     vec!["teater".into()],
///     Matrix::from_vec(3, 1, vec![10.0, 20.0, 30.0]).expect("valid matrix"),
/// ).expect("valid dataset");
///
/// let z = standardize(&raw, StandardizeOptions::default()).expect("column varies");
/// assert_eq!(z.dataset.values().column(0), vec![-1.0, 0.0, 1.0]);
/// ```
pub fn standardize(raw: &Dataset, options: StandardizeOptions) -> Result<Standardized> {
    let mut scaler = StandardScaler::new()
        .with_std_kind(options.std_kind)
        .with_zero_variance(options.zero_variance);

    let values = scaler
        .fit_transform(raw.values())
        .map_err(|e| match e {
            KlyngeError::ZeroVariance { index, .. } => KlyngeError::ZeroVariance {
                index,
                column: raw.features()[index].clone(),
            },
            other => other,
        })?;

    let warnings: Vec<String> = scaler
        .zero_variance_columns()
        .iter()
        .map(|&j| {
            let msg = format!(
                "column `{}` has zero variance; standardized to 0",
                raw.features()[j]
            );
            warn!(column = %raw.features()[j], "zero-variance column standardized to 0");
            msg
        })
        .collect();

    Ok(Standardized {
        dataset: raw.with_values(values)?,
        mean: scaler.mean().to_vec(),
        std: scaler.std().to_vec(),
        warnings,
    })
}


#[cfg(test)]
#[path = "tests_standardization_contract.rs"]
mod tests_standardization_contract;
