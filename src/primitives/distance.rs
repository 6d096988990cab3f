//! Euclidean distances and the pairwise distance matrix.

use super::Matrix;
use crate::error::{KlyngeError, Result};
use serde::{Deserialize, Serialize};

/// Squared Euclidean distance between two equally long slices.
#[must_use]
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean distance between two equally long slices.
#[must_use]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Symmetric pairwise Euclidean distances between the rows of a matrix.
///
/// Stored in condensed form (upper triangle, row by row), so `n` rows take
/// `n * (n - 1) / 2` entries.
///
/// # Examples
///
/// ```
/// use klynge::primitives::{DistanceMatrix, Matrix};
///
/// let x = Matrix::from_vec(3, 2, vec![0.0, 0.0, 3.0, 4.0, 0.0, 1.0]).expect("valid matrix");
/// let d = DistanceMatrix::from_rows(&x);
/// assert!((d.get(0, 1) - 5.0).abs() < 1e-12);
/// assert!((d.get(2, 0) - 1.0).abs() < 1e-12);
/// assert_eq!(d.get(1, 1), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    n: usize,
    condensed: Vec<f64>,
}

impl DistanceMatrix {
    /// Computes all pairwise Euclidean distances between rows of `x`.
    #[must_use]
    pub fn from_rows(x: &Matrix<f64>) -> Self {
        let n = x.n_rows();
        let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                condensed.push(euclidean(x.row(i), x.row(j)));
            }
        }
        Self { n, condensed }
    }

    /// Wraps an existing condensed upper triangle over `n` points.
    ///
    /// # Errors
    ///
    /// Returns an error if `condensed` does not hold `n * (n - 1) / 2` entries.
    pub fn from_condensed(n: usize, condensed: Vec<f64>) -> Result<Self> {
        let expected = n * n.saturating_sub(1) / 2;
        if condensed.len() != expected {
            return Err(KlyngeError::DimensionMismatch {
                expected: format!("{expected} condensed distances"),
                actual: format!("{}", condensed.len()),
            });
        }
        Ok(Self { n, condensed })
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Returns true if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Distance between points `i` and `j` (zero on the diagonal).
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.n && j < self.n, "index out of bounds");
        if i == j {
            return 0.0;
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        // offset of row i in the condensed upper triangle
        let offset = i * self.n - i * (i + 1) / 2;
        self.condensed[offset + (j - i - 1)]
    }

    /// Condensed upper-triangle storage.
    #[must_use]
    pub fn as_condensed(&self) -> &[f64] {
        &self.condensed
    }
}
