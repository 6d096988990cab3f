//! Core traits for estimators and transformers.
//!
//! Clustering estimators are configuration objects: fitting borrows them
//! immutably and returns a new result value, so one configured estimator can
//! be fitted many times (different K, different data) without hidden state.

use crate::error::Result;
use crate::primitives::Matrix;

/// Trait for unsupervised learning models.
///
/// # Examples
///
/// ```
/// use klynge::prelude::*;
///
/// let data = Matrix::from_vec(6, 2, vec![
///     0.0, 0.0, 0.1, 0.1, 0.2, 0.0,  // group 1
///     10.0, 10.0, 10.1, 10.1, 10.0, 10.2,  // group 2
/// ]).expect("valid matrix dimensions");
///
/// let fit = KMeans::new(2).with_random_state(42).fit(&data).expect("fit succeeds");
/// assert_eq!(fit.labels().len(), 6);
/// ```
pub trait UnsupervisedEstimator {
    /// The fitted result produced by one run.
    type Fitted;

    /// Fits the model to data, returning an immutable result.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (empty data, invalid parameters, etc.).
    fn fit(&self, x: &Matrix<f64>) -> Result<Self::Fitted>;
}

/// Trait for data transformers (scalers).
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix<f64>) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if transformer is not fitted.
    fn transform(&self, x: &Matrix<f64>) -> Result<Matrix<f64>>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
