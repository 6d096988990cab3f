//! Keyed datasets of municipalities and the CSV loader/cleaner.
//!
//! A [`Dataset`] is an ordered set of observations (municipalities), each
//! keyed by a unique name and carrying one value per activity column.
//! [`DatasetLoader`] reads one from delimited text, dropping aggregate rows.

mod loader;

pub use loader::{normalize_column_name, DatasetLoader, DEFAULT_AGGREGATE_PATTERNS};

use crate::error::{KlyngeError, Result};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Write;

/// Ordered, keyed observations sharing the same activity columns.
///
/// # Examples
///
/// ```
/// use klynge::data::Dataset;
/// use klynge::primitives::Matrix;
///
/// let values = Matrix::from_vec(2, 2, vec![12.0, 40.5, 8.0, 33.0]).expect("valid matrix");
/// let ds = Dataset::new(
///     vec!["Aarhus".into(), "Odense".into()],
///     vec!["teater".into(), "bibliotek".into()],
///     values,
/// ).expect("valid dataset");
///
/// assert_eq!(ds.shape(), (2, 2));
/// assert_eq!(ds.observation("Odense"), Some(&[8.0, 33.0][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    keys: Vec<String>,
    features: Vec<String>,
    values: Matrix<f64>,
}

impl Dataset {
    /// Creates a dataset from keys, feature names and a value matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if shapes disagree, keys or feature names repeat, or
    /// there are no feature columns.
    pub fn new(keys: Vec<String>, features: Vec<String>, values: Matrix<f64>) -> Result<Self> {
        if values.n_rows() != keys.len() || values.n_cols() != features.len() {
            return Err(KlyngeError::DimensionMismatch {
                expected: format!("{}x{}", keys.len(), features.len()),
                actual: format!("{}x{}", values.n_rows(), values.n_cols()),
            });
        }
        if features.is_empty() {
            return Err(KlyngeError::InsufficientData(
                "dataset has no activity columns".to_string(),
            ));
        }

        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            if let Some(&first) = seen.get(key.as_str()) {
                return Err(KlyngeError::RepeatedKey {
                    key: key.clone(),
                    first,
                    second: i,
                });
            }
            seen.insert(key, i);
        }

        let mut seen = HashSet::with_capacity(features.len());
        for feature in &features {
            if !seen.insert(feature.as_str()) {
                return Err(KlyngeError::DuplicateColumn {
                    column: feature.clone(),
                });
            }
        }

        Ok(Self {
            keys,
            features,
            values,
        })
    }

    /// Returns the shape as (observations, features).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// Number of observations.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.keys.len()
    }

    /// Number of activity columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Returns true if there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Municipality names, in row order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Activity column names, in column order.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// The value matrix (rows follow [`Dataset::keys`]).
    #[must_use]
    pub fn values(&self) -> &Matrix<f64> {
        &self.values
    }

    /// Row index of a municipality.
    #[must_use]
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Values of one municipality.
    #[must_use]
    pub fn observation(&self, key: &str) -> Option<&[f64]> {
        self.index_of(key).map(|i| self.values.row(i))
    }

    /// Values of one activity column.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<Vec<f64>> {
        self.features
            .iter()
            .position(|f| f == name)
            .map(|j| self.values.column(j))
    }

    /// Same keys and features, different values (e.g. the standardized view).
    ///
    /// # Errors
    ///
    /// Returns an error if `values` has a different shape.
    pub fn with_values(&self, values: Matrix<f64>) -> Result<Self> {
        if values.shape() != self.shape() {
            let (r, c) = self.shape();
            return Err(KlyngeError::DimensionMismatch {
                expected: format!("{r}x{c}"),
                actual: format!("{}x{}", values.n_rows(), values.n_cols()),
            });
        }
        Ok(Self {
            keys: self.keys.clone(),
            features: self.features.clone(),
            values,
        })
    }

    /// Keeps only the observations whose key satisfies `keep`, in order.
    #[must_use]
    pub fn filter<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        let indices: Vec<usize> = self
            .keys
            .iter()
            .enumerate()
            .filter(|(_, k)| keep(k.as_str()))
            .map(|(i, _)| i)
            .collect();
        Self {
            keys: indices.iter().map(|&i| self.keys[i].clone()).collect(),
            features: self.features.clone(),
            values: self.values.select_rows(&indices),
        }
    }

    /// Writes the dataset as CSV, with `id_column` as the first header.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W, id_column: &str) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = Vec::with_capacity(self.features.len() + 1);
        header.push(id_column);
        header.extend(self.features.iter().map(String::as_str));
        wtr.write_record(&header)?;

        for (key, row) in self.keys.iter().zip(self.values.rows()) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(key.clone());
            record.extend(row.iter().map(f64::to_string));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
