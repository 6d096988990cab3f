//! Keyed cluster assignments.

use crate::error::{KlyngeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Municipality name to cluster label (`1..=K`), produced by one method.
///
/// The `method` string records where the labels came from, e.g.
/// `"k-means@3"` or `"hierarchical-cut@2"`. Labels from different
/// assignments are unrelated; compare them through
/// [`Contingency`](crate::metrics::Contingency).
///
/// # Examples
///
/// ```
/// use klynge::cluster::Assignment;
///
/// let a = Assignment::from_pairs("k-means@2", [("Aarhus", 1), ("Odense", 2), ("Skive", 1)])
///     .expect("valid labels");
/// assert_eq!(a.label_of("Skive"), Some(1));
/// assert_eq!(a.members(1), vec!["Aarhus", "Skive"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    method: String,
    n_clusters: usize,
    keys: Vec<String>,
    labels: Vec<usize>,
}

impl Assignment {
    /// Builds an assignment from zero-based cluster indices, shifting them to `1..=K`.
    ///
    /// # Errors
    ///
    /// Returns an error if `keys` and `labels` differ in length or keys repeat.
    pub fn from_zero_based(
        method: impl Into<String>,
        keys: &[String],
        labels: &[usize],
    ) -> Result<Self> {
        Self::build(
            method.into(),
            keys.to_vec(),
            labels.iter().map(|&l| l + 1).collect(),
        )
    }

    /// Builds an assignment from `(key, label)` pairs with labels already `1..=K`.
    ///
    /// # Errors
    ///
    /// Returns an error if a label is 0 or a key repeats.
    pub fn from_pairs<K, I>(method: impl Into<String>, pairs: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, usize)>,
    {
        let (keys, labels): (Vec<String>, Vec<usize>) =
            pairs.into_iter().map(|(k, l)| (k.into(), l)).unzip();
        Self::build(method.into(), keys, labels)
    }

    fn build(method: String, keys: Vec<String>, labels: Vec<usize>) -> Result<Self> {
        if keys.len() != labels.len() {
            return Err(KlyngeError::DimensionMismatch {
                expected: format!("{} labels", keys.len()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if labels.contains(&0) {
            return Err(KlyngeError::hyperparameter("label", 0, ">= 1"));
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
        let n_clusters = labels.iter().copied().max().unwrap_or(0);
        Ok(Self {
            method,
            n_clusters,
            keys,
            labels,
        })
    }

    /// Method that produced the labels.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Largest label, K.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Keys in observation order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Labels in observation order.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of labelled observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if nothing is labelled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Label of one municipality.
    #[must_use]
    pub fn label_of(&self, key: &str) -> Option<usize> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| self.labels[i])
    }

    /// `(key, label)` pairs in observation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.labels.iter().copied())
    }

    /// Members per label; labels nobody carries are absent.
    #[must_use]
    pub fn sizes(&self) -> BTreeMap<usize, usize> {
        let mut sizes = BTreeMap::new();
        for &label in &self.labels {
            *sizes.entry(label).or_insert(0) += 1;
        }
        sizes
    }

    /// Keys carrying `label`, in observation order.
    #[must_use]
    pub fn members(&self, label: usize) -> Vec<&str> {
        self.iter()
            .filter(|&(_, l)| l == label)
            .map(|(k, _)| k)
            .collect()
    }

    /// Labels shifted to `0..K`.
    #[must_use]
    pub fn zero_based(&self) -> Vec<usize> {
        self.labels.iter().map(|&l| l - 1).collect()
    }

    /// Labels reordered to follow `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`KlyngeError::KeyMismatch`] unless `keys` is a permutation of
    /// this assignment's keys.
    pub fn labels_for(&self, keys: &[String]) -> Result<Vec<usize>> {
        if keys.len() != self.keys.len() {
            return Err(KlyngeError::KeyMismatch(format!(
                "{} keys against {} in {}",
                keys.len(),
                self.keys.len(),
                self.method
            )));
        }
        let index: HashMap<&str, usize> = self.iter().collect();
        keys.iter()
            .map(|k| {
                index.get(k.as_str()).copied().ok_or_else(|| {
                    KlyngeError::KeyMismatch(format!("'{k}' is not labelled by {}", self.method))
                })
            })
            .collect()
    }

    /// Renames labels through `mapping`, keeping keys and method.
    ///
    /// # Errors
    ///
    /// Returns an error if a label in use has no mapping, two labels map to
    /// the same target, or a target is 0.
    pub fn relabel(&self, mapping: &BTreeMap<usize, usize>) -> Result<Self> {
        let targets: HashSet<usize> = mapping.values().copied().collect();
        if targets.len() != mapping.len() {
            return Err(KlyngeError::hyperparameter(
                "mapping",
                format!("{mapping:?}"),
                "one-to-one",
            ));
        }
        let labels = self
            .labels
            .iter()
            .map(|l| {
                mapping.get(l).copied().ok_or_else(|| {
                    KlyngeError::hyperparameter("mapping", l, "an entry for every label in use")
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::build(self.method.clone(), self.keys.clone(), labels)
    }
}
