//! Cross-tabulation of two partitions of the same observations.
//!
//! Cluster labels from independent runs carry no shared meaning, so any
//! comparison goes through a [`Contingency`] table and, when a label
//! correspondence is wanted, through [`Contingency::best_matching`].

use crate::cluster::Assignment;
use crate::error::{KlyngeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest column count solved exactly by [`Contingency::best_matching`].
const EXACT_MATCHING_LIMIT: usize = 12;

/// Counts of observations for every (row label, column label) pair.
///
/// # Examples
///
/// ```
/// use klynge::metrics::Contingency;
///
/// let kmeans = [1, 1, 2, 2];
/// let hier = [1, 1, 1, 2];
/// let table = Contingency::from_labels(&kmeans, &hier).expect("same length");
///
/// assert_eq!(table.count(1, 1), 2);
/// assert_eq!(table.count(2, 1), 1);
/// assert_eq!(table.count(2, 2), 1);
/// assert_eq!(table.count(1, 2), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contingency {
    row_method: String,
    col_method: String,
    row_labels: Vec<usize>,
    col_labels: Vec<usize>,
    counts: Vec<Vec<usize>>,
}

impl Contingency {
    /// Cross-tabulates two label sequences over the same observations.
    ///
    /// Row and column labels are the distinct values of each sequence, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequences have different lengths.
    pub fn from_labels(rows: &[usize], cols: &[usize]) -> Result<Self> {
        Self::build("rows", "columns", rows, cols)
    }

    /// Cross-tabulates two keyed assignments, matching observations by key.
    ///
    /// # Errors
    ///
    /// Returns [`KlyngeError::KeyMismatch`] if the assignments do not cover
    /// exactly the same municipalities.
    pub fn from_assignments(rows: &Assignment, cols: &Assignment) -> Result<Self> {
        let aligned = cols.labels_for(rows.keys())?;
        Self::build(rows.method(), cols.method(), rows.labels(), &aligned)
    }

    fn build(row_method: &str, col_method: &str, rows: &[usize], cols: &[usize]) -> Result<Self> {
        if rows.len() != cols.len() {
            return Err(KlyngeError::DimensionMismatch {
                expected: format!("{} labels", rows.len()),
                actual: format!("{} labels", cols.len()),
            });
        }

        let row_labels = sorted_distinct(rows);
        let col_labels = sorted_distinct(cols);
        let mut counts = vec![vec![0usize; col_labels.len()]; row_labels.len()];
        for (r, c) in rows.iter().zip(cols) {
            // both searches succeed: labels come from the same sequences
            if let (Ok(i), Ok(j)) = (row_labels.binary_search(r), col_labels.binary_search(c)) {
                counts[i][j] += 1;
            }
        }

        Ok(Self {
            row_method: row_method.to_string(),
            col_method: col_method.to_string(),
            row_labels,
            col_labels,
            counts,
        })
    }

    /// Method that produced the row labels.
    #[must_use]
    pub fn row_method(&self) -> &str {
        &self.row_method
    }

    /// Method that produced the column labels.
    #[must_use]
    pub fn col_method(&self) -> &str {
        &self.col_method
    }

    /// Distinct row labels, sorted.
    #[must_use]
    pub fn row_labels(&self) -> &[usize] {
        &self.row_labels
    }

    /// Distinct column labels, sorted.
    #[must_use]
    pub fn col_labels(&self) -> &[usize] {
        &self.col_labels
    }

    /// Count matrix indexed by label position.
    #[must_use]
    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Observations labelled `row` by the first partition and `col` by the second.
    #[must_use]
    pub fn count(&self, row: usize, col: usize) -> usize {
        match (
            self.row_labels.binary_search(&row),
            self.col_labels.binary_search(&col),
        ) {
            (Ok(i), Ok(j)) => self.counts[i][j],
            _ => 0,
        }
    }

    /// Row sums (cluster sizes of the first partition).
    #[must_use]
    pub fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    /// Column sums (cluster sizes of the second partition).
    #[must_use]
    pub fn col_totals(&self) -> Vec<usize> {
        (0..self.col_labels.len())
            .map(|j| self.counts.iter().map(|r| r[j]).sum())
            .collect()
    }

    /// Number of observations.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// One-to-one label correspondence maximizing the number of observations
    /// on matched cells, as `(row_label, col_label)` pairs.
    ///
    /// Solved exactly for tables with at most a dozen labels on the smaller
    /// side, greedily (largest cell first) beyond that. Cells with a zero
    /// count are never matched, so some labels may stay unmatched.
    ///
    /// ```
    /// use klynge::metrics::Contingency;
    ///
    /// // the same partition under swapped names
    /// let table = Contingency::from_labels(&[1, 1, 2, 2, 3], &[2, 2, 1, 1, 3]).expect("same length");
    /// assert_eq!(table.best_matching(), vec![(1, 2), (2, 1), (3, 3)]);
    /// assert_eq!(table.matched_count(), 5);
    /// ```
    #[must_use]
    pub fn best_matching(&self) -> Vec<(usize, usize)> {
        let transposed = self.col_labels.len() > self.row_labels.len();
        let weights: Vec<Vec<usize>> = if transposed {
            (0..self.col_labels.len())
                .map(|j| self.counts.iter().map(|r| r[j]).collect())
                .collect()
        } else {
            self.counts.clone()
        };
        let n_cols = weights.first().map_or(0, Vec::len);

        let positions = if n_cols <= EXACT_MATCHING_LIMIT {
            exact_matching(&weights, n_cols)
        } else {
            greedy_matching(&weights)
        };

        let mut pairs: Vec<(usize, usize)> = positions
            .into_iter()
            .map(|(i, j)| {
                if transposed {
                    (self.row_labels[j], self.col_labels[i])
                } else {
                    (self.row_labels[i], self.col_labels[j])
                }
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Observations on the cells chosen by [`Contingency::best_matching`].
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.best_matching()
            .into_iter()
            .map(|(r, c)| self.count(r, c))
            .sum()
    }

    /// Adjusted Rand index of the two partitions (1 for identical partitions,
    /// about 0 for chance agreement).
    #[must_use]
    pub fn adjusted_rand_index(&self) -> f64 {
        let n = self.total();
        if n < 2 {
            return 1.0;
        }
        let pairs = |m: usize| (m * m.saturating_sub(1) / 2) as f64;
        let index: f64 = self.counts.iter().flatten().map(|&m| pairs(m)).sum();
        let sum_rows: f64 = self.row_totals().into_iter().map(pairs).sum();
        let sum_cols: f64 = self.col_totals().into_iter().map(pairs).sum();
        let expected = sum_rows * sum_cols / pairs(n);
        let max = (sum_rows + sum_cols) / 2.0;
        if (max - expected).abs() < f64::EPSILON {
            return 1.0;
        }
        (index - expected) / (max - expected)
    }
}

/// Adjusted Rand index between two label sequences.
///
/// # Errors
///
/// Returns an error if the sequences have different lengths.
pub fn adjusted_rand_index(a: &[usize], b: &[usize]) -> Result<f64> {
    Ok(Contingency::from_labels(a, b)?.adjusted_rand_index())
}

fn sorted_distinct(labels: &[usize]) -> Vec<usize> {
    let mut out = labels.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}

/// Maximum-weight matching by dynamic programming over used-column masks.
fn exact_matching(weights: &[Vec<usize>], n_cols: usize) -> Vec<(usize, usize)> {
    let n_rows = weights.len();
    let full = 1usize << n_cols;
    // best[i][mask]: best total from rows i.. given columns in mask are taken
    let mut best = vec![vec![0usize; full]; n_rows + 1];
    for i in (0..n_rows).rev() {
        for mask in 0..full {
            let mut value = best[i + 1][mask];
            for (j, &w) in weights[i].iter().enumerate() {
                let bit = 1 << j;
                if w > 0 && mask & bit == 0 {
                    value = value.max(w + best[i + 1][mask | bit]);
                }
            }
            best[i][mask] = value;
        }
    }

    let mut pairs = Vec::new();
    let mut mask = 0;
    for i in 0..n_rows {
        let target = best[i][mask];
        let taken = weights[i].iter().enumerate().find(|&(j, &w)| {
            let bit = 1 << j;
            w > 0 && mask & bit == 0 && w + best[i + 1][mask | bit] == target
        });
        if let Some((j, _)) = taken {
            pairs.push((i, j));
            mask |= 1 << j;
        }
    }
    pairs
}

/// Largest cells first, skipping rows and columns already matched.
fn greedy_matching(weights: &[Vec<usize>]) -> Vec<(usize, usize)> {
    let mut cells: Vec<(usize, usize, usize)> = weights
        .iter()
        .enumerate()
        .flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &w)| w > 0)
                .map(move |(j, &w)| (w, i, j))
        })
        .collect();
    cells.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let n_cols = weights.first().map_or(0, Vec::len);
    let mut row_used = vec![false; weights.len()];
    let mut col_used = vec![false; n_cols];
    let mut pairs = Vec::new();
    for (_, i, j) in cells {
        if !row_used[i] && !col_used[j] {
            row_used[i] = true;
            col_used[j] = true;
            pairs.push((i, j));
        }
    }
    pairs
}

impl fmt::Display for Contingency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let corner = format!("{} \\ {}", self.row_method, self.col_method);
        let width = self
            .col_labels
            .iter()
            .map(|l| l.to_string().len())
            .chain(self.counts.iter().flatten().map(|c| c.to_string().len()))
            .max()
            .unwrap_or(1)
            .max(5);

        write!(f, "{corner:<w$}", w = corner.len())?;
        for label in &self.col_labels {
            write!(f, " {label:>width$}")?;
        }
        writeln!(f, " {:>width$}", "total")?;

        for ((label, row), total) in self
            .row_labels
            .iter()
            .zip(&self.counts)
            .zip(self.row_totals())
        {
            write!(f, "{label:<w$}", w = corner.len())?;
            for count in row {
                write!(f, " {count:>width$}")?;
            }
            writeln!(f, " {total:>width$}")?;
        }

        write!(f, "{:<w$}", "total", w = corner.len())?;
        for total in self.col_totals() {
            write!(f, " {total:>width$}")?;
        }
        writeln!(f, " {:>width$}", self.total())
    }
}
