//! Delimited-text loader for municipality tables.

use super::Dataset;
use crate::error::{KlyngeError, Result};
use crate::primitives::Matrix;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Identifier fragments that mark regional or national rollups.
///
/// Matched case-insensitively as substrings of the row identifier.
pub const DEFAULT_AGGREGATE_PATTERNS: &[&str] = &["Region", "Province", "Landsdel", "Hele landet"];

/// Reads a [`Dataset`] from CSV-like text.
///
/// The identifier column is matched after normalization, so `Kommune`,
/// `kommune` and ` KOMMUNE ` all select the same column. Every other column
/// is an activity column and must hold a number in every retained row.
///
/// # Examples
///
/// ```
/// use klynge::data::DatasetLoader;
///
/// let csv = "Kommune,Teater (%),Koncert (%)\n\
///            Region Midtjylland,20.0,30.0\n\
///            Aarhus,22.5,31.0\n\
///            Skive,11.0,25.5\n";
///
/// let ds = DatasetLoader::new("kommune").load_reader(csv.as_bytes()).expect("valid table");
/// assert_eq!(ds.keys(), &["Aarhus".to_string(), "Skive".to_string()]);
/// assert_eq!(ds.features(), &["teater".to_string(), "koncert".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    id_column: String,
    aggregate_patterns: Vec<String>,
    delimiter: u8,
    check_percentages: bool,
}

impl DatasetLoader {
    /// Creates a loader keyed on `id_column`, with default aggregate patterns,
    /// comma delimiter and percentage validation on.
    #[must_use]
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            aggregate_patterns: DEFAULT_AGGREGATE_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            delimiter: b',',
            check_percentages: true,
        }
    }

    /// Replaces the aggregate-row patterns.
    #[must_use]
    pub fn with_aggregate_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregate_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the field delimiter. With a non-comma delimiter, decimal commas
    /// (`12,5`) are accepted.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Enables or disables the `0..=100` range check on values.
    #[must_use]
    pub fn with_percentage_check(mut self, check: bool) -> Self {
        self.check_percentages = check;
        self
    }

    /// Returns true if `key` names an aggregate row.
    #[must_use]
    pub fn is_aggregate(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.aggregate_patterns
            .iter()
            .any(|p| !p.is_empty() && key.contains(&p.to_lowercase()))
    }

    /// Loads a dataset from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its contents are
    /// malformed (see [`DatasetLoader::load_reader`]).
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading dataset");
        let file = File::open(path)?;
        self.load_reader(file)
    }

    /// Loads a dataset from any reader.
    ///
    /// # Errors
    ///
    /// - [`KlyngeError::MissingColumn`] if the identifier column is absent
    /// - [`KlyngeError::MalformedValue`] for empty or non-numeric cells
    /// - [`KlyngeError::DuplicateKey`] if a municipality appears twice
    /// - [`KlyngeError::InsufficientData`] if nothing remains after cleaning
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Dataset> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = normalize_column_names(rdr.headers()?.iter());
        let id_key = normalize_column_name(&self.id_column);
        let id_idx = headers
            .iter()
            .position(|h| *h == id_key)
            .ok_or_else(|| KlyngeError::MissingColumn {
                column: self.id_column.clone(),
            })?;

        let features: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != id_idx)
            .map(|(_, h)| h.clone())
            .collect();
        if features.is_empty() {
            return Err(KlyngeError::InsufficientData(
                "table has no activity columns".to_string(),
            ));
        }

        let mut keys = Vec::new();
        let mut values = Vec::new();
        let mut seen = HashSet::new();
        let mut excluded = Vec::new();

        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let line = record.position().map_or(i as u64 + 2, csv::Position::line);
            let key = record.get(id_idx).unwrap_or_default().to_string();

            if key.is_empty() {
                return Err(KlyngeError::MalformedValue {
                    line,
                    key,
                    column: headers[id_idx].clone(),
                    reason: "empty identifier".to_string(),
                });
            }
            if self.is_aggregate(&key) {
                excluded.push(key);
                continue;
            }
            if !seen.insert(key.clone()) {
                return Err(KlyngeError::DuplicateKey { key, line });
            }

            for (j, raw) in record.iter().enumerate() {
                if j == id_idx {
                    continue;
                }
                let value = self
                    .parse_value(raw)
                    .map_err(|reason| KlyngeError::MalformedValue {
                        line,
                        key: key.clone(),
                        column: headers[j].clone(),
                        reason,
                    })?;
                values.push(value);
            }
            keys.push(key);
        }

        if keys.is_empty() {
            return Err(KlyngeError::InsufficientData(
                "no municipality rows after removing aggregates".to_string(),
            ));
        }

        debug!(
            rows = keys.len(),
            columns = features.len(),
            excluded = ?excluded,
            "dataset loaded"
        );

        let values = Matrix::from_vec(keys.len(), features.len(), values)?;
        Dataset::new(keys, features, values)
    }

    fn parse_value(&self, raw: &str) -> std::result::Result<f64, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty value".to_string());
        }
        let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();

        let owned;
        let text = if self.delimiter != b',' && trimmed.contains(',') && !trimmed.contains('.') {
            owned = trimmed.replace(',', ".");
            owned.as_str()
        } else {
            trimmed
        };

        let value: f64 = text
            .parse()
            .map_err(|_| format!("not a number: `{raw}`"))?;
        if !value.is_finite() {
            return Err(format!("non-finite value: `{raw}`"));
        }
        if self.check_percentages && !(0.0..=100.0).contains(&value) {
            return Err(format!("{value} is outside 0..=100"));
        }
        Ok(value)
    }
}

/// Normalizes one column identifier.
///
/// Lower-cases, transliterates `æ`/`ø`/`å`, collapses every run of other
/// characters to `_`, trims underscores, and prefixes `x` to a leading digit.
///
/// ```
/// use klynge::data::normalize_column_name;
///
/// assert_eq!(normalize_column_name("Gået i Teatret (%)"), "gaaet_i_teatret");
/// assert_eq!(normalize_column_name("2019 Koncert"), "x2019_koncert");
/// ```
#[must_use]
pub fn normalize_column_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for ch in raw.trim().to_lowercase().chars() {
        let mapped: Option<&str> = match ch {
            'æ' => Some("ae"),
            'ø' => Some("oe"),
            'å' => Some("aa"),
            _ => None,
        };
        if let Some(s) = mapped {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push_str(s);
        } else if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        return "x".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'x');
    }
    out
}

/// Normalizes a header row, suffixing repeats with `_2`, `_3`, ...
///
/// A suffix that some other header already normalizes to is skipped, so
/// `a, a, a_2` becomes `a, a_3, a_2`.
pub(crate) fn normalize_column_names<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let normalized: Vec<String> = raw.map(normalize_column_name).collect();
    let reserved: HashSet<&str> = normalized.iter().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(normalized.len());
    for name in &normalized {
        let unique = if used.contains(name) {
            (2..)
                .map(|n| format!("{name}_{n}"))
                .find(|c| !reserved.contains(c.as_str()) && !used.contains(c))
                .unwrap_or_else(|| name.clone())
        } else {
            name.clone()
        };
        used.insert(unique.clone());
        names.push(unique);
    }
    names
}
