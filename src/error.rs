//! Error types for klynge operations.
//!
//! Every fatal condition of the pipeline maps to one variant, carrying the
//! row, column or parameter that caused it.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = KlyngeError> = std::result::Result<T, E>;

/// Main error type for klynge operations.
///
/// # Examples
///
/// ```
/// use klynge::error::KlyngeError;
///
/// let err = KlyngeError::InvalidK { k: 0, n_samples: 10 };
/// assert!(err.to_string().contains("k = 0"));
/// ```
#[derive(Error, Debug)]
pub enum KlyngeError {
    /// The identifier column is absent from the header.
    #[error("missing identifier column `{column}`")]
    MissingColumn {
        /// Column that was requested
        column: String,
    },

    /// A cell could not be used as an activity value.
    #[error("line {line}, municipality `{key}`, column `{column}`: {reason}")]
    MalformedValue {
        /// 1-based line in the source (header is line 1)
        line: u64,
        /// Row identifier
        key: String,
        /// Column identifier
        column: String,
        /// What is wrong with the cell
        reason: String,
    },

    /// Two rows share the same municipality name.
    #[error("duplicate municipality `{key}` on line {line}")]
    DuplicateKey {
        /// Repeated key
        key: String,
        /// Line of the second occurrence
        line: u64,
    },

    /// An in-memory dataset or assignment lists a municipality twice.
    #[error("municipality `{key}` listed twice, at positions {first} and {second}")]
    RepeatedKey {
        /// Repeated key
        key: String,
        /// Zero-based position of the first occurrence
        first: usize,
        /// Zero-based position of the second occurrence
        second: usize,
    },

    /// Two activity columns share a name.
    #[error("duplicate activity column `{column}`")]
    DuplicateColumn {
        /// Repeated column name
        column: String,
    },

    /// Not enough data for the requested operation.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A column has no variation and cannot be standardized.
    #[error("column `{column}` (index {index}) has zero variance")]
    ZeroVariance {
        /// Column index
        index: usize,
        /// Column identifier
        column: String,
    },

    /// Requested cluster count is outside `1..=n_samples`.
    #[error("invalid cluster count: k = {k}, expected 1..={n_samples}")]
    InvalidK {
        /// Requested number of clusters
        k: usize,
        /// Number of observations available
        n_samples: usize,
    },

    /// Candidate range for the cluster-count search is empty or malformed.
    #[error("invalid cluster-count range {k_min}..={k_max}")]
    InvalidRange {
        /// Lower bound
        k_min: usize,
        /// Upper bound
        k_max: usize,
    },

    /// Shapes of two inputs disagree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },

    /// Every k-means restart hit an empty cluster.
    #[error("all {restarts} k-means restarts produced an empty cluster (k = {k})")]
    AllRestartsFailed {
        /// Number of clusters
        k: usize,
        /// Restarts attempted
        restarts: usize,
    },

    /// Two assignments or a dataset and an assignment cover different keys.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    /// Invalid hyperparameter value provided.
    #[error("invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Invalid analysis configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KlyngeError {
    /// Shorthand for [`KlyngeError::InvalidHyperparameter`].
    pub(crate) fn hyperparameter(
        param: &str,
        value: impl ToString,
        constraint: &str,
    ) -> Self {
        KlyngeError::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}
