//! Error types for the klynge CLI.

use klynge::KlyngeError;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// Input path does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Input path is a directory
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// Input table rejected while loading or standardizing
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Config file or flags rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Clustering or selection failed
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Analysis(_) => ExitCode::from(1),
            Self::FileNotFound(_) | Self::NotAFile(_) => ExitCode::from(3),
            Self::InvalidData(_) => ExitCode::from(4),
            Self::InvalidConfig(_) => ExitCode::from(5),
            Self::Json(_) => ExitCode::from(6),
            Self::Io(_) => ExitCode::from(7),
        }
    }
}

impl From<KlyngeError> for CliError {
    fn from(e: KlyngeError) -> Self {
        match e {
            KlyngeError::Io(err) => Self::Io(err),
            KlyngeError::MissingColumn { .. }
            | KlyngeError::MalformedValue { .. }
            | KlyngeError::DuplicateKey { .. }
            | KlyngeError::RepeatedKey { .. }
            | KlyngeError::DuplicateColumn { .. }
            | KlyngeError::InsufficientData(_)
            | KlyngeError::ZeroVariance { .. }
            | KlyngeError::Csv(_) => Self::InvalidData(e.to_string()),
            KlyngeError::Config(_)
            | KlyngeError::Json(_)
            | KlyngeError::InvalidK { .. }
            | KlyngeError::InvalidRange { .. }
            | KlyngeError::InvalidHyperparameter { .. } => Self::InvalidConfig(e.to_string()),
            other => Self::Analysis(other.to_string()),
        }
    }
}

/// Rejects missing paths and directories before loading.
pub(crate) fn check_file(path: &std::path::Path) -> Result<()> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(CliError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_errors_map_to_invalid_data() {
        let err: CliError = KlyngeError::InsufficientData("one row".into()).into();
        assert!(matches!(err, CliError::InvalidData(_)));
        assert_eq!(err.exit_code(), ExitCode::from(4));
    }

    #[test]
    fn test_range_errors_map_to_invalid_config() {
        let err: CliError = KlyngeError::InvalidRange { k_min: 3, k_max: 2 }.into();
        assert!(matches!(err, CliError::InvalidConfig(_)));
        assert_eq!(err.exit_code(), ExitCode::from(5));
    }

    #[test]
    fn test_io_error_kept() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CliError = KlyngeError::Io(io).into();
        assert!(matches!(err, CliError::Io(_)));
        assert_eq!(err.exit_code(), ExitCode::from(7));
    }

    #[test]
    fn test_check_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            check_file(&dir.path().join("missing.csv")),
            Err(CliError::FileNotFound(_))
        ));
        assert!(matches!(check_file(dir.path()), Err(CliError::NotAFile(_))));
        let file = dir.path().join("data.csv");
        std::fs::write(&file, "kommune,teater\n").unwrap();
        assert!(check_file(&file).is_ok());
    }
}
