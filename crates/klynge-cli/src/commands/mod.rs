//! Command implementations

pub(crate) mod dendrogram;
pub(crate) mod run;
pub(crate) mod select;

use crate::error::{check_file, Result};
use klynge::config::AnalysisConfig;
use klynge::data::Dataset;
use klynge::preprocessing::{standardize, Standardized};
use std::path::Path;
use tracing::warn;

/// Config file if given, defaults otherwise.
pub(crate) fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            check_file(path)?;
            Ok(AnalysisConfig::from_json_path(path)?)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Loads and standardizes the table at `file`.
pub(crate) fn load_standardized(
    file: &Path,
    config: &AnalysisConfig,
) -> Result<(Dataset, Standardized)> {
    check_file(file)?;
    let raw = config.loader().load_path(file)?;
    let z = standardize(&raw, config.standardize_options())?;
    for w in &z.warnings {
        warn!("{w}");
    }
    Ok((raw, z))
}
