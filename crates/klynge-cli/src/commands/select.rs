//! Select command: cluster-count diagnostics only.

use super::load_standardized;
use crate::error::Result;
use crate::output;
use klynge::config::AnalysisConfig;
use klynge::selection::default_indices;
use std::path::Path;

/// Elbow, silhouette and vote over the configured K range.
pub(crate) fn run(file: &Path, mut config: AnalysisConfig, json: bool) -> Result<()> {
    let (_, z) = load_standardized(file, &config)?;
    if let Some(w) = config.clamp_k_max(z.dataset.values()) {
        output::warning(&w);
    }
    let indices = if config.vote {
        default_indices()
    } else {
        Vec::new()
    };
    let diagnostics = config
        .selector()?
        .diagnostics(z.dataset.values(), &indices, config.vote_method)?;

    if json {
        return output::json(&diagnostics);
    }
    output::section(&format!(
        "Cluster count, K = {}..={}",
        config.k_min, config.k_max
    ));
    print!("{}", output::diagnostics(&diagnostics));
    Ok(())
}
