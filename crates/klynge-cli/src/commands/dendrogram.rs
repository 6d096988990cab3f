//! Dendrogram command: hierarchical merge list.

use super::load_standardized;
use crate::error::Result;
use crate::output;
use klynge::cluster::AgglomerativeClustering;
use klynge::config::AnalysisConfig;
use klynge::UnsupervisedEstimator;
use std::path::Path;

/// Print the merge list, and the assignment at `cut` when given.
pub(crate) fn run(file: &Path, config: &AnalysisConfig, cut: Option<usize>, json: bool) -> Result<()> {
    let (_, z) = load_standardized(file, config)?;
    let tree = AgglomerativeClustering::new(config.linkage).fit(z.dataset.values())?;
    let assignment = cut
        .map(|k| tree.to_assignment(&z.dataset, k))
        .transpose()?;

    if json {
        return match assignment {
            Some(a) => output::json(&serde_json::json!({ "dendrogram": tree, "assignment": a })),
            None => output::json(&tree),
        };
    }

    output::section(&format!("{} linkage", tree.linkage()));
    print!("{}", output::merges(&tree, z.dataset.keys()));
    if let Some(a) = assignment {
        output::section(a.method());
        for (label, size) in a.sizes() {
            output::kv(&format!("#{label} ({size})"), a.members(label).join(", "));
        }
    }
    Ok(())
}
