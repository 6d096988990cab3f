//! Run command: the full analysis.

use crate::error::Result;
use crate::output;
use klynge::config::AnalysisConfig;
use klynge::pipeline::{Analysis, AnalysisReport};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Run the full pipeline on `file` and print the report, optionally writing
/// the standardized table to `export`.
pub(crate) fn run(
    file: &Path,
    config: AnalysisConfig,
    export: Option<&Path>,
    json: bool,
) -> Result<()> {
    crate::error::check_file(file)?;
    let id_column = config.id_column.clone();
    let report = Analysis::new(config)?.run_path(file)?;
    if let Some(path) = export {
        let writer = BufWriter::new(File::create(path)?);
        report.standardized.write_csv(writer, &id_column)?;
        info!(path = %path.display(), "standardized table written");
    }
    if json {
        return output::json(&report);
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    output::section("Data");
    output::kv("municipalities", report.keys.len());
    output::kv("activities", report.features.len());
    for w in &report.warnings {
        output::warning(w);
    }

    output::section(&format!(
        "Cluster count, K = {}..={}",
        report.config.k_min, report.config.k_max
    ));
    print!("{}", output::diagnostics(&report.diagnostics));

    for ((km, hc), cmp) in report
        .kmeans
        .iter()
        .zip(&report.hierarchical)
        .zip(&report.comparisons)
    {
        output::section(&format!("K = {}", km.k));
        output::kv("total within SS", format!("{:.3}", km.total_within_ss));
        output::kv("between SS", format!("{:.3}", km.between_ss));
        if km.restarts_discarded > 0 {
            output::kv("restarts discarded", km.restarts_discarded);
        }
        println!("\n{}", km.summary);
        print!("{}", output::distinguishing(&km.distinguishing));
        println!("{}", hc.summary);
        print!("{}", output::contingency_table(&cmp.contingency));
        output::kv(
            "agreement",
            format!("{}/{}", cmp.agreement, cmp.contingency.total()),
        );
        output::kv("adjusted Rand index", format!("{:.3}", cmp.adjusted_rand_index));
    }
}
