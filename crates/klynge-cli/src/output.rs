//! Output formatting utilities

use colored::Colorize;
use klynge::cluster::Dendrogram;
use klynge::metrics::Contingency;
use klynge::report::Deviation;
use klynge::selection::{SelectionDiagnostics, VoteDistribution};
use serde::Serialize;
use std::collections::BTreeMap;

/// Print a section header
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {title} ===").cyan().bold());
}

/// Print a key-value pair
pub(crate) fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Print a warning message
pub(crate) fn warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// Pretty-printed JSON on stdout.
pub(crate) fn json<T: Serialize>(value: &T) -> crate::error::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Contingency table as text, label headers highlighted.
pub(crate) fn contingency_table(table: &Contingency) -> String {
    let mut out = format!(
        "{:>12} {}\n",
        table.row_method().bold(),
        format!("\\ {}", table.col_method()).bold()
    );
    out.push_str(&format!("{:>12}", ""));
    for label in table.col_labels() {
        out.push_str(&format!(" {:>6}", format!("#{label}").cyan()));
    }
    out.push_str(&format!(" {:>6}\n", "total".bold()));

    for ((label, row), total) in table
        .row_labels()
        .iter()
        .zip(table.counts())
        .zip(table.row_totals())
    {
        out.push_str(&format!("{:>12}", format!("#{label}").cyan()));
        for count in row {
            out.push_str(&format!(" {count:>6}"));
        }
        out.push_str(&format!(" {total:>6}\n"));
    }

    out.push_str(&format!("{:>12}", "total".bold()));
    for total in table.col_totals() {
        out.push_str(&format!(" {total:>6}"));
    }
    out.push_str(&format!(" {:>6}\n", table.total()));
    out
}

/// Elbow, silhouette and vote as text.
pub(crate) fn diagnostics(diag: &SelectionDiagnostics) -> String {
    let mut out = format!("{:>4} {:>12} {:>10}\n", "K".bold(), "WSS".bold(), "silhouette".bold());
    for point in diag.elbow.points() {
        let sil = diag
            .silhouette
            .as_ref()
            .and_then(|s| s.curve.score(point.k))
            .map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
        out.push_str(&format!("{:>4} {:>12.3} {:>10}\n", point.k, point.score, sil));
    }
    if let Some(sil) = &diag.silhouette {
        out.push_str(&format!("best silhouette at K = {}\n", sil.best_k.to_string().green().bold()));
    }
    if let Some(vote) = &diag.vote {
        out.push_str(&vote_table(vote));
    }
    out
}

/// Most distinguishing activities per cluster, signed difference from the
/// overall mean.
pub(crate) fn distinguishing(by_label: &BTreeMap<usize, Vec<Deviation>>) -> String {
    let mut out = String::new();
    for (label, deviations) in by_label {
        let items: Vec<String> = deviations
            .iter()
            .map(|d| format!("{} {:+.1}", d.feature, d.difference))
            .collect();
        out.push_str(&format!("  {}: {}\n", format!("#{label}").cyan(), items.join(", ")));
    }
    out
}

fn vote_table(vote: &VoteDistribution) -> String {
    let mut out = String::new();
    for (k, n) in vote.counts() {
        out.push_str(&format!(
            "  K = {k:>2}: {n} vote(s) [{}]\n",
            vote.voters(k).join(", ")
        ));
    }
    if !vote.abstained().is_empty() {
        out.push_str(&format!("  abstained: {}\n", vote.abstained().join(", ")));
    }
    let leaders: Vec<String> = vote.leaders().iter().map(ToString::to_string).collect();
    out.push_str(&format!("  leading K: {}\n", leaders.join(", ").green().bold()));
    out
}

/// Merge list with node ids and heights.
pub(crate) fn merges(tree: &Dendrogram, keys: &[String]) -> String {
    let name = |node: usize| {
        keys.get(node)
            .cloned()
            .unwrap_or_else(|| format!("node {node}"))
    };
    let mut out = format!(
        "{:>4} {:<24} {:<24} {:>10} {:>5}\n",
        "step".bold(),
        "left".bold(),
        "right".bold(),
        "height".bold(),
        "size".bold()
    );
    for (s, m) in tree.merges().iter().enumerate() {
        out.push_str(&format!(
            "{:>4} {:<24} {:<24} {:>10.4} {:>5}\n",
            s + 1,
            name(m.left),
            name(m.right),
            m.distance,
            m.size
        ));
    }
    out
}
