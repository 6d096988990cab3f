//! klynge - clustering of municipalities by cultural participation
//!
//! Usage:
//!   klynge run data.csv                     # Full analysis at K = 2 and 3
//!   klynge run data.csv --k 2,3,4 --json    # JSON report
//!   klynge select data.csv --k-max 10       # Cluster-count diagnostics
//!   klynge dendrogram data.csv --cut 3      # Merge list and a cut

use clap::{Args, Parser, Subcommand};
use klynge::cluster::Linkage;
use klynge::config::AnalysisConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

/// klynge - cluster municipalities by cultural participation
#[derive(Parser, Debug)]
#[command(name = "klynge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
struct Common {
    /// Participation table (CSV)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// JSON config; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Column holding municipality names
    #[arg(long)]
    id_column: Option<String>,

    /// Seed for k-means restarts
    #[arg(long)]
    seed: Option<u64>,

    /// k-means restarts per K
    #[arg(long)]
    restarts: Option<usize>,

    /// Hierarchical linkage: single, complete, average or ward
    #[arg(long)]
    linkage: Option<Linkage>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full analysis: selection, k-means, hierarchical cut, comparison
    Run {
        #[command(flatten)]
        common: Common,

        /// K values to report, comma separated
        #[arg(long, value_delimiter = ',')]
        k: Option<Vec<usize>>,

        /// Skip the multi-index vote
        #[arg(long)]
        no_vote: bool,

        /// Write the standardized table as CSV
        #[arg(long, value_name = "PATH")]
        export_standardized: Option<PathBuf>,
    },

    /// Cluster-count diagnostics only
    Select {
        #[command(flatten)]
        common: Common,

        /// Smallest K
        #[arg(long)]
        k_min: Option<usize>,

        /// Largest K
        #[arg(long)]
        k_max: Option<usize>,

        /// Skip the multi-index vote
        #[arg(long)]
        no_vote: bool,
    },

    /// Hierarchical merge list
    Dendrogram {
        #[command(flatten)]
        common: Common,

        /// Also print the assignment at this K
        #[arg(long)]
        cut: Option<usize>,
    },
}

impl Common {
    /// Config file (or defaults) with flag overrides applied.
    fn config(&self) -> error::Result<AnalysisConfig> {
        let mut config = commands::load_config(self.config.as_deref())?;
        if let Some(d) = self.delimiter {
            config.delimiter = d;
        }
        if let Some(id) = &self.id_column {
            config.id_column.clone_from(id);
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(restarts) = self.restarts {
            config.restarts = restarts;
        }
        if let Some(linkage) = self.linkage {
            config.linkage = linkage;
        }
        config.data_path = Some(self.file.clone());
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("klynge=debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: Cli) -> error::Result<()> {
    match cli.command {
        Commands::Run {
            common,
            k,
            no_vote,
            export_standardized,
        } => {
            let mut config = common.config()?;
            if let Some(k) = k {
                config.report_ks = k;
            }
            config.vote &= !no_vote;
            config.validate()?;
            commands::run::run(&common.file, config, export_standardized.as_deref(), cli.json)
        }
        Commands::Select {
            common,
            k_min,
            k_max,
            no_vote,
        } => {
            let mut config = common.config()?;
            config.k_min = k_min.unwrap_or(config.k_min);
            config.k_max = k_max.unwrap_or(config.k_max);
            config.vote &= !no_vote;
            config.validate()?;
            commands::select::run(&common.file, config, cli.json)
        }
        Commands::Dendrogram { common, cut } => {
            let config = common.config()?;
            commands::dendrogram::run(&common.file, &config, cut, cli.json)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn test_parse_run_with_ks() {
        let cli = parse(&["klynge", "run", "data.csv", "--k", "2,3,4", "--seed", "7", "--json"]);
        assert!(cli.json);
        match cli.command {
            Commands::Run {
                common,
                k,
                no_vote,
                export_standardized,
            } => {
                assert_eq!(common.file, PathBuf::from("data.csv"));
                assert_eq!(export_standardized, None);
                assert_eq!(k, Some(vec![2, 3, 4]));
                assert_eq!(common.seed, Some(7));
                assert!(!no_vote);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_select_range() {
        let cli = parse(&["klynge", "select", "data.csv", "--k-min", "3", "--k-max", "8", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Select { k_min, k_max, .. } => {
                assert_eq!((k_min, k_max), (Some(3), Some(8)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_dendrogram_linkage() {
        let cli = parse(&["klynge", "dendrogram", "data.csv", "--linkage", "ward", "--cut", "3"]);
        match cli.command {
            Commands::Dendrogram { common, cut } => {
                assert_eq!(common.linkage, Some(Linkage::Ward));
                assert_eq!(cut, Some(3));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_linkage_rejected() {
        assert!(Cli::try_parse_from(["klynge", "dendrogram", "d.csv", "--linkage", "median"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["klynge", "run", "d.csv", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("c.json");
        std::fs::write(&config_path, r#"{"seed": 1, "restarts": 4, "delimiter": ";"}"#).unwrap();
        let cli = parse(&[
            "klynge",
            "run",
            "data.csv",
            "--config",
            config_path.to_str().unwrap(),
            "--seed",
            "9",
        ]);
        let Commands::Run { common, .. } = cli.command else {
            panic!("expected run");
        };
        let config = common.config().unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.restarts, 4);
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.data_path, Some(PathBuf::from("data.csv")));
    }

    #[test]
    fn test_end_to_end_run() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data.csv");
        std::fs::write(
            &data,
            "kommune,teater,koncert\nA,10,60\nB,12,70\nC,11,61\nD,13,71\nE,10.5,59\nF,12.5,69.5\n",
        )
        .unwrap();
        let cli = parse(&["klynge", "run", data.to_str().unwrap(), "--k", "2", "--restarts", "3", "--json"]);
        assert!(execute(cli).is_ok());
    }

    #[test]
    fn test_run_exports_standardized_table() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data.csv");
        let export = dir.path().join("z.csv");
        std::fs::write(
            &data,
            "kommune,teater,koncert\nA,10,60\nB,12,70\nC,11,61\nD,13,71\nE,10.5,59\nF,12.5,69.5\n",
        )
        .unwrap();
        let cli = parse(&[
            "klynge",
            "run",
            data.to_str().unwrap(),
            "--k",
            "2",
            "--restarts",
            "3",
            "--export-standardized",
            export.to_str().unwrap(),
        ]);
        assert!(execute(cli).is_ok());

        let reloaded = klynge::data::DatasetLoader::new("kommune")
            .with_percentage_check(false)
            .load_path(&export)
            .unwrap();
        assert_eq!(reloaded.keys(), ["A", "B", "C", "D", "E", "F"]);
        assert_eq!(reloaded.features(), ["teater", "koncert"]);
        let teater = reloaded.feature("teater").unwrap();
        assert!(teater.iter().sum::<f64>().abs() < 1e-9);
        assert!(teater[0] < 0.0);
    }

    #[test]
    fn test_missing_file_exit_code() {
        let cli = parse(&["klynge", "select", "/nonexistent/klynge.csv"]);
        let err = execute(cli).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::from(3));
    }
}
