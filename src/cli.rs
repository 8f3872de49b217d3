//! CLI argument parsing for asbb-analyze

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the generic speedup report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width text tables (default)
    Text,
    /// Markdown tables
    Markdown,
    /// CSV for spreadsheet analysis
    Csv,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "asbb-analyze")]
#[command(version)]
#[command(
    about = "Analyze SIMD/parallel bioinformatics benchmark results",
    long_about = None
)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Load thresholds, predictor settings and chart style from a TOML file
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Arguments of the generic speedup pipeline
#[derive(Args, Debug, Clone)]
pub struct SpeedupArgs {
    /// Benchmark results CSV
    pub input: PathBuf,

    /// Dimensions that form a comparison group
    #[arg(
        long = "group-by",
        value_delimiter = ',',
        default_value = "operation,scale"
    )]
    pub group_by: Vec<String>,

    /// Baseline predicate as FIELD=VALUE
    #[arg(long, value_name = "FIELD=VALUE", default_value = "config=naive")]
    pub baseline: String,

    /// Numeric column the ratios are computed from
    #[arg(long, default_value = "throughput_seqs_per_sec")]
    pub metric: String,

    /// Dimension the ratio summaries are grouped by
    #[arg(long = "summarize-by", default_value = "config")]
    pub summarize_by: String,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also write per-group ratio summaries as CSV
    #[arg(long = "summary-output", value_name = "PATH")]
    pub summary_output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ratios of every row against its group's baseline, summarized by a dimension
    Speedup(SpeedupArgs),

    /// Test whether NEON and parallel speedups compose multiplicatively
    Composition {
        /// Composition validation CSV
        input: PathBuf,
    },

    /// Thread scaling matrices, summary statistics and decision rules
    Parallel {
        /// Parallel dimension CSV
        input: PathBuf,

        /// Directory for reports and charts
        #[arg(short, long, default_value = "results/parallel_analysis")]
        output_dir: PathBuf,
    },

    /// AMX matrix coprocessor comparison against NEON
    Amx {
        /// AMX dimension CSV
        input: PathBuf,

        /// Directory for reports and charts
        #[arg(short, long, default_value = "results/amx_analysis")]
        output_dir: PathBuf,
    },

    /// Correlate a power-monitor log with pilot experiments
    PowerParse {
        /// Power monitor text log
        log: PathBuf,

        /// Pilot experiment CSV
        pilot: PathBuf,
    },

    /// Write the power pilot findings document
    PowerFindings {
        /// Power-enriched CSV
        input: PathBuf,
    },

    /// Extract the reference-platform subset used for cross-platform runs
    ExtractBaseline {
        /// Power-enriched CSV from the reference platform
        input: PathBuf,

        #[arg(
            short,
            long,
            default_value = "results/cross_platform_graviton/mac_baseline.csv"
        )]
        output: PathBuf,
    },

    /// Compare speedups between a reference and a target platform
    ComparePlatforms {
        /// Reference platform CSV
        reference: PathBuf,

        /// Target platform CSV
        target: PathBuf,

        #[arg(
            short,
            long,
            default_value = "results/cross_platform_graviton/mac_vs_graviton_comparison.csv"
        )]
        output: PathBuf,
    },

    /// Write the cross-platform findings document
    PlatformFindings {
        /// Platform comparison CSV
        input: PathBuf,
    },

    /// Fit regression models of NEON speedup on complexity and scale
    Regression {
        /// Complexity dataset CSV
        input: PathBuf,

        /// Directory for the prediction chart (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Quantify how I/O overhead limits end-to-end speedup
    IoOverhead {
        /// I/O overhead CSV
        input: PathBuf,

        /// Directory for the chart (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Statistical summary of batch experiment results
    DagStats {
        /// One or more batch CSVs
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the chart (defaults to the first input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Render the five publication figures
    PublicationPlots {
        /// Batch CSV with throughput_mean per config_name
        #[arg(long)]
        batch: Option<PathBuf>,

        /// Streaming memory CSV (scale, pattern, peak_mb)
        #[arg(long)]
        memory: Option<PathBuf>,

        /// Streaming overhead CSV (operation, scale, config, pattern, throughput_mean)
        #[arg(long)]
        overhead: Option<PathBuf>,

        /// Directory for the figures
        #[arg(short, long, default_value = "results/publication_plots")]
        output_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_speedup_defaults() {
        let cli = Cli::parse_from(["asbb-analyze", "speedup", "results.csv"]);
        let Command::Speedup(args) = cli.command else {
            panic!("expected speedup");
        };
        assert_eq!(args.input, PathBuf::from("results.csv"));
        assert_eq!(args.group_by, vec!["operation", "scale"]);
        assert_eq!(args.baseline, "config=naive");
        assert_eq!(args.metric, "throughput_seqs_per_sec");
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_speedup_options() {
        let cli = Cli::parse_from([
            "asbb-analyze",
            "speedup",
            "r.csv",
            "--group-by",
            "operation,scale,threads",
            "--baseline",
            "backend=scalar",
            "--format",
            "json",
        ]);
        let Command::Speedup(args) = cli.command else {
            panic!("expected speedup");
        };
        assert_eq!(args.group_by.len(), 3);
        assert_eq!(args.baseline, "backend=scalar");
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "asbb-analyze",
            "composition",
            "c.csv",
            "--debug",
            "--config",
            "a.toml",
        ]);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
    }

    #[test]
    fn test_cli_parallel_default_output_dir() {
        let cli = Cli::parse_from(["asbb-analyze", "parallel", "p.csv"]);
        match cli.command {
            Command::Parallel { output_dir, .. } => {
                assert_eq!(output_dir, PathBuf::from("results/parallel_analysis"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cli_compare_platforms_needs_two_inputs() {
        assert!(Cli::try_parse_from(["asbb-analyze", "compare-platforms", "mac.csv"]).is_err());
        let cli = Cli::try_parse_from(["asbb-analyze", "compare-platforms", "a.csv", "b.csv"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_dag_stats_multiple_inputs() {
        let cli = Cli::parse_from(["asbb-analyze", "dag-stats", "a.csv", "b.csv"]);
        match cli.command {
            Command::DagStats { inputs, output_dir } => {
                assert_eq!(inputs.len(), 2);
                assert!(output_dir.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["asbb-analyze", "dag-stats"]).is_err());
    }

    #[test]
    fn test_cli_publication_plots_inputs_optional() {
        let cli = Cli::parse_from(["asbb-analyze", "publication-plots", "--memory", "m.csv"]);
        match cli.command {
            Command::PublicationPlots {
                batch,
                memory,
                overhead,
                output_dir,
            } => {
                assert!(batch.is_none());
                assert_eq!(memory, Some(PathBuf::from("m.csv")));
                assert!(overhead.is_none());
                assert_eq!(output_dir, PathBuf::from("results/publication_plots"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
