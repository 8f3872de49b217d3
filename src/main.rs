use anyhow::{Context, Result};
use asbb_analysis::analyses::speedup::{self, SpeedupRequest};
use asbb_analysis::analyses::{
    amx, complexity, composition, dag_stats, io_overhead, parallel, platform, platform_findings,
    power, power_findings, publication,
};
use asbb_analysis::cli::{Cli, Command, SpeedupArgs};
use asbb_analysis::config::AnalysisConfig;
use asbb_analysis::report::{csv_output, write_output};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber; warnings always reach stderr
fn init_tracing(debug: bool) {
    let level = if debug { Level::TRACE } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Cli) -> Result<AnalysisConfig> {
    match &args.config {
        Some(path) => AnalysisConfig::from_toml(path),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Run the generic speedup pipeline; returns text for stdout
fn run_speedup(args: &SpeedupArgs) -> Result<String> {
    let request = SpeedupRequest::new(&args.group_by, &args.baseline, &args.metric, &args.summarize_by)
        .with_context(|| format!("Invalid --baseline '{}': expected FIELD=VALUE", args.baseline))?;

    let report = speedup::analyze(&args.input, &request)?;
    let rendered = speedup::render(&report, args.format)?;

    if let Some(path) = &args.summary_output {
        csv_output::write_csv(path, &speedup::summary_rows(&report))?;
    }

    match &args.output {
        Some(path) => {
            write_output(path, &rendered)?;
            Ok(format!("Report written to {}\n", path.display()))
        }
        None => Ok(rendered),
    }
}

fn dispatch(command: &Command, config: &AnalysisConfig) -> Result<String> {
    match command {
        Command::Speedup(args) => run_speedup(args),
        Command::Composition { input } => composition::run(input, config),
        Command::Parallel { input, output_dir } => parallel::run(input, output_dir, config),
        Command::Amx { input, output_dir } => amx::run(input, output_dir, config),
        Command::PowerParse { log, pilot } => power::run(log, pilot, config),
        Command::PowerFindings { input } => power_findings::run(input, config),
        Command::ExtractBaseline { input, output } => platform::run_extract(input, output),
        Command::ComparePlatforms {
            reference,
            target,
            output,
        } => platform::run_compare(reference, target, output, config),
        Command::PlatformFindings { input } => platform_findings::run(input, config),
        Command::Regression { input, output_dir } => {
            complexity::run(input, output_dir.as_deref(), config)
        }
        Command::IoOverhead { input, output_dir } => {
            io_overhead::run(input, output_dir.as_deref(), config)
        }
        Command::DagStats { inputs, output_dir } => {
            dag_stats::run(inputs, output_dir.as_deref(), config)
        }
        Command::PublicationPlots {
            batch,
            memory,
            overhead,
            output_dir,
        } => {
            let sources = publication::Sources {
                batch: batch.as_deref(),
                memory: memory.as_deref(),
                overhead: overhead.as_deref(),
            };
            publication::run(sources, output_dir, config)
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    let output = dispatch(&args.command, &config)?;
    print!("{output}");

    Ok(())
}
