//! `parabench` command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use parabench::report::{self, ConsoleExporter, CsvExporter, JsonExporter, StatsExporter};
use parabench::{BenchConfig, Benchmark};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "parabench")]
#[command(about = "Compare sequential and worker-pool execution of synthetic workloads")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the JSON benchmark configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Directory for the CSV report (overrides the config file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Seed for task generation (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the results as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log filter, e.g. `info` or `parabench=debug`; RUST_LOG wins if set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Skip the console summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    parabench::logging::init(&cli.log_level);

    info!(config = %cli.config.display(), "using configuration file");
    let mut config = BenchConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let task_name = config.task.name();
    let output_dir = config.output_dir.clone();

    let mut bench = Benchmark::new(config).context("invalid benchmark configuration")?;
    let stats = bench.run().context("benchmark run failed")?;

    if !cli.quiet {
        ConsoleExporter::new(true).export(&stats)?;
    }

    let csv_path = report::default_csv_path(&output_dir, task_name);
    CsvExporter::new(&csv_path)
        .export(&stats)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    if let Some(json_path) = cli.json {
        JsonExporter::new(&json_path)
            .export(&stats)
            .with_context(|| format!("failed to write {}", json_path.display()))?;
    }

    info!(path = %csv_path.display(), seed = bench.seed(), "results saved");
    Ok(())
}
