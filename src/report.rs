//! Exporting runner statistics.

use crate::error::Result;
use crate::stats::{RunnerStats, StatsRecord};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Receives the finished runner list.
pub trait StatsExporter {
    fn export(&self, stats: &[RunnerStats]) -> Result<()>;
}

/// `<dir>/<task>__<YYYY_MM_DD__HH_MM>.csv` for the current local time.
pub fn default_csv_path(dir: &Path, task: &str) -> PathBuf {
    csv_path_at(dir, task, Local::now())
}

fn csv_path_at(dir: &Path, task: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}__{}.csv", task, at.format("%Y_%m_%d__%H_%M")))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Header row plus one row per runner, in the fixed column order.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_path: PathBuf,
}

impl CsvExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write the CSV to any sink.
    pub fn write_to<W: Write>(sink: W, stats: &[RunnerStats]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(sink);
        if stats.is_empty() {
            writer.write_record(StatsRecord::COLUMNS)?;
        }
        for runner in stats {
            writer.serialize(runner.record_view())?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl StatsExporter for CsvExporter {
    fn export(&self, stats: &[RunnerStats]) -> Result<()> {
        create_parent(&self.output_path)?;
        let file = BufWriter::new(File::create(&self.output_path)?);
        Self::write_to(file, stats)?;
        tracing::info!(path = %self.output_path.display(), rows = stats.len(), "wrote CSV");
        Ok(())
    }
}

/// Pretty-printed JSON array of records.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_path: PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl StatsExporter for JsonExporter {
    fn export(&self, stats: &[RunnerStats]) -> Result<()> {
        let records: Vec<StatsRecord> = stats.iter().map(RunnerStats::record_view).collect();
        let json = serde_json::to_string_pretty(&records)?;

        create_parent(&self.output_path)?;
        fs::write(&self.output_path, json)?;
        tracing::info!(path = %self.output_path.display(), "wrote JSON");
        Ok(())
    }
}

/// Human-readable summary on stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleExporter {
    verbose: bool,
}

impl ConsoleExporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn render(&self, stats: &[RunnerStats]) -> String {
        let mut out = String::new();
        let baseline = stats
            .iter()
            .find(|r| r.workers() == 0)
            .map(|r| r.average().total.as_secs_f64())
            .filter(|t| *t > 0.0);

        for runner in stats {
            let avg = runner.average();
            let _ = writeln!(out, "Runtime results for {}:", runner.name());
            let _ = writeln!(out, "  AVG dispatch: {:.3}", avg.dispatch.as_secs_f64());
            let _ = writeln!(out, "  AVG wait: {:.3}", avg.wait.as_secs_f64());
            let _ = writeln!(out, "  AVG per task: {:.3}", avg.per_task.as_secs_f64());
            let _ = writeln!(out, "  AVG total: {:.3}", avg.total.as_secs_f64());
            let _ = writeln!(out, "  Throughput: {:.2} tasks/s", runner.throughput());

            if self.verbose {
                let total = avg.total.as_secs_f64();
                if let Some(base) = baseline.filter(|_| runner.workers() > 0 && total > 0.0) {
                    let _ = writeln!(out, "  Speedup vs sequential: {:.2}x", base / total);
                }
                let _ = writeln!(out, "  Iterations: {}", runner.iterations());
            }
            out.push('\n');
        }
        out
    }
}

impl StatsExporter for ConsoleExporter {
    fn export(&self, stats: &[RunnerStats]) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(self.render(stats).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}
