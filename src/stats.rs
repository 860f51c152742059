//! Per-runner accumulation of pipeline timings across iterations.

use crate::pipeline::{mean_duration, ExecutionMode, PipelineRun};
use serde::Serialize;

/// Every [`PipelineRun`] recorded for one (mode, worker count) runner.
///
/// Averages and throughput are derived on demand; recorded runs are never
/// modified.
#[derive(Debug, Clone)]
pub struct RunnerStats {
    name: String,
    mode: ExecutionMode,
    task_description: String,
    task_count: usize,
    runs: Vec<PipelineRun>,
}

impl RunnerStats {
    pub fn new(
        name: impl Into<String>,
        mode: ExecutionMode,
        task_description: impl Into<String>,
        task_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            task_description: task_description.into(),
            task_count,
            runs: Vec::new(),
        }
    }

    /// Runner named after its mode: `sequential` or `parallel_<n>`.
    pub fn for_mode(
        mode: ExecutionMode,
        task_description: impl Into<String>,
        task_count: usize,
    ) -> Self {
        Self::new(mode.name(), mode, task_description, task_count)
    }

    pub fn record(&mut self, run: PipelineRun) {
        self.runs.push(run);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn workers(&self) -> usize {
        self.mode.workers()
    }

    pub fn task_description(&self) -> &str {
        &self.task_description
    }

    pub fn task_count(&self) -> usize {
        self.task_count
    }

    pub fn runs(&self) -> &[PipelineRun] {
        &self.runs
    }

    pub fn iterations(&self) -> usize {
        self.runs.len()
    }

    /// Field-wise arithmetic mean of the recorded runs; all zero when
    /// nothing has been recorded.
    pub fn average(&self) -> PipelineRun {
        let n = self.runs.len();
        if n == 0 {
            return PipelineRun::default();
        }

        let mut sum = PipelineRun::default();
        for run in &self.runs {
            sum.dispatch += run.dispatch;
            sum.wait += run.wait;
            sum.per_task += run.per_task;
            sum.total += run.total;
        }

        PipelineRun {
            dispatch: mean_duration(sum.dispatch, n),
            wait: mean_duration(sum.wait, n),
            per_task: mean_duration(sum.per_task, n),
            total: mean_duration(sum.total, n),
        }
    }

    /// Tasks per second over the average total time. Zero when there is no
    /// data or the average total is zero.
    pub fn throughput(&self) -> f64 {
        let total = self.average().total.as_secs_f64();
        if self.runs.is_empty() || total == 0.0 {
            return 0.0;
        }
        self.task_count as f64 / total
    }

    /// Flat, ordered view for exporters.
    pub fn record_view(&self) -> StatsRecord {
        let avg = self.average();
        StatsRecord {
            name: self.name.clone(),
            workers: self.workers(),
            task_details: self.task_description.clone(),
            task_count: self.task_count,
            dispatch_secs: avg.dispatch.as_secs_f64(),
            wait_secs: avg.wait.as_secs_f64(),
            per_task_secs: avg.per_task.as_secs_f64(),
            total_secs: avg.total.as_secs_f64(),
            throughput: self.throughput(),
        }
    }
}

/// One exported row. Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Workers")]
    pub workers: usize,
    #[serde(rename = "Task details")]
    pub task_details: String,
    #[serde(rename = "Task count")]
    pub task_count: usize,
    #[serde(rename = "Time: dispatch")]
    pub dispatch_secs: f64,
    #[serde(rename = "Time: wait")]
    pub wait_secs: f64,
    #[serde(rename = "Time: task avg")]
    pub per_task_secs: f64,
    #[serde(rename = "Time: total")]
    pub total_secs: f64,
    #[serde(rename = "Throughput")]
    pub throughput: f64,
}

impl StatsRecord {
    pub const COLUMNS: [&'static str; 9] = [
        "Name",
        "Workers",
        "Task details",
        "Task count",
        "Time: dispatch",
        "Time: wait",
        "Time: task avg",
        "Time: total",
        "Throughput",
    ];
}
