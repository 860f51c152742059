pub use crate::bench::Benchmark;
pub use crate::config::{BenchConfig, PoolConfig};
pub use crate::error::{Error, Result};
pub use crate::executor::{Task, TaskResult, WorkerPool, Workload};
pub use crate::pipeline::{ExecutionMode, PipelineRun, PooledPipeline, SequentialPipeline};
pub use crate::report::{ConsoleExporter, CsvExporter, JsonExporter, StatsExporter};
pub use crate::stats::RunnerStats;
pub use crate::workload::{TaskGenerator, TaskSource, TaskSpec, WorkOutput, WorkloadKind};

pub use crate::telemetry::{Metrics, MetricsSnapshot};
