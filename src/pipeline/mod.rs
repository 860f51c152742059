//! The two execution strategies being compared.
//!
//! Both pipelines take the same batch of workloads and report a
//! [`PipelineRun`] with identical field meanings, so their numbers can be
//! put side by side.

pub mod pooled;
pub mod sequential;

pub use pooled::PooledPipeline;
pub use sequential::SequentialPipeline;

use crate::config::PoolConfig;
use crate::error::Result;
use crate::executor::Workload;
use std::fmt;
use std::time::Duration;

/// How a batch gets executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    Sequential,
    Pooled { workers: usize },
}

impl ExecutionMode {
    /// `0` workers means sequential, as in the benchmark config.
    pub fn from_workers(workers: usize) -> Self {
        if workers == 0 {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Pooled { workers }
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            ExecutionMode::Sequential => 0,
            ExecutionMode::Pooled { workers } => *workers,
        }
    }

    pub fn name(&self) -> String {
        match self {
            ExecutionMode::Sequential => "sequential".to_string(),
            ExecutionMode::Pooled { workers } => format!("parallel_{workers}"),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Timings of one measured batch execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineRun {
    /// Time to hand every task over, before waiting on any of them.
    pub dispatch: Duration,
    /// Time spent blocked until every task finished.
    pub wait: Duration,
    /// Mean execution time of a single task.
    pub per_task: Duration,
    /// Wall time of the whole batch, measured independently.
    pub total: Duration,
}

impl PipelineRun {
    pub fn as_secs(&self) -> [f64; 4] {
        [
            self.dispatch.as_secs_f64(),
            self.wait.as_secs_f64(),
            self.per_task.as_secs_f64(),
            self.total.as_secs_f64(),
        ]
    }
}

/// Run `batch` with the pipeline matching `mode`.
///
/// `pool` supplies everything but the worker count for pooled runs.
pub fn run_batch<W>(mode: ExecutionMode, batch: &[W], pool: &PoolConfig) -> Result<PipelineRun>
where
    W: Workload + Clone,
{
    match mode {
        ExecutionMode::Sequential => SequentialPipeline::new().run(batch),
        ExecutionMode::Pooled { workers } => {
            let mut config = pool.clone();
            config.num_workers = Some(workers);
            PooledPipeline::new(config).run(batch)
        }
    }
}

pub(crate) fn mean_duration(total: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => total.div_f64(count as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_workers() {
        assert_eq!(ExecutionMode::from_workers(0), ExecutionMode::Sequential);
        assert_eq!(
            ExecutionMode::from_workers(4),
            ExecutionMode::Pooled { workers: 4 }
        );
        assert_eq!(ExecutionMode::Sequential.name(), "sequential");
        assert_eq!(ExecutionMode::Pooled { workers: 8 }.to_string(), "parallel_8");
        assert_eq!(ExecutionMode::Pooled { workers: 8 }.workers(), 8);
    }

    #[test]
    fn test_mean_duration() {
        assert_eq!(mean_duration(Duration::from_secs(3), 0), Duration::ZERO);
        assert_eq!(
            mean_duration(Duration::from_secs(3), 3),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_run_batch_dispatches_on_mode() {
        let batch = vec![|i: usize| -> Result<usize> { Ok(i) }; 4];
        let pool = PoolConfig::default();

        let seq = run_batch(ExecutionMode::Sequential, &batch, &pool).unwrap();
        assert_eq!(seq.dispatch, Duration::ZERO);

        let pooled = run_batch(ExecutionMode::Pooled { workers: 2 }, &batch, &pool).unwrap();
        assert!(pooled.total >= pooled.wait);
    }
}
