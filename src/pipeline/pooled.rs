//! Fan-out/fan-in execution over a fresh [`WorkerPool`].

use super::{mean_duration, PipelineRun};
use crate::config::PoolConfig;
use crate::error::Result;
use crate::executor::{Task, WorkerPool, Workload};
use crate::telemetry::MetricsSnapshot;
use crate::timer::{format_duration, Timer};
use std::time::Duration;

/// Pipeline that builds one pool per run and measures dispatch and wait
/// separately.
#[derive(Debug, Clone)]
pub struct PooledPipeline {
    config: PoolConfig,
}

impl PooledPipeline {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    pub fn with_workers(workers: usize) -> Result<Self> {
        Ok(Self::new(PoolConfig::builder().num_workers(workers).build()?))
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Run `batch` on a new pool. Pool start-up counts toward dispatch time.
    pub fn run<W>(&self, batch: &[W]) -> Result<PipelineRun>
    where
        W: Workload + Clone,
    {
        self.run_with_metrics(batch).map(|(run, _)| run)
    }

    /// Like [`run`](Self::run), also returning the pool's latency and
    /// queue-wait figures, read after every worker has been joined.
    pub fn run_with_metrics<W>(&self, batch: &[W]) -> Result<(PipelineRun, MetricsSnapshot)>
    where
        W: Workload + Clone,
    {
        let timer = Timer::start();
        let pool = WorkerPool::new(&self.config)?;
        drive(timer, pool, batch)
    }

    /// Run `batch` on a pool the caller already built. The pool is consumed
    /// and shut down on every path.
    pub fn run_on<W>(&self, pool: WorkerPool<W::Output>, batch: &[W]) -> Result<PipelineRun>
    where
        W: Workload + Clone,
    {
        drive(Timer::start(), pool, batch).map(|(run, _)| run)
    }
}

fn drive<W>(
    timer: Timer,
    mut pool: WorkerPool<W::Output>,
    batch: &[W],
) -> Result<(PipelineRun, MetricsSnapshot)>
where
    W: Workload + Clone,
{
    let workers = pool.num_workers();
    tracing::info!(workers, tasks = batch.len(), "pooled pipeline: starting");

    for (index, workload) in batch.iter().enumerate() {
        pool.submit(Task::new(index, workload.clone()));
    }
    let dispatch = timer.elapsed();
    tracing::info!(
        workers,
        dispatch = %format_duration(dispatch),
        "pooled pipeline: tasks submitted"
    );

    let wait_timer = Timer::start();
    // on error `pool` drops here, which shuts it down
    let results = pool.collect()?;
    let wait = wait_timer.elapsed();
    tracing::info!(
        workers,
        wait = %format_duration(wait),
        "pooled pipeline: all tasks finished"
    );

    let busy: Duration = results.iter().map(|r| r.duration).sum();
    let per_task = mean_duration(busy, results.len());

    // idle workers are joined here, so their last task is in the metrics
    pool.shutdown();
    let metrics = pool.metrics();
    tracing::debug!(
        workers,
        per_worker = ?pool.tasks_per_worker(),
        avg_queue_wait_ns = metrics.avg_queue_wait_ns,
        p95_queue_wait_ns = metrics.p95_queue_wait_ns,
        avg_latency_ns = metrics.avg_latency_ns,
        p95_latency_ns = metrics.p95_latency_ns,
        failed = metrics.tasks_failed,
        utilization = metrics.utilization(workers),
        "pooled pipeline: pool metrics"
    );
    drop(pool);

    let total = timer.elapsed();
    tracing::info!(
        workers,
        total = %format_duration(total),
        "pooled pipeline: finished"
    );

    let run = PipelineRun {
        dispatch,
        wait,
        per_task,
        total,
    };
    Ok((run, metrics))
}
