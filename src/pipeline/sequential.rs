//! In-order execution on the calling thread.

use super::{mean_duration, PipelineRun};
use crate::error::Result;
use crate::executor::{run_task, Workload};
use crate::timer::{format_duration, Timer};
use std::time::Duration;

/// Baseline pipeline: no threads, no queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPipeline;

impl SequentialPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Run every workload in batch order, passing its position as the work
    /// index. The first failure stops the batch; nothing after it runs.
    ///
    /// There is no separate dispatch phase, so dispatch is zero and the
    /// whole loop counts as wait time.
    pub fn run<W: Workload>(&self, batch: &[W]) -> Result<PipelineRun> {
        tracing::info!(tasks = batch.len(), "sequential pipeline: starting");
        let timer = Timer::start();

        for (index, workload) in batch.iter().enumerate() {
            run_task(index, workload)?;
        }

        let wait = timer.elapsed();
        tracing::info!(
            work = %format_duration(wait),
            "sequential pipeline: finished"
        );

        Ok(PipelineRun {
            dispatch: Duration::ZERO,
            wait,
            per_task: mean_duration(wait, batch.len()),
            total: wait,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_sequential_noop_batch() {
        let batch = vec![|_: usize| -> Result<()> { Ok(()) }; 3];
        let run = SequentialPipeline::new().run(&batch).unwrap();

        assert_eq!(run.dispatch, Duration::ZERO);
        assert_eq!(run.total, run.wait);
        assert_eq!(run.per_task, run.wait / 3);
    }

    #[test]
    fn test_sequential_empty_batch() {
        let batch: Vec<fn(usize) -> Result<()>> = Vec::new();
        let run = SequentialPipeline::new().run(&batch).unwrap();
        assert_eq!(run.per_task, Duration::ZERO);
    }

    #[test]
    fn test_sequential_passes_work_index() {
        let batch = vec![
            |i: usize| -> Result<()> {
                if i == 2 {
                    Err(Error::Other("third".into()))
                } else {
                    Ok(())
                }
            };
            4
        ];
        let err = SequentialPipeline::new().run(&batch).unwrap_err();
        assert_eq!(err.task_index(), Some(2));
    }
}
