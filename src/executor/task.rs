//! Task representation and execution.

use super::panic_handler::catch_panic;
use crate::error::{Error, Result};
use crate::timer::Timer;
use std::time::{Duration, Instant};

/// A unit of work with its arguments already bound.
///
/// `run` receives the task's work index: its position in the batch, unique
/// within that batch. Workloads that need per-task external resources (temp
/// files, for instance) derive them from it.
pub trait Workload: Send + 'static {
    type Output: Send + 'static;

    fn run(&self, work_index: usize) -> Result<Self::Output>;
}

impl<F, T> Workload for F
where
    F: Fn(usize) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn run(&self, work_index: usize) -> Result<T> {
        self(work_index)
    }
}

/// A workload tagged with its submission index.
#[derive(Debug, Clone)]
pub struct Task<W> {
    index: usize,
    workload: W,
}

impl<W: Workload> Task<W> {
    pub fn new(index: usize, workload: W) -> Self {
        Self { index, workload }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Execute the task on the current thread
    pub fn execute(self) -> Result<TaskResult<W::Output>> {
        run_task(self.index, &self.workload)
    }
}

/// Outcome of one successful task execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult<T> {
    pub index: usize,
    pub value: T,
    /// Time spent inside the workload itself, excluding any queueing.
    pub duration: Duration,
}

/// Run a workload with `index` as its work index, timing only the call
/// itself. Errors and panics come back as `Error::Workload` for that index.
pub(crate) fn run_task<W: Workload>(index: usize, workload: &W) -> Result<TaskResult<W::Output>> {
    let timer = Timer::start();
    let outcome = catch_panic(|| workload.run(index));
    let duration = timer.elapsed();

    match outcome {
        Ok(Ok(value)) => Ok(TaskResult {
            index,
            value,
            duration,
        }),
        Ok(Err(e)) => Err(e.at_task(index)),
        Err(panic) => Err(Error::workload(
            index,
            format!("panicked: {}", panic.message),
        )),
    }
}

/// Type-erased job handed to pool workers.
pub(crate) struct Job {
    pub(crate) index: usize,
    pub(crate) queued_at: Instant,
    func: Box<dyn FnOnce() -> bool + Send + 'static>,
}

impl Job {
    pub fn new<F>(index: usize, f: F) -> Self
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        Job {
            index,
            queued_at: Instant::now(),
            func: Box::new(f),
        }
    }

    /// Execute the job, returning whether the task succeeded
    pub fn execute(self) -> bool {
        (self.func)()
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("index", &self.index)
            .field("queued_at", &self.queued_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_passes_index_as_work_index() {
        let task = Task::new(5, |work_index: usize| -> Result<usize> { Ok(work_index * 2) });
        let result = task.execute().unwrap();
        assert_eq!(result.index, 5);
        assert_eq!(result.value, 10);
    }

    #[test]
    fn test_task_error_carries_index() {
        let task = Task::new(2, |_: usize| -> Result<()> { Err(Error::Other("nope".into())) });
        let err = task.execute().unwrap_err();
        assert_eq!(err.task_index(), Some(2));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_task_panic_becomes_workload_error() {
        let task = Task::new(4, |_: usize| -> Result<()> { panic!("kaboom") });
        match task.execute().unwrap_err() {
            Error::Workload { index, message } => {
                assert_eq!(index, 4);
                assert!(message.contains("kaboom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_task_duration_measures_run() {
        let task = Task::new(0, |_: usize| -> Result<()> {
            std::thread::sleep(Duration::from_millis(15));
            Ok(())
        });
        let result = task.execute().unwrap();
        assert!(result.duration >= Duration::from_millis(15));
    }
}
