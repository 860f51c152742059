// worker thread stuff
use super::task::Job;
use crate::telemetry::Metrics;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug)]
pub struct WorkerState {
    pub tasks_executed: AtomicU64,
    // set while a job is being executed; read by shutdown
    pub(crate) busy: AtomicBool,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Decrements the pool's live-worker count when the thread exits, panics
/// included.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
    metrics: Arc<Metrics>,
}

impl Worker {
    pub fn new(id: WorkerId, metrics: Arc<Metrics>) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::new()),
            metrics,
        }
    }

    // main loop
    pub fn run(&self, jobs: Receiver<Job>, shutdown: Arc<AtomicBool>, live: Arc<AtomicUsize>) {
        let _live = LiveGuard(live);
        tracing::trace!(worker = self.id, "worker started");

        // recv() fails once the pool drops its sender
        while let Ok(job) = jobs.recv() {
            // Mark busy before looking at the flag: shutdown stores the flag
            // before reading `busy`, so one of the two always sees the other.
            self.state.busy.store(true, Ordering::SeqCst);
            if shutdown.load(Ordering::SeqCst) {
                self.state.busy.store(false, Ordering::SeqCst);
                break;
            }

            self.execute_job(job);
            self.state.busy.store(false, Ordering::SeqCst);

            if shutdown.load(Ordering::SeqCst) {
                break;
            }
        }

        tracing::trace!(worker = self.id, "worker exiting");
    }

    fn execute_job(&self, job: Job) {
        let index = job.index;
        let queue_wait_ns = job.queued_at.elapsed().as_nanos() as u64;
        let start = Instant::now();

        let ok = job.execute();

        let duration_ns = start.elapsed().as_nanos() as u64;

        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_queue_wait(queue_wait_ns);
        self.metrics.record_task_execution(duration_ns);
        if !ok {
            self.metrics.record_task_failure();
        }

        tracing::trace!(
            worker = self.id,
            task = index,
            ok,
            duration_ns,
            queue_wait_ns,
            "task finished"
        );
    }
}
