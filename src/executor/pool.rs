use super::task::{Job, Task, TaskResult, Workload};
use super::worker::{Worker, WorkerId, WorkerState};
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::telemetry::{Metrics, MetricsSnapshot};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id, &mut cpuset);
        let result = libc::sched_setaffinity(
            0, // current thread
            std::mem::size_of::<libc::cpu_set_t>(),
            &cpuset,
        );
        if result != 0 {
            tracing::warn!(
                thread = std::thread::current().name().unwrap_or("unknown"),
                core_id,
                "failed to pin worker thread"
            );
        }
    }
}

/// Fixed-size pool of worker threads that executes indexed tasks and hands
/// their results back in submission-index order.
///
/// Workers are spawned by [`WorkerPool::new`] and torn down by
/// [`WorkerPool::shutdown`], which also runs on drop.
pub struct WorkerPool<T> {
    workers: Vec<WorkerHandle>,
    sender: Option<Sender<Job>>,
    // kept so queued jobs can be discarded on shutdown
    queue: Receiver<Job>,
    pending: Vec<PendingTask<T>>,
    shutdown: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
    num_workers: usize,
    timeout: Option<Duration>,
    metrics: Arc<Metrics>,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
    state: Arc<WorkerState>,
}

// body of a worker thread, handed to the spawner
type WorkerMain = Box<dyn FnOnce() + Send + 'static>;

struct PendingTask<T> {
    index: usize,
    receiver: Receiver<Result<TaskResult<T>>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(config: &PoolConfig) -> Result<Self> {
        Self::with_spawner(config, |builder, main| builder.spawn(main))
    }

    fn with_spawner<S>(config: &PoolConfig, mut spawn: S) -> Result<Self>
    where
        S: FnMut(thread::Builder, WorkerMain) -> std::io::Result<JoinHandle<()>>,
    {
        config.validate()?;
        let num_workers = config.worker_count();
        if num_workers == 0 {
            return Err(Error::config("need at least 1 worker"));
        }

        let (sender, queue) = crossbeam_channel::unbounded::<Job>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let live = Arc::new(AtomicUsize::new(0));
        let metrics = Arc::new(Metrics::new());

        let mut pool = Self {
            workers: Vec::with_capacity(num_workers),
            sender: Some(sender),
            queue,
            pending: Vec::new(),
            shutdown,
            live,
            num_workers,
            timeout: config.timeout,
            metrics,
        };

        for id in 0..num_workers {
            if let Err(e) = pool.spawn_worker(id, config, &mut spawn) {
                // tear down whatever already started before reporting
                pool.shutdown();
                return Err(Error::initialization(format!(
                    "spawning worker {id} failed: {e}"
                )));
            }
        }

        tracing::debug!(
            workers = num_workers,
            timeout = ?config.timeout,
            "worker pool started"
        );

        Ok(pool)
    }

    /// Pool with `num_workers` threads and otherwise default settings.
    pub fn with_workers(num_workers: usize) -> Result<Self> {
        let config = PoolConfig::builder().num_workers(num_workers).build()?;
        Self::new(&config)
    }

    fn spawn_worker<S>(
        &mut self,
        id: WorkerId,
        config: &PoolConfig,
        spawn: &mut S,
    ) -> std::io::Result<()>
    where
        S: FnMut(thread::Builder, WorkerMain) -> std::io::Result<JoinHandle<()>>,
    {
        let worker = Worker::new(id, self.metrics.clone());
        let state = worker.state.clone();
        let jobs = self.queue.clone();
        let shutdown = self.shutdown.clone();
        let live = self.live.clone();
        let pin_workers = config.pin_workers;
        let cores = num_cpus::get().max(1);

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, id));
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        // counted before spawning so a fast-exiting worker never underflows
        self.live.fetch_add(1, Ordering::SeqCst);
        let spawned = spawn(
            builder,
            Box::new(move || {
                #[cfg(target_os = "linux")]
                if pin_workers {
                    pin_thread_to_core(id % cores);
                }
                #[cfg(not(target_os = "linux"))]
                let _ = (pin_workers, cores);

                worker.run(jobs, shutdown, live);
            }),
        );

        match spawned {
            Ok(thread) => {
                self.workers.push(WorkerHandle {
                    id,
                    thread: Some(thread),
                    state,
                });
                Ok(())
            }
            Err(e) => {
                self.live.fetch_sub(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Queue a task without blocking. The pending handle is appended in call
    /// order; results are reordered by index in [`collect`](Self::collect).
    pub fn submit<W>(&mut self, task: Task<W>)
    where
        W: Workload<Output = T>,
    {
        let index = task.index();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let job = Job::new(index, move || {
            let result = task.execute();
            let ok = result.is_ok();
            // receiver is gone if the pool was shut down meanwhile
            let _ = tx.send(result);
            ok
        });

        match &self.sender {
            Some(sender) => {
                // the pool holds a receiver, so the queue can't be disconnected
                let _ = sender.send(job);
            }
            None => {
                tracing::warn!(task = index, "submit after shutdown; task dropped");
            }
        }

        self.pending.push(PendingTask {
            index,
            receiver: rx,
        });
    }

    /// Block until every submitted task has reported, then return the results
    /// sorted by index.
    ///
    /// The configured timeout is one deadline for the whole call. The first
    /// failure in submission order is returned and the rest are discarded.
    /// The pending list is empty afterwards in either case. Workers still
    /// running when this fails keep running until [`shutdown`](Self::shutdown).
    pub fn collect(&mut self) -> Result<Vec<TaskResult<T>>> {
        let pending = std::mem::take(&mut self.pending);
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut results = Vec::with_capacity(pending.len());

        for task in pending {
            let received = match deadline {
                Some(deadline) => task.receiver.recv_deadline(deadline).map_err(|e| match e {
                    RecvTimeoutError::Timeout => Error::Timeout {
                        index: task.index,
                        timeout: self.timeout.unwrap_or_default(),
                    },
                    RecvTimeoutError::Disconnected => dropped(task.index),
                }),
                None => task.receiver.recv().map_err(|_| dropped(task.index)),
            };

            match received.and_then(|r| r) {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(task = task.index, error = %e, "collect aborted");
                    return Err(e);
                }
            }
        }

        results.sort_by_key(|r| r.index);
        Ok(results)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

fn dropped(index: usize) -> Error {
    Error::executor(format!("task {index} was dropped before it reported"))
}

impl<T> WorkerPool<T> {
    /// Stop the pool without waiting for in-flight work.
    ///
    /// Queued jobs are discarded and idle workers are joined. A worker still
    /// inside a workload is detached: it exits when that workload returns and
    /// its result goes nowhere. Calling this again is a no-op.
    pub fn shutdown(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        // closing the queue wakes every idle worker
        self.sender = None;
        let discarded = self.queue.try_iter().count();

        let mut detached = 0;
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if worker.state.is_busy() && !thread.is_finished() {
                    detached += 1;
                    drop(thread);
                } else {
                    let _ = thread.join();
                }
            }
        }

        tracing::debug!(
            workers = self.workers.len(),
            discarded,
            detached,
            "worker pool shut down"
        );
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Observer that outlives the pool, for checking teardown from outside.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            shutdown: self.shutdown.clone(),
            live: self.live.clone(),
            num_workers: self.num_workers,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Tasks executed so far, per worker id.
    pub fn tasks_per_worker(&self) -> Vec<(WorkerId, u64)> {
        self.workers
            .iter()
            .map(|w| (w.id, w.state.tasks_executed.load(Ordering::Relaxed)))
            .collect()
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T> std::fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_workers", &self.num_workers)
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Shared view of a pool's lifecycle.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    shutdown: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
    num_workers: usize,
}

impl PoolStatus {
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Worker threads that have not exited yet.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Poll until every worker thread has exited or `timeout` passes.
    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.live_workers() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(index: usize) -> Result<usize> {
        Ok(index)
    }

    #[test]
    fn test_pool_spawns_workers() {
        let pool: WorkerPool<usize> = WorkerPool::with_workers(3).unwrap();
        assert_eq!(pool.num_workers(), 3);
        assert_eq!(pool.status().live_workers(), 3);
        assert!(!pool.is_shutdown());
    }

    #[test]
    fn test_pool_rejects_zero_workers() {
        let err = WorkerPool::<usize>::with_workers(0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_failed_spawn_tears_down_started_workers() {
        let config = PoolConfig::builder().num_workers(4).build().unwrap();
        let exited = Arc::new(AtomicUsize::new(0));
        let mut spawned = 0;

        let result = WorkerPool::<usize>::with_spawner(&config, |builder, main| {
            if spawned == 2 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "out of threads"));
            }
            spawned += 1;
            let exited = exited.clone();
            builder.spawn(move || {
                main();
                exited.fetch_add(1, Ordering::SeqCst);
            })
        });

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Initialization(_)));
        assert!(err.to_string().contains("spawning worker 2 failed"));
        // both started workers were joined before the error came back
        assert_eq!(spawned, 2);
        assert_eq!(exited.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_stack_fails_initialization() {
        let config = PoolConfig::builder()
            .num_workers(4)
            .stack_size(1usize << 60)
            .build()
            .unwrap();
        let err = WorkerPool::<usize>::new(&config).unwrap_err();
        assert!(matches!(err, Error::Initialization(_)));
    }

    #[test]
    fn test_collect_orders_by_index() {
        let mut pool = WorkerPool::with_workers(4).unwrap();
        // submit in reverse so call order differs from index order
        for index in (0..20).rev() {
            pool.submit(Task::new(index, move |i: usize| {
                std::thread::sleep(Duration::from_millis((i % 3) as u64));
                echo(i)
            }));
        }
        assert_eq!(pool.pending(), 20);

        let results = pool.collect().unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
        assert!(results.iter().all(|r| r.value == r.index));
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_collect_empty() {
        let mut pool: WorkerPool<usize> = WorkerPool::with_workers(2).unwrap();
        assert!(pool.collect().unwrap().is_empty());
    }

    #[test]
    fn test_pool_reusable_across_batches() {
        let mut pool = WorkerPool::with_workers(2).unwrap();
        for round in 0..3 {
            for index in 0..5 {
                pool.submit(Task::new(index, echo));
            }
            let results = pool.collect().unwrap();
            assert_eq!(results.len(), 5, "round {round}");
        }
    }

    #[test]
    fn test_shutdown_idempotent() {
        let mut pool: WorkerPool<usize> = WorkerPool::with_workers(2).unwrap();
        let status = pool.status();
        pool.shutdown();
        pool.shutdown();
        assert!(status.is_shutdown());
        assert!(status.wait_for_exit(Duration::from_secs(1)));
        drop(pool);
        assert_eq!(status.live_workers(), 0);
    }

    #[test]
    fn test_submit_after_shutdown_reports_dropped() {
        let mut pool = WorkerPool::with_workers(1).unwrap();
        pool.shutdown();
        pool.submit(Task::new(0, echo));
        let err = pool.collect().unwrap_err();
        assert!(matches!(err, Error::Executor(_)));
    }

    #[test]
    fn test_timeout() {
        let config = PoolConfig::builder()
            .num_workers(1)
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let mut pool = WorkerPool::new(&config).unwrap();
        pool.submit(Task::new(0, |_: usize| -> Result<()> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        }));

        let started = Instant::now();
        let err = pool.collect().unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_millis(400));

        // busy worker is detached rather than waited for
        let started = Instant::now();
        pool.shutdown();
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_worker_survives_panic() {
        let mut pool = WorkerPool::with_workers(1).unwrap();
        pool.submit(Task::new(0, |_: usize| -> Result<usize> { panic!("first") }));
        assert!(pool.collect().is_err());

        pool.submit(Task::new(0, echo));
        assert_eq!(pool.collect().unwrap()[0].value, 0);
    }

    #[test]
    fn test_pool_metrics() {
        let mut pool = WorkerPool::with_workers(2).unwrap();
        for index in 0..6 {
            pool.submit(Task::new(index, echo));
        }
        pool.collect().unwrap();

        // workers update their counters just after handing back the result
        let deadline = Instant::now() + Duration::from_secs(2);
        let executed = |pool: &WorkerPool<usize>| -> u64 {
            pool.tasks_per_worker().iter().map(|(_, n)| n).sum()
        };
        while executed(&pool) < 6 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(executed(&pool), 6);

        #[cfg(feature = "telemetry")]
        assert_eq!(pool.metrics().tasks_executed, 6);
    }
}
