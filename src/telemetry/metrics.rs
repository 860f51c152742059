//! Metrics collection for worker pools.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// 1 hour in nanoseconds
const MAX_TRACKED_NS: u64 = 3_600_000_000_000;

/// Pool metrics collector
#[derive(Debug)]
pub struct Metrics {
    tasks_executed: AtomicU64,
    tasks_failed: AtomicU64,
    busy_time_ns: AtomicU64,

    // Execution latency and queue wait, 3 significant figures
    latency_histogram: RwLock<Histogram<u64>>,
    queue_wait_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            latency_histogram: RwLock::new(new_histogram()),
            queue_wait_histogram: RwLock::new(new_histogram()),
            start_time: Instant::now(),
        }
    }

    /// Record a finished task with its execution time
    pub fn record_task_execution(&self, duration_ns: u64) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
        let _ = self
            .latency_histogram
            .write()
            .record(duration_ns.min(MAX_TRACKED_NS));
    }

    /// Record how long a task sat in the queue before a worker took it
    pub fn record_queue_wait(&self, wait_ns: u64) {
        let _ = self
            .queue_wait_histogram
            .write()
            .record(wait_ns.min(MAX_TRACKED_NS));
    }

    pub fn record_task_failure(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency = self.latency_histogram.read();
        let queue_wait = self.queue_wait_histogram.read();

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            avg_latency_ns: if latency.len() > 0 {
                latency.mean() as u64
            } else {
                0
            },
            p50_latency_ns: latency.value_at_quantile(0.50),
            p95_latency_ns: latency.value_at_quantile(0.95),
            p99_latency_ns: latency.value_at_quantile(0.99),
            max_latency_ns: latency.max(),
            avg_queue_wait_ns: if queue_wait.len() > 0 {
                queue_wait.mean() as u64
            } else {
                0
            },
            p95_queue_wait_ns: queue_wait.value_at_quantile(0.95),
        }
    }

    pub fn reset(&self) {
        self.tasks_executed.store(0, Ordering::Relaxed);
        self.tasks_failed.store(0, Ordering::Relaxed);
        self.busy_time_ns.store(0, Ordering::Relaxed);
        self.latency_histogram.write().reset();
        self.queue_wait_histogram.write().reset();
    }
}

fn new_histogram() -> Histogram<u64> {
    Histogram::new_with_bounds(1, MAX_TRACKED_NS, 3).expect("Failed to create histogram")
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of pool metrics at a point in time
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub tasks_executed: u64,
    pub tasks_failed: u64,
    pub busy_time_ns: u64,
    pub avg_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p95_latency_ns: u64,
    pub p99_latency_ns: u64,
    pub max_latency_ns: u64,
    pub avg_queue_wait_ns: u64,
    pub p95_queue_wait_ns: u64,
}

impl MetricsSnapshot {
    /// Fraction of `workers * uptime` spent executing tasks (0.0 to 1.0)
    pub fn utilization(&self, workers: usize) -> f64 {
        let capacity = self.uptime.as_nanos() as f64 * workers as f64;
        if capacity == 0.0 {
            return 0.0;
        }
        (self.busy_time_ns as f64 / capacity).min(1.0)
    }

    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_executed as f64 / seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = Metrics::new();

        metrics.record_task_execution(1000);
        metrics.record_task_execution(3000);
        metrics.record_queue_wait(500);
        metrics.record_task_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_executed, 2);
        assert_eq!(snapshot.tasks_failed, 1);
        assert_eq!(snapshot.busy_time_ns, 4000);
        assert!(snapshot.avg_latency_ns >= 1900 && snapshot.avg_latency_ns <= 2100);
        assert!(snapshot.avg_queue_wait_ns > 0);
        assert!(snapshot.p95_queue_wait_ns >= 500);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = Metrics::new();

        metrics.record_task_execution(1000);
        assert_eq!(metrics.snapshot().tasks_executed, 1);

        metrics.reset();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_executed, 0);
        assert_eq!(snapshot.avg_latency_ns, 0);
    }

    #[test]
    fn test_utilization() {
        let snapshot = MetricsSnapshot {
            uptime: Duration::from_secs(1),
            busy_time_ns: 1_000_000_000,
            ..Default::default()
        };

        assert_eq!(snapshot.utilization(2), 0.5);
        assert_eq!(snapshot.utilization(0), 0.0);
    }
}
