//! Worker pool telemetry.
//!
//! Records per-task execution latency and queue wait for each pool. Without
//! the `telemetry` feature the collector compiles down to no-ops.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::Duration;

    #[derive(Debug, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self {
            Self
        }
        pub fn record_task_execution(&self, _: u64) {}
        pub fn record_queue_wait(&self, _: u64) {}
        pub fn record_task_failure(&self) {}
        pub fn snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
        pub fn reset(&self) {}
    }

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
        pub fn utilization(&self, _: usize) -> f64 {
            0.0
        }
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{Metrics, MetricsSnapshot};
