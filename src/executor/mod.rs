//! Task execution infrastructure.
//!
//! This module provides the worker pool, its worker threads, and the task
//! types both pipelines execute.

pub mod panic_handler;
pub mod pool;
pub mod task;
pub mod worker;

pub use panic_handler::{catch_panic, PanicInfo};
pub use pool::{PoolStatus, WorkerPool};
pub use task::{Task, TaskResult, Workload};
pub use worker::{WorkerId, WorkerState};

pub(crate) use task::run_task;
