//! parabench - sequential vs. worker-pool benchmarking
//!
//! Runs batches of synthetic workloads (math loops, file I/O, compression,
//! matrix and tensor products, sorting, password hashing, image transforms)
//! either one after another on the calling thread or fanned out over a
//! fixed-size pool of worker threads, and reports per-phase timings.
//!
//! # Quick Start
//!
//! ```no_run
//! use parabench::prelude::*;
//!
//! let batch = vec![TaskSpec::Sum { size: 1_000_000 }; 16];
//!
//! let seq = SequentialPipeline::new().run(&batch).unwrap();
//! let par = PooledPipeline::with_workers(4).unwrap().run(&batch).unwrap();
//!
//! println!("sequential: {:?}, pooled: {:?}", seq.total, par.total);
//! ```
//!
//! # Layout
//!
//! - [`executor`]: the worker pool and the [`Workload`] contract
//! - [`pipeline`]: sequential and pooled execution of a batch
//! - [`stats`]: per-runner accumulation across iterations
//! - [`workload`]: the built-in workloads and seeded task lists
//! - [`bench`], [`report`], [`config`], [`logging`]: driving a full run from
//!   a JSON config and exporting the results

#![warn(missing_debug_implementations)]

pub mod bench;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod stats;
pub mod telemetry;
pub mod timer;
pub mod workload;

pub use bench::Benchmark;
pub use config::{BenchConfig, PoolConfig, PoolConfigBuilder};
pub use error::{Error, Result};
pub use executor::{Task, TaskResult, WorkerPool, Workload};
pub use pipeline::{ExecutionMode, PipelineRun, PooledPipeline, SequentialPipeline};
pub use stats::{RunnerStats, StatsRecord};
