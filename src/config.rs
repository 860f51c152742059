use crate::error::{Error, Result};
use crate::workload::{ImageSize, WorkloadKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_WORKERS: usize = 1024;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub num_workers: Option<usize>,
    pub timeout: Option<Duration>,
    pub pin_workers: bool,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: None,
            timeout: None,
            pin_workers: false,
            stack_size: Some(8 * 1024 * 1024),
            thread_name_prefix: "parabench-worker".to_string(),
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_workers {
            if n == 0 {
                return Err(Error::config("num_workers must be > 0"));
            }
            if n > MAX_WORKERS {
                return Err(Error::config(format!(
                    "num_workers too large (max {MAX_WORKERS})"
                )));
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(Error::config("timeout must be > 0"));
            }
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.num_workers.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PoolConfig::default(),
        }
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.config.num_workers = Some(n);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.config.pin_workers = pin;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<PoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Benchmark run description, loaded from a JSON file.
///
/// ```json
/// {
///   "iterations": 5,
///   "task": "sum",
///   "task_args": [1000000],
///   "task_count": 32,
///   "workers": [0, 2, 4, 8],
///   "wait_time_after_runner": 0.5
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    pub iterations: usize,
    pub task: WorkloadKind,
    #[serde(default)]
    pub task_args: Vec<serde_json::Value>,
    pub task_count: usize,
    /// Worker counts to compare; `0` selects the sequential pipeline.
    pub workers: Vec<usize>,
    #[serde(default)]
    pub wait_time_after_runner: Option<f64>,
    #[serde(default)]
    pub wait_time_after_iteration: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Seconds a pooled batch may spend in `collect()`.
    #[serde(default)]
    pub timeout: Option<f64>,
    #[serde(default)]
    pub pin_workers: bool,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Sizes drawn by randomly generated `img` tasks, as `"WxH"` strings.
    #[serde(default)]
    pub images: Vec<ImageSize>,
}

impl BenchConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: BenchConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::config("iterations must be > 0"));
        }
        if self.task_count == 0 {
            return Err(Error::config("task_count must be > 0"));
        }
        if self.workers.is_empty() {
            return Err(Error::config("workers must list at least one entry"));
        }
        for (i, w) in self.workers.iter().enumerate() {
            if *w > MAX_WORKERS {
                return Err(Error::config(format!(
                    "workers[{i}] too large (max {MAX_WORKERS})"
                )));
            }
            if self.workers[..i].contains(w) {
                return Err(Error::config(format!("worker count {w} listed twice")));
            }
        }

        check_wait("wait_time_after_runner", self.wait_time_after_runner)?;
        check_wait("wait_time_after_iteration", self.wait_time_after_iteration)?;

        if let Some(timeout) = self.timeout {
            if !(timeout.is_finite() && timeout > 0.0) {
                return Err(Error::config("timeout must be a positive number of seconds"));
            }
        }

        self.task.check_arity(self.task_args.len())
    }

    pub fn wait_after_runner(&self) -> Option<Duration> {
        self.wait_time_after_runner.map(Duration::from_secs_f64)
    }

    pub fn wait_after_iteration(&self) -> Option<Duration> {
        self.wait_time_after_iteration.map(Duration::from_secs_f64)
    }

    /// Pool configuration for a pooled runner with `workers` threads.
    pub fn pool_config(&self, workers: usize) -> Result<PoolConfig> {
        let mut builder = PoolConfig::builder()
            .num_workers(workers)
            .pin_workers(self.pin_workers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(Duration::from_secs_f64(timeout));
        }
        builder.build()
    }
}

fn check_wait(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(Error::config(format!(
            "invalid {name}: cannot be negative"
        ))),
        _ => Ok(()),
    }
}
