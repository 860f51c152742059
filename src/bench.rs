//! Benchmark orchestration: iterations over every configured runner.

use crate::config::BenchConfig;
use crate::error::Result;
use crate::pipeline::{ExecutionMode, PooledPipeline, SequentialPipeline};
use crate::stats::RunnerStats;
use crate::workload::{TaskGenerator, TaskSource, TaskSpec};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// One benchmark run as described by a [`BenchConfig`].
#[derive(Debug)]
pub struct Benchmark {
    config: BenchConfig,
    generator: TaskGenerator,
    source: TaskSource,
    /// Built once for static sources.
    fixed_batch: Option<Vec<TaskSpec>>,
}

impl Benchmark {
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;

        let mut generator = match config.seed {
            Some(seed) => TaskGenerator::new(seed, config.scratch_dir.clone()),
            None => TaskGenerator::from_entropy(config.scratch_dir.clone()),
        }
        .with_images(config.images.clone());
        info!(seed = generator.seed(), "task generator seeded");

        let source = TaskSource::from_config(config.task, &config.task_args, &mut generator)?;
        let fixed_batch = if source.is_random() {
            None
        } else {
            Some(source.batch(config.task_count, &mut generator)?)
        };

        Ok(Self {
            config,
            generator,
            source,
            fixed_batch,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.generator.seed()
    }

    pub fn source(&self) -> &TaskSource {
        &self.source
    }

    /// Run every iteration and return one [`RunnerStats`] per configured
    /// worker count, in configuration order.
    pub fn run(&mut self) -> Result<Vec<RunnerStats>> {
        let description = self.source.describe();
        let mut runners: Vec<RunnerStats> = self
            .config
            .workers
            .iter()
            .map(|&w| {
                RunnerStats::for_mode(
                    ExecutionMode::from_workers(w),
                    description.clone(),
                    self.config.task_count,
                )
            })
            .collect();

        info!(
            task = %self.config.task,
            details = %description,
            task_count = self.config.task_count,
            iterations = self.config.iterations,
            runners = runners.len(),
            "starting benchmark"
        );

        for iteration in 0..self.config.iterations {
            info!(iteration = iteration + 1, of = self.config.iterations, "iteration");

            let batch = match &self.fixed_batch {
                Some(batch) => batch.clone(),
                None => {
                    let batch = self
                        .source
                        .batch(self.config.task_count, &mut self.generator)?;
                    debug!(
                        tasks = ?batch.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                        "generated random task list"
                    );
                    batch
                }
            };

            for runner in runners.iter_mut() {
                let run = match runner.mode() {
                    ExecutionMode::Sequential => SequentialPipeline::new().run(&batch)?,
                    ExecutionMode::Pooled { workers } => {
                        PooledPipeline::new(self.config.pool_config(workers)?).run(&batch)?
                    }
                };
                info!(
                    runner = runner.name(),
                    dispatch = run.dispatch.as_secs_f64(),
                    wait = run.wait.as_secs_f64(),
                    per_task = run.per_task.as_secs_f64(),
                    total = run.total.as_secs_f64(),
                    "runner finished"
                );
                runner.record(run);

                pause(self.config.wait_after_runner(), "runner");
            }

            pause(self.config.wait_after_iteration(), "iteration");
        }

        Ok(runners)
    }
}

fn pause(wait: Option<Duration>, after: &str) {
    if let Some(wait) = wait.filter(|w| !w.is_zero()) {
        debug!(after, secs = wait.as_secs_f64(), "waiting");
        thread::sleep(wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::{ImageSize, WorkloadKind};

    fn config(json: &str) -> BenchConfig {
        BenchConfig::from_json_str(json).unwrap()
    }

    #[test]
    fn test_runs_every_runner_every_iteration() {
        let mut bench = Benchmark::new(config(
            r#"{"iterations": 3, "task": "sum", "task_args": [1000],
                "task_count": 4, "workers": [0, 2], "seed": 1}"#,
        ))
        .unwrap();

        let stats = bench.run().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name(), "sequential");
        assert_eq!(stats[1].name(), "parallel_2");
        for runner in &stats {
            assert_eq!(runner.iterations(), 3);
            assert_eq!(runner.task_description(), "1000");
            assert_eq!(runner.task_count(), 4);
        }
    }

    #[test]
    fn test_random_source_uses_seed() {
        let json = r#"{"iterations": 1, "task": "random", "task_args": ["sum", "multi"],
                       "task_count": 2, "workers": [0], "seed": 42}"#;
        let bench = Benchmark::new(config(json)).unwrap();
        assert_eq!(bench.seed(), 42);
        assert!(bench.source().is_random());
        assert_eq!(bench.source().describe(), "sum;multi");
    }

    #[test]
    fn test_waits_are_applied() {
        let mut bench = Benchmark::new(config(
            r#"{"iterations": 2, "task": "sum", "task_args": [10],
                "task_count": 1, "workers": [0],
                "wait_time_after_runner": 0.02, "wait_time_after_iteration": 0.02}"#,
        ))
        .unwrap();

        let timer = crate::timer::Timer::start();
        bench.run().unwrap();
        assert!(timer.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_random_images_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        let json = format!(
            r#"{{"iterations": 1, "task": "random", "task_args": ["img"],
                 "task_count": 2, "workers": [0, 2], "seed": 5,
                 "scratch_dir": {:?}, "images": ["16x12", "9x9"]}}"#,
            dir.path()
        );
        let mut bench = Benchmark::new(config(&json)).unwrap();

        let expected = vec![ImageSize::new(16, 12), ImageSize::new(9, 9)];
        match bench.generator.random_spec(WorkloadKind::ImageTransform).unwrap() {
            TaskSpec::ImageTransform { images, .. } => assert_eq!(images, expected),
            other => panic!("unexpected task {other:?}"),
        }

        let stats = bench.run().unwrap();
        assert_eq!(stats[0].task_description(), "img");
    }
}
