//! Seeded task-list providers.

use super::{ImageSize, PasswordParams, SpecContext, TaskSpec, WorkloadKind};
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_IMAGES: [ImageSize; 1] = [ImageSize {
    width: 1920,
    height: 1080,
}];

const TENSOR_MIN_SIZE: usize = 128;
const TENSOR_MAX_SIZE: usize = 1024;
const TENSOR_MIN_COUNT: usize = 2;
const TENSOR_MAX_COUNT: usize = 12;

/// Deterministic source of workload parameters and per-descriptor seeds.
#[derive(Debug, Clone)]
pub struct TaskGenerator {
    seed: u64,
    rng: Pcg64,
    scratch_dir: Arc<Path>,
    images: Vec<ImageSize>,
}

impl TaskGenerator {
    pub fn new(seed: u64, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            seed,
            rng: Pcg64::seed_from_u64(seed),
            scratch_dir: Arc::from(scratch_dir.into()),
            images: DEFAULT_IMAGES.to_vec(),
        }
    }

    /// Seeded from OS entropy; [`seed`](Self::seed) reports the value so a
    /// run can be repeated.
    pub fn from_entropy(scratch_dir: impl Into<PathBuf>) -> Self {
        Self::new(rand::thread_rng().next_u64(), scratch_dir)
    }

    /// Image set used for randomly generated image tasks.
    pub fn with_images(mut self, images: Vec<ImageSize>) -> Self {
        if !images.is_empty() {
            self.images = images;
        }
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Context for one descriptor, with a fresh seed.
    pub fn context(&mut self) -> SpecContext {
        SpecContext {
            scratch_dir: self.scratch_dir.clone(),
            seed: self.rng.next_u64(),
        }
    }

    /// Descriptor of `kind` with parameters drawn from its random range.
    pub fn random_spec(&mut self, kind: WorkloadKind) -> Result<TaskSpec> {
        let ctx = self.context();
        let seed = ctx.seed;
        let rng = &mut self.rng;

        let spec = match kind {
            WorkloadKind::Sum => TaskSpec::Sum {
                size: rng.gen_range(10_000..=10_000_000),
            },
            WorkloadKind::Multiply => TaskSpec::Multiply {
                size: rng.gen_range(10_000..=10_000_000),
            },
            WorkloadKind::Io => TaskSpec::Io {
                filesize_mb: rng.gen_range(1..=100),
                scratch_dir: ctx.scratch_dir,
                seed,
            },
            WorkloadKind::Compress => TaskSpec::Compress {
                filesize_mb: rng.gen_range(1..=100),
                scratch_dir: ctx.scratch_dir,
                seed,
            },
            WorkloadKind::Tensor => {
                let size = rng.gen_range(TENSOR_MIN_SIZE..=TENSOR_MAX_SIZE);
                let count = rng.gen_range(TENSOR_MIN_COUNT..=max_tensor_count(size));
                TaskSpec::Tensor { size, count, seed }
            }
            WorkloadKind::Sort => TaskSpec::Sort {
                size: rng.gen_range(200_000..=10_000_000),
                seed,
            },
            WorkloadKind::MatrixInvert => TaskSpec::MatrixInvert {
                size: rng.gen_range(100..=2000),
                seed,
            },
            WorkloadKind::PasswordCheck => {
                let stored = rng.gen_range(1000..=10_000);
                let tried = rng.gen_range(100..=1000);
                let lengths = (rng.gen_range(6..=20), rng.gen_range(21..=30));
                let ratio = rng.gen_range(0.1..0.9);
                TaskSpec::PasswordCheck {
                    params: PasswordParams::new(stored, tried, lengths, ratio)?,
                    seed,
                }
            }
            WorkloadKind::ImageTransform => TaskSpec::ImageTransform {
                images: self.images.clone(),
                seed,
            },
            WorkloadKind::RandomMix => {
                return Err(Error::config("cannot generate a nested random task list"))
            }
        };
        Ok(spec)
    }

    /// `count` descriptors, each of a kind picked uniformly from `kinds`.
    pub fn random_batch(&mut self, kinds: &[WorkloadKind], count: usize) -> Result<Vec<TaskSpec>> {
        if kinds.is_empty() {
            return Err(Error::config("random task list needs at least one task kind"));
        }
        (0..count)
            .map(|_| {
                let kind = *kinds.choose(&mut self.rng).unwrap_or(&kinds[0]);
                self.random_spec(kind)
            })
            .collect()
    }
}

/// Upper bound on the tensor chain length, interpolated on a log scale from
/// 12 for the smallest tensors down to 2 for the largest.
fn max_tensor_count(size: usize) -> usize {
    let lo = (TENSOR_MIN_SIZE as f64).ln();
    let hi = (TENSOR_MAX_SIZE as f64).ln();
    let scale = (((size as f64).ln() - lo) / (hi - lo)).clamp(0.0, 1.0);
    let span = (TENSOR_MAX_COUNT - TENSOR_MIN_COUNT) as f64;
    (TENSOR_MIN_COUNT as f64 + span * (1.0 - scale)).round() as usize
}

/// Where each iteration's batch comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskSource {
    /// The same descriptor repeated for every task, every iteration.
    Static(TaskSpec),
    /// Fresh random descriptors per iteration, drawn from these kinds.
    Random(Vec<WorkloadKind>),
}

impl TaskSource {
    /// Resolve a configured kind and its JSON arguments.
    pub fn from_config(
        kind: WorkloadKind,
        args: &[Value],
        generator: &mut TaskGenerator,
    ) -> Result<Self> {
        if kind != WorkloadKind::RandomMix {
            let ctx = generator.context();
            return TaskSpec::parse(kind, args, &ctx).map(TaskSource::Static);
        }

        kind.check_arity(args.len())?;
        if args.is_empty() {
            return Ok(TaskSource::Random(WorkloadKind::CONCRETE.to_vec()));
        }

        let mut kinds = Vec::with_capacity(args.len());
        for arg in args {
            let name = arg
                .as_str()
                .ok_or_else(|| Error::config(format!("random task kind {arg} is not a string")))?;
            let kind: WorkloadKind = name.parse()?;
            if kind == WorkloadKind::RandomMix {
                return Err(Error::config("'random' cannot be nested"));
            }
            kinds.push(kind);
        }
        Ok(TaskSource::Random(kinds))
    }

    pub fn is_random(&self) -> bool {
        matches!(self, TaskSource::Random(_))
    }

    /// "Task details" for the whole source.
    pub fn describe(&self) -> String {
        match self {
            TaskSource::Static(spec) => spec.describe(),
            TaskSource::Random(kinds) if kinds.as_slice() == WorkloadKind::CONCRETE => {
                "any".to_string()
            }
            TaskSource::Random(kinds) => kinds
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }

    /// Batch of `count` descriptors. Random sources draw a fresh batch on
    /// every call.
    pub fn batch(&self, count: usize, generator: &mut TaskGenerator) -> Result<Vec<TaskSpec>> {
        match self {
            TaskSource::Static(spec) => Ok(vec![spec.clone(); count]),
            TaskSource::Random(kinds) => generator.random_batch(kinds, count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_seed_same_batch() {
        let source = TaskSource::Random(WorkloadKind::CONCRETE.to_vec());
        let mut a = TaskGenerator::new(99, "tmp");
        let mut b = TaskGenerator::new(99, "tmp");

        assert_eq!(source.batch(20, &mut a).unwrap(), source.batch(20, &mut b).unwrap());
    }

    #[test]
    fn test_random_batch_regenerates() {
        let source = TaskSource::Random(vec![WorkloadKind::Sum]);
        let mut gen = TaskGenerator::new(1, "tmp");
        let first = source.batch(8, &mut gen).unwrap();
        let second = source.batch(8, &mut gen).unwrap();
        assert_ne!(first, second);
        assert!(first.iter().all(|s| s.kind() == WorkloadKind::Sum));
    }

    #[test]
    fn test_random_ranges() {
        let mut gen = TaskGenerator::new(5, "tmp");
        for _ in 0..200 {
            match gen.random_spec(WorkloadKind::Tensor).unwrap() {
                TaskSpec::Tensor { size, count, .. } => {
                    assert!((128..=1024).contains(&size));
                    assert!(count >= 2 && count <= max_tensor_count(size));
                }
                other => panic!("unexpected spec {other:?}"),
            }
            match gen.random_spec(WorkloadKind::PasswordCheck).unwrap() {
                TaskSpec::PasswordCheck { params, .. } => {
                    assert!((1000..=10_000).contains(&params.stored));
                    assert!((6..=20).contains(&params.min_len));
                    assert!((21..=30).contains(&params.max_len));
                }
                other => panic!("unexpected spec {other:?}"),
            }
        }
    }

    #[test]
    fn test_max_tensor_count() {
        assert_eq!(max_tensor_count(128), 12);
        assert_eq!(max_tensor_count(1024), 2);
        let mid = max_tensor_count(362);
        assert!(mid > 2 && mid < 12);
    }

    #[test]
    fn test_static_source() {
        let mut gen = TaskGenerator::new(0, "tmp");
        let source = TaskSource::from_config(WorkloadKind::Sum, &[json!(100)], &mut gen).unwrap();
        assert!(!source.is_random());
        assert_eq!(source.describe(), "100");
        let batch = source.batch(3, &mut gen).unwrap();
        assert_eq!(batch, vec![TaskSpec::Sum { size: 100 }; 3]);
    }

    #[test]
    fn test_random_source_from_config() {
        let mut gen = TaskGenerator::new(0, "tmp");
        let any = TaskSource::from_config(WorkloadKind::RandomMix, &[], &mut gen).unwrap();
        assert_eq!(any.describe(), "any");

        let some = TaskSource::from_config(
            WorkloadKind::RandomMix,
            &[json!("sum"), json!("sort")],
            &mut gen,
        )
        .unwrap();
        assert_eq!(some.describe(), "sum;sort");

        assert!(TaskSource::from_config(WorkloadKind::RandomMix, &[json!("random")], &mut gen)
            .is_err());
        assert!(TaskSource::from_config(WorkloadKind::RandomMix, &[json!(3)], &mut gen).is_err());
    }
}
