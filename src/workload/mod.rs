//! Synthetic workloads and the task lists built from them.
//!
//! Every workload kind is listed once in a static table; configuration names are
//! resolved against that table when the configuration is parsed, and the
//! typed [`TaskSpec`] descriptor carries the concrete arguments.

mod compress;
mod generator;
mod image;
mod io;
mod math;
mod matrix;
mod password;
mod sort;

pub use generator::{TaskGenerator, TaskSource};
pub use image::{ImageSize, RgbImage};
pub use matrix::Matrix;
pub use password::PasswordParams;

use crate::error::{Error, Result};
use crate::executor::Workload;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Closed set of workload kinds selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum WorkloadKind {
    Sum,
    Multiply,
    Io,
    Compress,
    Tensor,
    Sort,
    MatrixInvert,
    PasswordCheck,
    ImageTransform,
    RandomMix,
}

struct KindEntry {
    kind: WorkloadKind,
    name: &'static str,
    arity: RangeInclusive<usize>,
}

static KINDS: [KindEntry; 10] = [
    KindEntry { kind: WorkloadKind::Sum, name: "sum", arity: 1..=1 },
    KindEntry { kind: WorkloadKind::Multiply, name: "multi", arity: 1..=1 },
    KindEntry { kind: WorkloadKind::Io, name: "io", arity: 1..=1 },
    KindEntry { kind: WorkloadKind::Compress, name: "zip", arity: 1..=1 },
    KindEntry { kind: WorkloadKind::Tensor, name: "tensor", arity: 2..=2 },
    KindEntry { kind: WorkloadKind::Sort, name: "sort", arity: 1..=1 },
    KindEntry { kind: WorkloadKind::MatrixInvert, name: "matrix", arity: 1..=1 },
    KindEntry { kind: WorkloadKind::PasswordCheck, name: "password", arity: 4..=4 },
    KindEntry { kind: WorkloadKind::ImageTransform, name: "img", arity: 1..=1 },
    KindEntry { kind: WorkloadKind::RandomMix, name: "random", arity: 0..=9 },
];

impl WorkloadKind {
    /// Every kind a random task list may draw from, in table order.
    pub const CONCRETE: [WorkloadKind; 9] = [
        WorkloadKind::Sum,
        WorkloadKind::Multiply,
        WorkloadKind::Io,
        WorkloadKind::Compress,
        WorkloadKind::Tensor,
        WorkloadKind::Sort,
        WorkloadKind::MatrixInvert,
        WorkloadKind::PasswordCheck,
        WorkloadKind::ImageTransform,
    ];

    /// Row of this kind in the table; rows follow declaration order.
    fn row(self) -> usize {
        match self {
            WorkloadKind::Sum => 0,
            WorkloadKind::Multiply => 1,
            WorkloadKind::Io => 2,
            WorkloadKind::Compress => 3,
            WorkloadKind::Tensor => 4,
            WorkloadKind::Sort => 5,
            WorkloadKind::MatrixInvert => 6,
            WorkloadKind::PasswordCheck => 7,
            WorkloadKind::ImageTransform => 8,
            WorkloadKind::RandomMix => 9,
        }
    }

    fn entry(self) -> &'static KindEntry {
        &KINDS[self.row()]
    }

    /// Configuration name.
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn arity(self) -> RangeInclusive<usize> {
        self.entry().arity.clone()
    }

    pub fn check_arity(self, given: usize) -> Result<()> {
        let arity = self.arity();
        if arity.contains(&given) {
            return Ok(());
        }
        let expected = if arity.start() == arity.end() {
            arity.start().to_string()
        } else {
            format!("{} to {}", arity.start(), arity.end())
        };
        Err(Error::config(format!(
            "task '{}' takes {} argument(s), got {}",
            self.name(),
            expected,
            given
        )))
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkloadKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        KINDS
            .iter()
            .find(|e| e.name == s)
            .map(|e| e.kind)
            .ok_or_else(|| Error::config(format!("invalid task '{s}' specified")))
    }
}

impl TryFrom<String> for WorkloadKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Typed arguments of one concrete workload.
///
/// Variants that generate random data carry a `seed`; the work index is
/// mixed into it at run time so tasks sharing a descriptor still see
/// distinct data.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskSpec {
    Sum {
        size: u64,
    },
    Multiply {
        size: u64,
    },
    Io {
        filesize_mb: u64,
        scratch_dir: Arc<Path>,
        seed: u64,
    },
    Compress {
        filesize_mb: u64,
        scratch_dir: Arc<Path>,
        seed: u64,
    },
    Tensor {
        size: usize,
        count: usize,
        seed: u64,
    },
    Sort {
        size: usize,
        seed: u64,
    },
    MatrixInvert {
        size: usize,
        seed: u64,
    },
    PasswordCheck {
        params: PasswordParams,
        seed: u64,
    },
    ImageTransform {
        images: Vec<ImageSize>,
        seed: u64,
    },
}

/// What a workload hands back. Large buffers are reduced to a summary so a
/// batch of results stays small.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkOutput {
    Count(u64),
    Value(f64),
    /// Bytes written and read back.
    Bytes(u64),
    Matrix { dim: usize, trace: f64 },
    Sorted { len: usize, min: f64, max: f64 },
    /// Output dimensions of each transformed image.
    Images(Vec<ImageSize>),
}

/// Settings a descriptor needs beyond its parsed arguments.
#[derive(Debug, Clone)]
pub struct SpecContext {
    pub scratch_dir: Arc<Path>,
    pub seed: u64,
}

impl SpecContext {
    pub fn new(scratch_dir: impl Into<PathBuf>, seed: u64) -> Self {
        Self {
            scratch_dir: Arc::from(scratch_dir.into()),
            seed,
        }
    }
}

impl TaskSpec {
    /// Build a descriptor from the JSON arguments of a configuration file.
    pub fn parse(kind: WorkloadKind, args: &[Value], ctx: &SpecContext) -> Result<Self> {
        kind.check_arity(args.len())?;
        let seed = ctx.seed;

        let spec = match kind {
            WorkloadKind::Sum => TaskSpec::Sum {
                size: arg_u64(kind, args, 0)?,
            },
            WorkloadKind::Multiply => TaskSpec::Multiply {
                size: arg_u64(kind, args, 0)?,
            },
            WorkloadKind::Io => TaskSpec::Io {
                filesize_mb: arg_u64(kind, args, 0)?,
                scratch_dir: ctx.scratch_dir.clone(),
                seed,
            },
            WorkloadKind::Compress => TaskSpec::Compress {
                filesize_mb: arg_u64(kind, args, 0)?,
                scratch_dir: ctx.scratch_dir.clone(),
                seed,
            },
            WorkloadKind::Tensor => {
                let size = arg_positive(kind, args, 0)?;
                let count = arg_positive(kind, args, 1)?;
                TaskSpec::Tensor { size, count, seed }
            }
            WorkloadKind::Sort => TaskSpec::Sort {
                size: arg_u64(kind, args, 0)? as usize,
                seed,
            },
            WorkloadKind::MatrixInvert => TaskSpec::MatrixInvert {
                size: arg_positive(kind, args, 0)?,
                seed,
            },
            WorkloadKind::PasswordCheck => TaskSpec::PasswordCheck {
                params: PasswordParams::from_args(args)?,
                seed,
            },
            WorkloadKind::ImageTransform => TaskSpec::ImageTransform {
                images: ImageSize::list_from_arg(&args[0])?,
                seed,
            },
            WorkloadKind::RandomMix => {
                return Err(Error::config(
                    "'random' is a task list, not a single workload",
                ))
            }
        };
        Ok(spec)
    }

    pub fn kind(&self) -> WorkloadKind {
        match self {
            TaskSpec::Sum { .. } => WorkloadKind::Sum,
            TaskSpec::Multiply { .. } => WorkloadKind::Multiply,
            TaskSpec::Io { .. } => WorkloadKind::Io,
            TaskSpec::Compress { .. } => WorkloadKind::Compress,
            TaskSpec::Tensor { .. } => WorkloadKind::Tensor,
            TaskSpec::Sort { .. } => WorkloadKind::Sort,
            TaskSpec::MatrixInvert { .. } => WorkloadKind::MatrixInvert,
            TaskSpec::PasswordCheck { .. } => WorkloadKind::PasswordCheck,
            TaskSpec::ImageTransform { .. } => WorkloadKind::ImageTransform,
        }
    }

    /// Argument summary used in the "Task details" column.
    pub fn describe(&self) -> String {
        match self {
            TaskSpec::Sum { size } | TaskSpec::Multiply { size } => size.to_string(),
            TaskSpec::Io { filesize_mb, .. } | TaskSpec::Compress { filesize_mb, .. } => {
                filesize_mb.to_string()
            }
            TaskSpec::Tensor { size, count, .. } => format!("{size}x{count}"),
            TaskSpec::Sort { size, .. } | TaskSpec::MatrixInvert { size, .. } => {
                size.to_string()
            }
            TaskSpec::PasswordCheck { params, .. } => params.to_string(),
            TaskSpec::ImageTransform { images, .. } => images
                .iter()
                .map(ImageSize::to_string)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.describe())
    }
}

impl Workload for TaskSpec {
    type Output = WorkOutput;

    fn run(&self, work_index: usize) -> Result<WorkOutput> {
        match self {
            TaskSpec::Sum { size } => Ok(WorkOutput::Count(math::sum(*size))),
            TaskSpec::Multiply { size } => Ok(WorkOutput::Value(math::multiply(*size))),
            TaskSpec::Io {
                filesize_mb,
                scratch_dir,
                seed,
            } => {
                let mut rng = task_rng(*seed, work_index);
                io::write_and_copy(scratch_dir, *filesize_mb, work_index, &mut rng)
                    .map(WorkOutput::Bytes)
            }
            TaskSpec::Compress {
                filesize_mb,
                scratch_dir,
                seed,
            } => {
                let mut rng = task_rng(*seed, work_index);
                compress::round_trip(scratch_dir, *filesize_mb, work_index, &mut rng)
                    .map(WorkOutput::Bytes)
            }
            TaskSpec::Tensor { size, count, seed } => {
                let mut rng = task_rng(*seed, work_index);
                let product = matrix::chain_product(*size, *count, &mut rng);
                Ok(WorkOutput::Matrix {
                    dim: product.dim(),
                    trace: product.trace(),
                })
            }
            TaskSpec::Sort { size, seed } => {
                let mut rng = task_rng(*seed, work_index);
                let sorted = sort::sort_random(*size, &mut rng);
                Ok(WorkOutput::Sorted {
                    len: sorted.len(),
                    min: sorted.first().copied().unwrap_or(0.0),
                    max: sorted.last().copied().unwrap_or(0.0),
                })
            }
            TaskSpec::MatrixInvert { size, seed } => {
                let mut rng = task_rng(*seed, work_index);
                let inverse = Matrix::random(*size, &mut rng).inverse()?;
                Ok(WorkOutput::Matrix {
                    dim: inverse.dim(),
                    trace: inverse.trace(),
                })
            }
            TaskSpec::PasswordCheck { params, seed } => {
                let mut rng = task_rng(*seed, work_index);
                Ok(WorkOutput::Count(password::hash_and_check(params, &mut rng)))
            }
            TaskSpec::ImageTransform { images, seed } => {
                let mut rng = task_rng(*seed, work_index);
                let out = images
                    .iter()
                    .map(|size| image::transform(&RgbImage::random(*size, &mut rng)).size())
                    .collect();
                Ok(WorkOutput::Images(out))
            }
        }
    }
}

/// Per-task generator: the descriptor seed mixed with the work index.
fn task_rng(seed: u64, work_index: usize) -> Pcg64 {
    Pcg64::seed_from_u64(seed ^ (work_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn arg_u64(kind: WorkloadKind, args: &[Value], i: usize) -> Result<u64> {
    args.get(i).and_then(Value::as_u64).ok_or_else(|| {
        Error::config(format!(
            "task '{}' argument {} must be a non-negative integer",
            kind, i
        ))
    })
}

fn arg_positive(kind: WorkloadKind, args: &[Value], i: usize) -> Result<usize> {
    match arg_u64(kind, args, i)? {
        0 => Err(Error::config(format!(
            "task '{}' argument {} must be > 0",
            kind, i
        ))),
        n => Ok(n as usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> SpecContext {
        SpecContext::new("tmp", 42)
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in WorkloadKind::CONCRETE {
            assert_eq!(kind.name().parse::<WorkloadKind>().unwrap(), kind);
        }
        assert_eq!("random".parse::<WorkloadKind>().unwrap(), WorkloadKind::RandomMix);
        assert!("fft".parse::<WorkloadKind>().is_err());
    }

    #[test]
    fn test_kind_table_rows() {
        for kind in WorkloadKind::CONCRETE.into_iter().chain([WorkloadKind::RandomMix]) {
            assert_eq!(KINDS[kind.row()].kind, kind);
        }
        assert_eq!(WorkloadKind::RandomMix.name(), "random");
        assert_eq!(WorkloadKind::ImageTransform.arity(), 1..=1);
    }

    #[test]
    fn test_arity() {
        assert!(WorkloadKind::Tensor.check_arity(2).is_ok());
        assert!(WorkloadKind::Tensor.check_arity(1).is_err());
        assert!(WorkloadKind::RandomMix.check_arity(0).is_ok());
        assert!(WorkloadKind::RandomMix.check_arity(9).is_ok());
        assert!(WorkloadKind::RandomMix.check_arity(10).is_err());
    }

    #[test]
    fn test_describe() {
        let sum = TaskSpec::parse(WorkloadKind::Sum, &[json!(1000000)], &ctx()).unwrap();
        assert_eq!(sum.describe(), "1000000");
        assert_eq!(sum.to_string(), "sum(1000000)");

        let tensor =
            TaskSpec::parse(WorkloadKind::Tensor, &[json!(256), json!(4)], &ctx()).unwrap();
        assert_eq!(tensor.describe(), "256x4");

        let password = TaskSpec::parse(
            WorkloadKind::PasswordCheck,
            &[json!(1000), json!(100), json!([6, 25]), json!(0.5)],
            &ctx(),
        )
        .unwrap();
        assert_eq!(password.describe(), "1000/100; (6, 25); 0.5");

        let img = TaskSpec::parse(
            WorkloadKind::ImageTransform,
            &[json!(["640x480", "300x900"])],
            &ctx(),
        )
        .unwrap();
        assert_eq!(img.describe(), "640x480;300x900");
    }

    #[test]
    fn test_parse_rejects_bad_args() {
        assert!(TaskSpec::parse(WorkloadKind::Sum, &[json!("big")], &ctx()).is_err());
        assert!(TaskSpec::parse(WorkloadKind::Sum, &[json!(-1)], &ctx()).is_err());
        assert!(TaskSpec::parse(WorkloadKind::MatrixInvert, &[json!(0)], &ctx()).is_err());
        assert!(TaskSpec::parse(WorkloadKind::RandomMix, &[], &ctx()).is_err());
    }

    #[test]
    fn test_run_math() {
        let sum = TaskSpec::Sum { size: 1234 };
        assert_eq!(sum.run(0).unwrap(), WorkOutput::Count(1234));

        match (TaskSpec::Multiply { size: 0 }).run(3).unwrap() {
            WorkOutput::Value(v) => assert_eq!(v, 1.0),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let spec = TaskSpec::Sort { size: 500, seed: 9 };
        assert_eq!(spec.run(2).unwrap(), spec.run(2).unwrap());
        assert_ne!(spec.run(2).unwrap(), spec.run(3).unwrap());
    }

    #[test]
    fn test_run_matrix_and_tensor() {
        let inv = TaskSpec::MatrixInvert { size: 8, seed: 1 }.run(0).unwrap();
        assert!(matches!(inv, WorkOutput::Matrix { dim: 8, .. }));

        let tensor = TaskSpec::Tensor { size: 6, count: 3, seed: 1 }.run(0).unwrap();
        assert!(matches!(tensor, WorkOutput::Matrix { dim: 6, .. }));
    }
}
