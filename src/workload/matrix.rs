//! Dense square matrices for the tensor and inversion workloads.

use crate::error::{Error, Result};
use rand::Rng;

const PIVOT_EPSILON: f64 = 1e-12;

/// Row-major square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    dim: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![0.0; dim * dim],
        }
    }

    pub fn identity(dim: usize) -> Self {
        let mut m = Self::zeros(dim);
        for i in 0..dim {
            m.data[i * dim + i] = 1.0;
        }
        m
    }

    /// Entries uniform in `[0, 1)`.
    pub fn random<R: Rng>(dim: usize, rng: &mut R) -> Self {
        Self {
            dim,
            data: (0..dim * dim).map(|_| rng.gen::<f64>()).collect(),
        }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let dim = rows.len();
        if rows.iter().any(|r| r.len() != dim) {
            return Err(Error::Other("matrix rows must form a square".into()));
        }
        Ok(Self {
            dim,
            data: rows.concat(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.dim + col]
    }

    pub fn trace(&self) -> f64 {
        (0..self.dim).map(|i| self.get(i, i)).sum()
    }

    pub fn multiply(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.dim, other.dim, "dimension mismatch");
        let n = self.dim;
        let mut out = Matrix::zeros(n);

        // i-k-j order keeps the inner loop on contiguous rows
        for i in 0..n {
            let out_row = &mut out.data[i * n..(i + 1) * n];
            for k in 0..n {
                let a = self.data[i * n + k];
                let b_row = &other.data[k * n..(k + 1) * n];
                for (o, b) in out_row.iter_mut().zip(b_row) {
                    *o += a * b;
                }
            }
        }
        out
    }

    /// Gauss-Jordan elimination with partial pivoting.
    pub fn inverse(&self) -> Result<Matrix> {
        let n = self.dim;
        let mut a = self.data.clone();
        let mut inv = Matrix::identity(n).data;

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&x, &y| a[x * n + col].abs().total_cmp(&a[y * n + col].abs()))
                .unwrap_or(col);
            if a[pivot * n + col].abs() < PIVOT_EPSILON {
                return Err(Error::Other(format!("singular {n}x{n} matrix")));
            }
            if pivot != col {
                swap_rows(&mut a, n, pivot, col);
                swap_rows(&mut inv, n, pivot, col);
            }

            let p = a[col * n + col];
            for j in 0..n {
                a[col * n + j] /= p;
                inv[col * n + j] /= p;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row * n + col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[row * n + j] -= factor * a[col * n + j];
                    inv[row * n + j] -= factor * inv[col * n + j];
                }
            }
        }

        Ok(Matrix { dim: n, data: inv })
    }
}

fn swap_rows(data: &mut [f64], n: usize, r1: usize, r2: usize) {
    for j in 0..n {
        data.swap(r1 * n + j, r2 * n + j);
    }
}

/// Multiply `count` random `size x size` matrices left to right.
pub(super) fn chain_product<R: Rng>(size: usize, count: usize, rng: &mut R) -> Matrix {
    let mut acc = Matrix::random(size, rng);
    for _ in 1..count {
        let next = Matrix::random(size, rng);
        acc = acc.multiply(&next);
    }
    acc
}
