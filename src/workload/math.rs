//! Pure CPU loops.

use std::hint::black_box;

/// Add one `size` times.
pub(super) fn sum(size: u64) -> u64 {
    let mut out = 0u64;
    for _ in 0..size {
        out = black_box(out + 1);
    }
    out
}

/// Multiply `1.0` by `1.00001` `size` times.
pub(super) fn multiply(size: u64) -> f64 {
    let mut out = 1.0f64;
    for _ in 0..size {
        out = black_box(out * 1.00001);
    }
    out
}
