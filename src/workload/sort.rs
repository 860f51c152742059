use rand::Rng;

/// Sort `size` uniform floats in `[0, 1)`.
pub(super) fn sort_random<R: Rng>(size: usize, rng: &mut R) -> Vec<f64> {
    let mut data: Vec<f64> = (0..size).map(|_| rng.gen::<f64>()).collect();
    data.sort_unstable_by(f64::total_cmp);
    data
}
