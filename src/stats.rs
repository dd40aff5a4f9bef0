//! Shared vector statistics
//!
//! Thin wrappers over Trueno's SIMD-accelerated vector operations, with
//! empty-slice guards so callers never divide by zero.

use trueno::Vector;

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    Vector::from_slice(values).mean().unwrap_or(0.0)
}

pub fn stddev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    Vector::from_slice(values).stddev().unwrap_or(0.0)
}

/// Z-score of every value against the slice's own mean and stddev.
/// All zeros when the spread is zero.
pub fn z_scores(values: &[f32]) -> Vec<f32> {
    let m = mean(values);
    let s = stddev(values);
    if s == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|&v| (v - m) / s).collect()
}
