//! Extremum helpers over vote-frequency vectors.
//!
//! Ties always resolve to the lowest index; the double selector's
//! determinism depends on it.

use crate::types::{QuinielaError, Result};

/// Maximum value and the index of its first occurrence.
pub fn arg_max<T: PartialOrd + Copy>(values: &[T]) -> Result<(T, usize)> {
    extremum(values, |candidate, best| candidate > best)
}

/// Minimum value and the index of its first occurrence.
pub fn arg_min<T: PartialOrd + Copy>(values: &[T]) -> Result<(T, usize)> {
    extremum(values, |candidate, best| candidate < best)
}

fn extremum<T: PartialOrd + Copy>(
    values: &[T],
    better: impl Fn(&T, &T) -> bool,
) -> Result<(T, usize)> {
    let (first, rest) = values.split_first().ok_or(QuinielaError::EmptyInput)?;
    let mut best = (*first, 0);
    for (i, v) in rest.iter().enumerate() {
        if better(v, &best.0) {
            best = (*v, i + 1);
        }
    }
    Ok(best)
}
