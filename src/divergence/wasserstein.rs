use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{AnalysisError, Result};

/// Earth mover's distance between two empirical 1D distributions.
pub fn wasserstein_1d(u: &[f64], v: &[f64]) -> Result<f64> {
    if u.is_empty() || v.is_empty() {
        return Err(AnalysisError::degenerate(
            "wasserstein distance needs two non-empty samples",
        ));
    }
    let u_sorted = sorted(u);
    let v_sorted = sorted(v);
    let mut all: Vec<f64> = u_sorted.iter().chain(&v_sorted).copied().collect();
    all.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let (nu, nv) = (u.len() as f64, v.len() as f64);
    let mut distance = 0.0;
    for window in all.windows(2) {
        let delta = window[1] - window[0];
        if delta == 0.0 {
            continue;
        }
        // Empirical CDFs evaluated just right of window[0].
        let u_cdf = count_at_most(&u_sorted, window[0]) as f64 / nu;
        let v_cdf = count_at_most(&v_sorted, window[0]) as f64 / nv;
        distance += (u_cdf - v_cdf).abs() * delta;
    }
    Ok(distance)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

fn count_at_most(sorted: &[f64], value: f64) -> usize {
    sorted.partition_point(|x| *x <= value)
}

fn check_columns(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<()> {
    if a.ncols() != b.ncols() {
        return Err(AnalysisError::invalid(format!(
            "samples have {} and {} dimensions",
            a.ncols(),
            b.ncols()
        )));
    }
    Ok(())
}

/// One Wasserstein-1 distance per column.
pub fn per_dimension_wasserstein(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<Vec<f64>> {
    check_columns(a, b)?;
    a.column_iter()
        .zip(b.column_iter())
        .map(|(left, right)| {
            let left: Vec<f64> = left.iter().copied().collect();
            let right: Vec<f64> = right.iter().copied().collect();
            wasserstein_1d(&left, &right)
        })
        .collect()
}

/// Averaged monotonic Wasserstein: the mean of the per-dimension distances.
pub fn averaged_monotonic_wasserstein(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<f64> {
    let per_dim = per_dimension_wasserstein(a, b)?;
    Ok(per_dim.iter().sum::<f64>() / per_dim.len().max(1) as f64)
}

/// Mean 1D distance over `projections` seeded random unit directions.
pub fn sliced_wasserstein(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    projections: usize,
    seed: u64,
) -> Result<f64> {
    check_columns(a, b)?;
    if projections == 0 {
        return Err(AnalysisError::invalid(
            "sliced wasserstein needs at least one projection",
        ));
    }
    let dims = a.ncols();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut total = 0.0;
    for _ in 0..projections {
        let direction = loop {
            let candidate: DVector<f64> =
                DVector::from_fn(dims, |_, _| StandardNormal.sample(&mut rng));
            let norm = candidate.norm();
            if norm > 0.0 {
                break candidate / norm;
            }
        };
        let left: Vec<f64> = (a * &direction).iter().copied().collect();
        let right: Vec<f64> = (b * &direction).iter().copied().collect();
        total += wasserstein_1d(&left, &right)?;
    }
    Ok(total / projections as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_masses_are_their_gap_apart() {
        assert!((wasserstein_1d(&[1.5], &[4.0]).expect("w") - 2.5).abs() < 1e-12);
    }

    #[test]
    fn matches_scipy_reference() {
        // scipy.stats.wasserstein_distance([0, 1, 3], [5, 6, 8]) == 5.0
        let w = wasserstein_1d(&[0.0, 1.0, 3.0], &[5.0, 6.0, 8.0]).expect("w");
        assert!((w - 5.0).abs() < 1e-12);
        // scipy.stats.wasserstein_distance([0, 1], [0, 0, 1, 1, 1, 1]) == 1/6
        let w = wasserstein_1d(&[0.0, 1.0], &[0.0, 0.0, 1.0, 1.0, 1.0, 1.0]).expect("w");
        assert!((w - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn identical_samples_have_zero_distance() {
        let sample = [3.2, 1.1, 4.8, 2.0, 2.0];
        assert_eq!(wasserstein_1d(&sample, &sample).expect("w"), 0.0);
    }

    #[test]
    fn amw_is_mean_of_dimensions() {
        let a = DMatrix::from_row_slice(2, 3, &[0.0, 1.0, 2.0, 1.0, 1.0, 2.0]);
        let b = DMatrix::from_row_slice(2, 3, &[1.0, 3.0, 2.0, 2.0, 3.0, 2.0]);
        let per_dim = per_dimension_wasserstein(&a, &b).expect("per dim");
        assert_eq!(per_dim, vec![1.0, 2.0, 0.0]);
        assert!((averaged_monotonic_wasserstein(&a, &b).expect("amw") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sliced_distance_is_seeded() {
        let a = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.5, 2.0, 1.0]);
        let b = DMatrix::from_row_slice(3, 2, &[3.0, 1.0, 4.0, 2.0, 5.0, 2.5]);
        let first = sliced_wasserstein(&a, &b, 50, 42).expect("sw");
        let second = sliced_wasserstein(&a, &b, 50, 42).expect("sw");
        assert_eq!(first, second);
        assert!(first > 0.0);
        assert_eq!(sliced_wasserstein(&a, &a, 20, 1).expect("self"), 0.0);
        assert!(sliced_wasserstein(&a, &b, 0, 1).is_err());
    }

    #[test]
    fn shift_along_one_axis_bounds_sliced_distance() {
        // A pure translation by t gives |<t, theta>| per slice, so the mean stays below |t|.
        let a = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let shift = DMatrix::from_row_slice(4, 2, &[2.0, 0.0, 2.0, 0.0, 2.0, 0.0, 2.0, 0.0]);
        let b = &a + shift;
        let sw = sliced_wasserstein(&a, &b, 200, 3).expect("sw");
        assert!(sw > 0.0 && sw <= 2.0 + 1e-12);
    }
}
