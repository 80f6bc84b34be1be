use std::cmp::Ordering;

use log::debug;
use nalgebra::DMatrix;

use crate::error::{AnalysisError, Result};
use crate::stats::percentile;

/// RBF bandwidth from the median pairwise distance over both samples.
///
/// The median runs over the full distance matrix, diagonal included. When it
/// is zero the bandwidth falls back to `1 / dimensions`.
pub fn median_heuristic_gamma(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    let rows: Vec<_> = a.row_iter().chain(b.row_iter()).collect();
    let n = rows.len();
    let mut distances = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            distances.push((&rows[i] - &rows[j]).norm());
        }
    }
    distances.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));
    let median = percentile(&distances, 50.0);
    if median > 0.0 && median.is_finite() {
        1.0 / (2.0 * median * median)
    } else {
        debug!("MMD: zero median distance, falling back to 1/dimensions bandwidth");
        1.0 / a.ncols().max(1) as f64
    }
}

fn mean_kernel(x: &DMatrix<f64>, y: &DMatrix<f64>, gamma: f64) -> f64 {
    let mut total = 0.0;
    for xi in x.row_iter() {
        for yj in y.row_iter() {
            total += (-gamma * (xi - yj).norm_squared()).exp();
        }
    }
    total / (x.nrows() * y.nrows()) as f64
}

/// Maximum mean discrepancy under an RBF kernel, `sqrt(max(0, MMD²))`.
pub fn maximum_mean_discrepancy(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    gamma: Option<f64>,
) -> Result<f64> {
    if a.nrows() == 0 || b.nrows() == 0 {
        return Err(AnalysisError::degenerate("MMD needs two non-empty samples"));
    }
    if a.ncols() != b.ncols() {
        return Err(AnalysisError::invalid(format!(
            "samples have {} and {} dimensions",
            a.ncols(),
            b.ncols()
        )));
    }
    let gamma = match gamma {
        Some(g) if g > 0.0 && g.is_finite() => g,
        Some(g) => {
            return Err(AnalysisError::invalid(format!(
                "RBF gamma must be positive, got {g}"
            )))
        }
        None => median_heuristic_gamma(a, b),
    };
    let squared =
        mean_kernel(a, a, gamma) + mean_kernel(b, b, gamma) - 2.0 * mean_kernel(a, b, gamma);
    Ok(squared.max(0.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(offset: f64) -> DMatrix<f64> {
        DMatrix::from_fn(12, 5, |r, c| offset + ((r * 5 + c) as f64 * 0.43).cos())
    }

    #[test]
    fn identical_samples_have_zero_mmd() {
        let data = grid(0.0);
        let mmd = maximum_mean_discrepancy(&data, &data.clone(), None).expect("mmd");
        assert!(mmd.abs() < 1e-7);
    }

    #[test]
    fn mmd_grows_with_shift() {
        let base = grid(0.0);
        let near = maximum_mean_discrepancy(&base, &grid(0.2), Some(0.5)).expect("near");
        let far = maximum_mean_discrepancy(&base, &grid(3.0), Some(0.5)).expect("far");
        assert!(near >= 0.0);
        assert!(far > near);
    }

    #[test]
    fn zero_median_falls_back_to_dimensions() {
        let a = DMatrix::from_element(3, 4, 1.0);
        let gamma = median_heuristic_gamma(&a, &a);
        assert!((gamma - 0.25).abs() < 1e-12);
    }

    #[test]
    fn median_includes_diagonal() {
        // Points 0 and 2 in 1D: distances [0, 2, 2, 0], median 1.
        let a = DMatrix::from_row_slice(1, 1, &[0.0]);
        let b = DMatrix::from_row_slice(1, 1, &[2.0]);
        assert!((median_heuristic_gamma(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn bad_gamma_is_rejected() {
        let data = grid(0.0);
        assert!(maximum_mean_discrepancy(&data, &data, Some(0.0)).is_err());
    }
}
