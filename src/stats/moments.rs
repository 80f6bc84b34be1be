use nalgebra::{DMatrix, DVector};

use crate::error::{AnalysisError, Result};

/// Column means and sample covariance (`n - 1` denominator, columns as variables).
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    pub count: usize,
    pub mean: DVector<f64>,
    pub covariance: DMatrix<f64>,
}

impl Moments {
    pub fn from_matrix(matrix: &DMatrix<f64>) -> Result<Self> {
        let count = matrix.nrows();
        if count < 2 {
            return Err(AnalysisError::degenerate(format!(
                "covariance needs at least 2 rows, got {count}"
            )));
        }
        let mean = column_means(matrix);
        let covariance = sample_covariance(matrix, &mean);
        Ok(Self {
            count,
            mean,
            covariance,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.mean.len()
    }

    /// Sum of per-dimension variances.
    pub fn total_variance(&self) -> f64 {
        self.covariance.trace()
    }
}

pub fn column_means(matrix: &DMatrix<f64>) -> DVector<f64> {
    let rows = matrix.nrows().max(1) as f64;
    DVector::from_iterator(
        matrix.ncols(),
        matrix.column_iter().map(|col| col.sum() / rows),
    )
}

pub(crate) fn sample_covariance(matrix: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    let n = matrix.nrows();
    let dims = matrix.ncols();
    let mut centered = matrix.clone();
    for (mut col, mu) in centered.column_iter_mut().zip(mean.iter()) {
        col.add_scalar_mut(-mu);
    }
    if n < 2 {
        return DMatrix::zeros(dims, dims);
    }
    (centered.transpose() * centered) / (n as f64 - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covariance_matches_hand_computation() {
        let data = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let moments = Moments::from_matrix(&data).expect("moments");
        assert!((moments.mean[0] - 2.0).abs() < 1e-12);
        assert!((moments.mean[1] - 4.0).abs() < 1e-12);
        assert!((moments.covariance[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((moments.covariance[(0, 1)] - 2.0).abs() < 1e-12);
        assert!((moments.covariance[(1, 1)] - 4.0).abs() < 1e-12);
        assert!((moments.total_variance() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn single_row_is_degenerate() {
        let data = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(matches!(
            Moments::from_matrix(&data),
            Err(AnalysisError::DegenerateInput(_))
        ));
    }
}
