use nalgebra::{DMatrix, DVector};

use crate::error::{AnalysisError, Result};
use crate::stats::moments::column_means;

/// Per-column z-scoring with the population standard deviation.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: DVector<f64>,
    scale: DVector<f64>,
}

impl StandardScaler {
    /// Zero-variance columns are rejected here instead of producing NaN downstream.
    pub fn fit(matrix: &DMatrix<f64>) -> Result<Self> {
        let rows = matrix.nrows();
        if rows < 2 {
            return Err(AnalysisError::degenerate(format!(
                "standardization needs at least 2 rows, got {rows}"
            )));
        }
        let mean = column_means(matrix);
        let mut scale = DVector::zeros(matrix.ncols());
        for (idx, col) in matrix.column_iter().enumerate() {
            let mu = mean[idx];
            let variance = col.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / rows as f64;
            let std = variance.sqrt();
            if std <= zero_variance_threshold(mu) {
                return Err(AnalysisError::degenerate(format!(
                    "column {idx} has zero variance and cannot be standardized"
                )));
            }
            scale[idx] = std;
        }
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if matrix.ncols() != self.mean.len() {
            return Err(AnalysisError::invalid(format!(
                "scaler fitted on {} columns, got {}",
                self.mean.len(),
                matrix.ncols()
            )));
        }
        let mut scaled = matrix.clone();
        for (idx, mut col) in scaled.column_iter_mut().enumerate() {
            let (mu, sigma) = (self.mean[idx], self.scale[idx]);
            col.apply(|v| *v = (*v - mu) / sigma);
        }
        Ok(scaled)
    }
}

pub fn standardize(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    StandardScaler::fit(matrix)?.transform(matrix)
}

fn zero_variance_threshold(mean: f64) -> f64 {
    10.0 * f64::EPSILON * mean.abs().max(1.0)
}
