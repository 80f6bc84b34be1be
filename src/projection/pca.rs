use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{AnalysisError, Result};
use crate::projection::{Projection1D, Projection2D};
use crate::stats::Moments;

/// Principal axes of a data matrix, strongest first.
#[derive(Debug, Clone)]
pub struct Pca {
    mean: DVector<f64>,
    /// One component per column.
    components: DMatrix<f64>,
    explained_variance: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl Pca {
    pub fn fit(matrix: &DMatrix<f64>) -> Result<Self> {
        let moments = Moments::from_matrix(matrix)?;
        let dims = moments.dimensions();
        let eigen = SymmetricEigen::new(moments.covariance.clone());

        let mut order: Vec<usize> = (0..dims).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut components = DMatrix::zeros(dims, dims);
        let mut explained_variance = Vec::with_capacity(dims);
        for (target, &source) in order.iter().enumerate() {
            let mut axis = eigen.eigenvectors.column(source).clone_owned();
            // Deterministic sign: the largest loading is positive.
            let pivot = axis
                .iter()
                .copied()
                .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            if pivot < 0.0 {
                axis.neg_mut();
            }
            components.set_column(target, &axis);
            explained_variance.push(eigen.eigenvalues[source].max(0.0));
        }

        let total: f64 = explained_variance.iter().sum();
        let explained_variance_ratio = explained_variance
            .iter()
            .map(|v| if total > 0.0 { v / total } else { 0.0 })
            .collect();
        Ok(Self {
            mean: moments.mean.clone(),
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    /// Coordinates of every row on the first `n_components` axes.
    pub fn transform(&self, matrix: &DMatrix<f64>, n_components: usize) -> Result<DMatrix<f64>> {
        let dims = self.mean.len();
        if n_components == 0 || n_components > dims {
            return Err(AnalysisError::invalid(format!(
                "cannot keep {n_components} components of {dims}"
            )));
        }
        if matrix.ncols() != dims {
            return Err(AnalysisError::invalid(format!(
                "PCA fitted on {dims} columns, got {}",
                matrix.ncols()
            )));
        }
        let mut centered = matrix.clone();
        for (mut col, mu) in centered.column_iter_mut().zip(self.mean.iter()) {
            col.add_scalar_mut(-mu);
        }
        Ok(centered * self.components.columns(0, n_components))
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }
}

pub fn pca_2d(matrix: &DMatrix<f64>) -> Result<Projection2D> {
    let pca = Pca::fit(matrix)?;
    let coords = pca.transform(matrix, 2)?;
    let ratio = pca.explained_variance_ratio();
    Ok(Projection2D {
        points: coords.row_iter().map(|row| [row[0], row[1]]).collect(),
        explained_variance: Some([ratio[0], ratio[1]]),
    })
}

pub fn pca_1d(matrix: &DMatrix<f64>) -> Result<Projection1D> {
    let pca = Pca::fit(matrix)?;
    let coords = pca.transform(matrix, 1)?;
    Ok(Projection1D {
        points: coords.column(0).iter().copied().collect(),
        explained_variance: pca.explained_variance_ratio()[0],
    })
}

pub(crate) fn column_std(column: &[f64]) -> f64 {
    let n = column.len().max(1) as f64;
    let mean = column.iter().sum::<f64>() / n;
    (column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt()
}
