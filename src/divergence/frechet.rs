use log::debug;
use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::stats::column_means;
use crate::stats::moments::sample_covariance;

const EIGEN_EPSILON: f64 = 1e-12;
const EIGEN_MAX_ITERATIONS: usize = 10_000;

/// Which approximation produced a Fréchet estimate, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrechetStrategy {
    /// Exact Gaussian closed form through the matrix square root.
    MatrixSqrt,
    /// Elementwise `sqrt(|Σ1 Σ2|)` when the product has negative eigenvalues.
    AbsoluteSqrt,
    /// `sqrt(|Δμ|² + |Σ1 - Σ2|_F)` when the decomposition fails outright.
    MomentFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrechetEstimate {
    pub distance: f64,
    pub strategy: FrechetStrategy,
}

enum SqrtFailure {
    NotPositiveSemidefinite,
    Decomposition,
}

struct GaussianPair {
    mean_term: f64,
    sigma1: DMatrix<f64>,
    sigma2: DMatrix<f64>,
}

impl GaussianPair {
    fn fit(a: &DMatrix<f64>, b: &DMatrix<f64>, ridge: f64) -> Self {
        let fit_one = |m: &DMatrix<f64>| {
            let mean = column_means(m);
            let dims = m.ncols();
            let covariance = sample_covariance(m, &mean) + DMatrix::identity(dims, dims) * ridge;
            (mean, covariance)
        };
        let (mu1, sigma1) = fit_one(a);
        let (mu2, sigma2) = fit_one(b);
        Self {
            mean_term: (mu1 - mu2).norm_squared(),
            sigma1,
            sigma2,
        }
    }

    fn distance_with_trace(&self, trace_sqrt: f64) -> f64 {
        let squared =
            self.mean_term + self.sigma1.trace() + self.sigma2.trace() - 2.0 * trace_sqrt;
        squared.max(0.0).sqrt()
    }

    /// `tr(sqrt(Σ1 Σ2))` via the eigenvalues of `Σ1^½ Σ2 Σ1^½`.
    fn matrix_sqrt(&self) -> std::result::Result<f64, SqrtFailure> {
        let root = symmetric_sqrt(&self.sigma1).ok_or(SqrtFailure::Decomposition)?;
        let inner = &root * &self.sigma2 * &root;
        let inner = (&inner + inner.transpose()) * 0.5;
        let eigen =
            SymmetricEigen::try_new(inner, EIGEN_EPSILON, EIGEN_MAX_ITERATIONS)
                .ok_or(SqrtFailure::Decomposition)?;
        if eigen.eigenvalues.iter().any(|v| *v < 0.0) {
            return Err(SqrtFailure::NotPositiveSemidefinite);
        }
        Ok(eigen.eigenvalues.iter().map(|v| v.sqrt()).sum())
    }

    fn absolute_sqrt(&self) -> f64 {
        let product = &self.sigma1 * &self.sigma2;
        product.diagonal().iter().map(|v| v.abs().sqrt()).sum()
    }

    fn moment_fallback(&self) -> f64 {
        (self.mean_term + (&self.sigma1 - &self.sigma2).norm()).sqrt()
    }
}

fn symmetric_sqrt(matrix: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let eigen = SymmetricEigen::try_new(matrix.clone(), EIGEN_EPSILON, EIGEN_MAX_ITERATIONS)?;
    let roots = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    let vectors = &eigen.eigenvectors;
    Some(vectors * DMatrix::from_diagonal(&roots) * vectors.transpose())
}

/// Fréchet distance between Gaussian fits of two samples. Always finite.
///
/// Covariances get `ridge * I` first; a single-row sample contributes the ridge alone.
pub fn frechet_distance(a: &DMatrix<f64>, b: &DMatrix<f64>, ridge: f64) -> FrechetEstimate {
    let pair = GaussianPair::fit(a, b, ridge);
    let (distance, strategy) = match pair.matrix_sqrt() {
        Ok(trace_sqrt) => (pair.distance_with_trace(trace_sqrt), FrechetStrategy::MatrixSqrt),
        Err(SqrtFailure::NotPositiveSemidefinite) => {
            debug!("Fréchet: covariance product not PSD, using elementwise square root");
            (
                pair.distance_with_trace(pair.absolute_sqrt()),
                FrechetStrategy::AbsoluteSqrt,
            )
        }
        Err(SqrtFailure::Decomposition) => {
            debug!("Fréchet: eigendecomposition failed, using moments");
            (pair.moment_fallback(), FrechetStrategy::MomentFallback)
        }
    };
    if distance.is_finite() {
        return FrechetEstimate { distance, strategy };
    }
    debug!("Fréchet: {:?} produced a non-finite value, using moments", strategy);
    let fallback = pair.moment_fallback();
    FrechetEstimate {
        distance: if fallback.is_finite() { fallback } else { f64::MAX },
        strategy: FrechetStrategy::MomentFallback,
    }
}
