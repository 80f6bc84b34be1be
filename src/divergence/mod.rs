pub mod frechet;
pub mod mmd;
pub mod wasserstein;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::profile::ProfileSample;
use crate::stats::column_means;

pub use frechet::{frechet_distance, FrechetEstimate, FrechetStrategy};
pub use mmd::{maximum_mean_discrepancy, median_heuristic_gamma};
pub use wasserstein::{
    averaged_monotonic_wasserstein, per_dimension_wasserstein, sliced_wasserstein, wasserstein_1d,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DivergenceConfig {
    /// Random directions for the sliced Wasserstein estimate.
    pub projections: usize,
    pub frechet_ridge: f64,
    /// Fixed RBF bandwidth; the median heuristic is used when absent.
    pub mmd_gamma: Option<f64>,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            projections: 100,
            frechet_ridge: 1e-3,
            mmd_gamma: None,
        }
    }
}

/// Distributional distances between two profiles on their raw trait scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub wasserstein_per_dimension: Vec<f64>,
    pub wasserstein_mean: f64,
    pub wasserstein_std: f64,
    pub sliced_wasserstein: f64,
    pub frechet: FrechetEstimate,
    pub euclidean_mean_distance: f64,
    pub cosine_similarity: f64,
    pub mmd: f64,
    pub amw: f64,
}

pub fn divergence_report(
    a: &ProfileSample,
    b: &ProfileSample,
    config: &DivergenceConfig,
    seed: u64,
) -> Result<DivergenceReport> {
    if !(config.frechet_ridge >= 0.0) {
        return Err(AnalysisError::invalid(format!(
            "frechet ridge must be non-negative, got {}",
            config.frechet_ridge
        )));
    }
    let (left, right) = (a.matrix(), b.matrix());
    let per_dim = per_dimension_wasserstein(&left, &right)?;
    let count = per_dim.len() as f64;
    let wasserstein_mean = per_dim.iter().sum::<f64>() / count;
    let wasserstein_std = (per_dim
        .iter()
        .map(|w| (w - wasserstein_mean).powi(2))
        .sum::<f64>()
        / count)
        .sqrt();

    Ok(DivergenceReport {
        sliced_wasserstein: sliced_wasserstein(&left, &right, config.projections, seed)?,
        frechet: frechet_distance(&left, &right, config.frechet_ridge),
        euclidean_mean_distance: mean_euclidean_distance(a, b),
        cosine_similarity: mean_cosine_similarity(a, b),
        mmd: maximum_mean_discrepancy(&left, &right, config.mmd_gamma)?,
        amw: wasserstein_mean,
        wasserstein_mean,
        wasserstein_std,
        wasserstein_per_dimension: per_dim,
    })
}

pub fn mean_euclidean_distance(a: &ProfileSample, b: &ProfileSample) -> f64 {
    (column_means(&a.matrix()) - column_means(&b.matrix())).norm()
}

/// Cosine similarity of the two mean vectors; 0 when either is the zero vector.
pub fn mean_cosine_similarity(a: &ProfileSample, b: &ProfileSample) -> f64 {
    let (ma, mb) = (column_means(&a.matrix()), column_means(&b.matrix()));
    let denominator = ma.norm() * mb.norm();
    if denominator == 0.0 {
        0.0
    } else {
        ma.dot(&mb) / denominator
    }
}
