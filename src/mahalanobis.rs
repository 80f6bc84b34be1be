use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::profile::{CombinedDataset, ProfileSample, TRAIT_COUNT};
use crate::stats::{DistanceSample, Moments};

pub const DEFAULT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegularizationPolicy {
    /// Invert as-is, add `epsilon * I` and retry once if that fails.
    #[default]
    OnFailure,
    /// Always add `epsilon * I` before inverting.
    Always,
}

/// How a covariance matrix is made invertible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regularization {
    pub policy: RegularizationPolicy,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

impl Default for Regularization {
    fn default() -> Self {
        Self::on_failure(DEFAULT_EPSILON)
    }
}

impl Regularization {
    pub fn on_failure(epsilon: f64) -> Self {
        Self {
            policy: RegularizationPolicy::OnFailure,
            epsilon,
        }
    }

    pub fn always(epsilon: f64) -> Self {
        Self {
            policy: RegularizationPolicy::Always,
            epsilon,
        }
    }

    pub fn invert(&self, covariance: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if !(self.epsilon >= 0.0 && self.epsilon.is_finite()) {
            return Err(AnalysisError::invalid(format!(
                "regularization epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }
        match self.policy {
            RegularizationPolicy::Always => {
                checked_inverse(ridge(covariance, self.epsilon))
                    .ok_or(AnalysisError::SingularCovariance("regularized covariance"))
            }
            RegularizationPolicy::OnFailure => {
                if let Some(inverse) = checked_inverse(covariance.clone()) {
                    return Ok(inverse);
                }
                warn!(
                    "Covariance is singular; retrying with {:e} ridge",
                    self.epsilon
                );
                checked_inverse(ridge(covariance, self.epsilon)).ok_or(
                    AnalysisError::SingularCovariance("covariance after ridge retry"),
                )
            }
        }
    }
}

fn ridge(covariance: &DMatrix<f64>, epsilon: f64) -> DMatrix<f64> {
    covariance + DMatrix::identity(covariance.nrows(), covariance.ncols()) * epsilon
}

fn checked_inverse(matrix: DMatrix<f64>) -> Option<DMatrix<f64>> {
    matrix
        .try_inverse()
        .filter(|inverse| inverse.iter().all(|v| v.is_finite()))
}

fn require_samples(samples: usize) -> Result<()> {
    if samples <= TRAIT_COUNT {
        return Err(AnalysisError::InsufficientData {
            samples,
            dimensions: TRAIT_COUNT,
        });
    }
    Ok(())
}

fn quadratic_form(delta: &DVector<f64>, inverse: &DMatrix<f64>) -> f64 {
    delta.dot(&(inverse * delta)).max(0.0)
}

fn row_distances(
    matrix: &DMatrix<f64>,
    mean: &DVector<f64>,
    inverse: &DMatrix<f64>,
) -> DistanceSample {
    let distances = matrix
        .row_iter()
        .map(|row| {
            let delta = row.transpose() - mean;
            quadratic_form(&delta, inverse).sqrt()
        })
        .collect();
    DistanceSample::new(distances)
}

/// Distance of every vector to its own profile's centroid.
pub fn internal_distances(
    profile: &ProfileSample,
    regularization: &Regularization,
) -> Result<DistanceSample> {
    require_samples(profile.len())?;
    let moments = profile.moments()?;
    let inverse = regularization.invert(&moments.covariance)?;
    debug!(
        "Profile {}: internal distances over {} vectors",
        profile.name(),
        profile.len()
    );
    Ok(row_distances(&profile.matrix(), &moments.mean, &inverse))
}

/// Centroid separation under the pooled covariance. Never regularized.
pub fn pairwise_distance(a: &ProfileSample, b: &ProfileSample) -> Result<f64> {
    require_samples(a.len().min(b.len()))?;
    let (ma, mb) = (a.moments()?, b.moments()?);
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let pooled = (&ma.covariance * (n1 - 1.0) + &mb.covariance * (n2 - 1.0)) / (n1 + n2 - 2.0);
    let inverse =
        checked_inverse(pooled).ok_or(AnalysisError::SingularCovariance("pooled covariance"))?;
    let delta = &ma.mean - &mb.mean;
    Ok(quadratic_form(&delta, &inverse).sqrt())
}

/// Shared mean and inverse covariance fitted over the union of several profiles.
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    mean: DVector<f64>,
    inverse: DMatrix<f64>,
    rows: usize,
}

impl ReferenceFrame {
    pub fn fit(profiles: &[ProfileSample], regularization: &Regularization) -> Result<Self> {
        let combined = CombinedDataset::stack(profiles)?;
        require_samples(combined.row_count())?;
        let moments = Moments::from_matrix(combined.matrix())?;
        let inverse = regularization.invert(&moments.covariance)?;
        Ok(Self {
            mean: moments.mean,
            inverse,
            rows: combined.row_count(),
        })
    }

    pub fn distances(&self, profile: &ProfileSample) -> DistanceSample {
        row_distances(&profile.matrix(), &self.mean, &self.inverse)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Per-profile distances against one reference fitted over all of them.
pub fn reference_distances(
    profiles: &[ProfileSample],
    regularization: &Regularization,
) -> Result<Vec<DistanceSample>> {
    let frame = ReferenceFrame::fit(profiles, regularization)?;
    Ok(profiles.iter().map(|p| frame.distances(p)).collect())
}
