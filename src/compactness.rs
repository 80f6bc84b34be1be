use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::mahalanobis::{internal_distances, Regularization};
use crate::profile::{ProfileSample, TRAIT_COUNT};
use crate::profile::model::vectors_to_matrix;
use crate::stats::{chi_squared_quantile, Moments};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompactnessReport {
    /// Trace of the sample covariance of the retained vectors.
    pub trace: f64,
    pub retained: usize,
    pub removed: usize,
    pub critical_value: Option<f64>,
}

pub fn compactness(profile: &ProfileSample, outlier_p_value: Option<f64>) -> Result<CompactnessReport> {
    compactness_with(profile, outlier_p_value, &Regularization::default())
}

/// Total variance of a profile, optionally after dropping vectors whose squared
/// Mahalanobis distance reaches the chi-squared critical value.
pub fn compactness_with(
    profile: &ProfileSample,
    outlier_p_value: Option<f64>,
    regularization: &Regularization,
) -> Result<CompactnessReport> {
    if profile.len() < 2 {
        return Err(AnalysisError::degenerate(format!(
            "compactness of '{}' needs at least 2 vectors",
            profile.name()
        )));
    }
    let Some(p_value) = outlier_p_value else {
        return Ok(CompactnessReport {
            trace: profile.moments()?.total_variance(),
            retained: profile.len(),
            removed: 0,
            critical_value: None,
        });
    };

    let critical = chi_squared_quantile(1.0 - p_value, TRAIT_COUNT as f64)?;
    let distances = internal_distances(profile, regularization)?;
    let kept: Vec<_> = profile
        .vectors()
        .iter()
        .zip(distances.values().iter())
        .filter(|(_, d)| *d * *d < critical)
        .map(|(v, _)| *v)
        .collect();
    let removed = profile.len() - kept.len();
    debug!(
        "Profile {}: compactness removed {} of {} vectors (critical {:.4})",
        profile.name(),
        removed,
        profile.len(),
        critical
    );
    if kept.len() < 2 {
        return Err(AnalysisError::degenerate(format!(
            "outlier removal left {} vectors in '{}'",
            kept.len(),
            profile.name()
        )));
    }
    let moments = Moments::from_matrix(&vectors_to_matrix(&kept))?;
    Ok(CompactnessReport {
        trace: moments.total_variance(),
        retained: kept.len(),
        removed,
        critical_value: Some(critical),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Trait;

    fn spread_profile(outlier: bool) -> ProfileSample {
        let mut rows: Vec<[f64; TRAIT_COUNT]> = (0..40)
            .map(|i| {
                let x = i as f64;
                [
                    3.0 + (x * 0.7).sin() * 0.4,
                    3.0 + (x * 1.3).cos() * 0.4,
                    3.0 + (x * 2.1).sin() * 0.3,
                    3.0 + (x * 0.4).cos() * 0.5,
                    3.0 + (x * 1.9).sin() * 0.2,
                ]
            })
            .collect();
        if outlier {
            rows.push([15.0, -9.0, 12.0, -7.0, 20.0]);
        }
        ProfileSample::from_rows("spread", rows).expect("profile")
    }

    #[test]
    fn trace_equals_sum_of_column_variances() {
        let profile = spread_profile(false);
        let report = compactness(&profile, None).expect("compactness");
        let expected: f64 = Trait::ALL
            .iter()
            .map(|t| {
                let column = profile.column(*t);
                let n = column.len() as f64;
                let mean = column.iter().sum::<f64>() / n;
                column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
            })
            .sum();
        assert!((report.trace - expected).abs() < 1e-12);
        assert_eq!(report.removed, 0);
        assert!(report.critical_value.is_none());
    }

    #[test]
    fn chi_squared_filter_drops_gross_outlier() {
        let profile = spread_profile(true);
        let raw = compactness(&profile, None).expect("raw");
        let filtered = compactness(&profile, Some(0.05)).expect("filtered");
        assert!(filtered.removed >= 1);
        assert_eq!(filtered.retained + filtered.removed, profile.len());
        assert!(filtered.trace < raw.trace);
    }

    #[test]
    fn single_vector_is_degenerate() {
        let profile = ProfileSample::from_rows("one", [[1.0; TRAIT_COUNT]]).expect("profile");
        assert!(matches!(
            compactness(&profile, None),
            Err(AnalysisError::DegenerateInput(_))
        ));
    }
}
