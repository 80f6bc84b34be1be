use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::compactness::{compactness_with, CompactnessReport};
use crate::mahalanobis::internal_distances;
use crate::pipeline::config::AnalysisConfig;
use crate::profile::{ProfileSample, TraitVector};
use crate::stats::{DistanceSample, DistanceSummary, Histogram, ShapeMetrics};

/// Whether a report carries the vectors it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDetail {
    #[default]
    Summary,
    WithData,
}

/// How tightly one profile's vectors cluster around their own centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub profile: String,
    pub distances: DistanceSample,
    pub summary: Option<DistanceSummary>,
    pub histogram: Histogram,
    /// Shape of the IQR-cleaned distances.
    pub shape: ShapeMetrics,
    pub retained_after_iqr: usize,
    /// Absent when outlier removal leaves too few vectors for a covariance.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub compactness: Option<CompactnessReport>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vectors: Option<Vec<TraitVector>>,
}

pub fn consistency_report(
    profile: &ProfileSample,
    config: &AnalysisConfig,
    detail: ReportDetail,
) -> Result<ConsistencyReport> {
    let distances = internal_distances(profile, &config.regularization)
        .with_context(|| format!("internal distances for profile {}", profile.name()))?;
    let cleaned = distances.remove_outliers_iqr();
    let compactness =
        match compactness_with(profile, config.outlier_p_value, &config.regularization) {
            Ok(report) => Some(report),
            Err(err) => {
                warn!("Profile {}: compactness skipped: {}", profile.name(), err);
                None
            }
        };
    let shape = cleaned.shape_metrics();
    info!(
        "Profile {}: cv {:.4}, kurtosis {:.4}, {} of {} distances kept",
        profile.name(),
        shape.cv,
        shape.kurtosis,
        cleaned.len(),
        distances.len()
    );
    Ok(ConsistencyReport {
        profile: profile.name().to_string(),
        summary: distances.summary(),
        histogram: distances.histogram(),
        shape,
        retained_after_iqr: cleaned.len(),
        compactness,
        vectors: match detail {
            ReportDetail::Summary => None,
            ReportDetail::WithData => Some(profile.vectors().to_vec()),
        },
        distances,
    })
}
