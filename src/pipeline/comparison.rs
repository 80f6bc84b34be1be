use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::divergence::{divergence_report, DivergenceReport};
use crate::mahalanobis::pairwise_distance;
use crate::pipeline::config::AnalysisConfig;
use crate::profile::ProfileSample;
use crate::stats::{trait_t_tests, TraitTest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub a: String,
    pub b: String,
    pub t_tests: Vec<TraitTest>,
    /// Centroid separation under the pooled covariance.
    pub mahalanobis: f64,
    pub divergence: DivergenceReport,
}

pub fn compare_profiles(
    a: &ProfileSample,
    b: &ProfileSample,
    config: &AnalysisConfig,
) -> Result<ComparisonReport> {
    let t_tests = trait_t_tests(a, b)
        .with_context(|| format!("t-tests between {} and {}", a.name(), b.name()))?;
    let mahalanobis = pairwise_distance(a, b)
        .with_context(|| format!("Mahalanobis distance between {} and {}", a.name(), b.name()))?;
    let divergence = divergence_report(a, b, &config.divergence, config.seed)
        .with_context(|| format!("divergence between {} and {}", a.name(), b.name()))?;
    info!(
        "Compared {} with {}: Mahalanobis {:.4}, AMW {:.4}",
        a.name(),
        b.name(),
        mahalanobis,
        divergence.amw
    );
    Ok(ComparisonReport {
        a: a.name().to_string(),
        b: b.name().to_string(),
        t_tests,
        mahalanobis,
        divergence,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineDivergence {
    pub profile: String,
    pub report: DivergenceReport,
}

/// Divergence of every profile from a shared baseline, in input order.
pub fn baseline_divergence(
    baseline: &ProfileSample,
    profiles: &[ProfileSample],
    config: &AnalysisConfig,
) -> Result<Vec<BaselineDivergence>> {
    profiles
        .par_iter()
        .map(|profile| {
            let report = divergence_report(baseline, profile, &config.divergence, config.seed)
                .with_context(|| {
                    format!(
                        "divergence of {} against baseline {}",
                        profile.name(),
                        baseline.name()
                    )
                })?;
            Ok(BaselineDivergence {
                profile: profile.name().to_string(),
                report,
            })
        })
        .collect()
}
