use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::cluster::{evaluate_with, CentroidSeparation, ClusterResult};
use crate::pipeline::config::AnalysisConfig;
use crate::profile::{CombinedDataset, ProfileSample};
use crate::projection::{project_2d, Projection2D, ProjectionMethod};

/// Can an unsupervised clustering recover which profile each vector came from?
pub struct IdentifiabilityWorkflow {
    config: AnalysisConfig,
    profiles: Arc<[ProfileSample]>,
}

impl IdentifiabilityWorkflow {
    pub fn new(config: AnalysisConfig, profiles: impl Into<Arc<[ProfileSample]>>) -> Self {
        Self {
            config,
            profiles: profiles.into(),
        }
    }

    pub fn profiles(&self) -> &[ProfileSample] {
        &self.profiles
    }

    pub fn execute(&self) -> Result<IdentifiabilitySummary> {
        let total_start = Instant::now();
        if self.profiles.len() < 2 {
            anyhow::bail!(
                "identifiability needs at least two profiles, got {}",
                self.profiles.len()
            );
        }

        let combined = CombinedDataset::stack(&self.profiles)
            .context("stack profiles")?
            .standardized()
            .context("standardize combined profiles")?;
        let k = self.config.cluster_count(combined.profile_count());
        info!(
            "Identifiability: {} rows from {} profiles, k = {}",
            combined.row_count(),
            combined.profile_count(),
            k
        );

        let cluster_start = Instant::now();
        let cluster = evaluate_with(&combined, k, &self.config.kmeans, self.config.seed)
            .with_context(|| format!("cluster {} rows into {} groups", combined.row_count(), k))?;
        let clustering_duration = cluster_start.elapsed();
        info!(
            "Identifiability: ARI {:.4} in {:?}",
            cluster.ari_score, clustering_duration
        );

        let projection_start = Instant::now();
        let projection = project_2d(
            combined.matrix(),
            self.config.projection,
            &self.config.tsne,
            self.config.seed,
        )
        .with_context(|| format!("{:?} projection", self.config.projection))?;
        let projection_duration = projection_start.elapsed();
        info!(
            "Identifiability: {:?} projection in {:?}",
            self.config.projection, projection_duration
        );

        let separation = cluster.centroid_separation();
        Ok(IdentifiabilitySummary {
            names: combined.names().to_vec(),
            labels: combined.labels().to_vec(),
            cluster,
            separation,
            projection,
            projection_method: self.config.projection,
            clustering_duration,
            projection_duration,
            total_duration: total_start.elapsed(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiabilitySummary {
    pub names: Vec<String>,
    /// True profile index per stacked row.
    pub labels: Vec<usize>,
    pub cluster: ClusterResult,
    pub separation: CentroidSeparation,
    pub projection: Projection2D,
    pub projection_method: ProjectionMethod,
    /// Timings of the run that produced this summary. Not serialized, so a
    /// cached summary reads back with zero durations.
    #[serde(skip)]
    pub clustering_duration: Duration,
    #[serde(skip)]
    pub projection_duration: Duration,
    #[serde(skip)]
    pub total_duration: Duration,
}

impl IdentifiabilitySummary {
    pub fn ari(&self) -> f64 {
        self.cluster.ari_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::TRAIT_COUNT;

    fn profile(name: &str, centre: f64) -> ProfileSample {
        let rows: Vec<[f64; TRAIT_COUNT]> = (0..20)
            .map(|i| {
                std::array::from_fn(|d| centre + 0.2 * ((i * 13 + d * 7) as f64 * 0.71).sin())
            })
            .collect();
        ProfileSample::from_rows(name, rows).expect("profile")
    }

    #[test]
    fn separated_profiles_are_identifiable() {
        let profiles = vec![profile("low", 1.0), profile("high", 4.0)];
        let summary = IdentifiabilityWorkflow::new(AnalysisConfig::default(), profiles)
            .execute()
            .expect("summary");
        assert_eq!(summary.names, ["low", "high"]);
        assert_eq!(summary.labels.len(), 40);
        assert_eq!(summary.projection.points.len(), 40);
        assert!((summary.ari() - 1.0).abs() < 1e-9);
        assert!(summary.separation.max > 0.0);
        assert!(summary.projection.explained_variance.is_some());
    }

    #[test]
    fn serialized_summary_carries_no_timings() {
        let profiles = vec![profile("low", 1.0), profile("high", 4.0)];
        let summary = IdentifiabilityWorkflow::new(AnalysisConfig::default(), profiles)
            .execute()
            .expect("summary");
        let json = serde_json::to_value(&summary).expect("serialize");
        let fields = json.as_object().expect("object");
        assert!(fields.keys().all(|key| !key.ends_with("_duration")));

        let restored: IdentifiabilitySummary = serde_json::from_value(json).expect("deserialize");
        assert_eq!(restored.total_duration, Duration::ZERO);
        assert_eq!(restored.labels, summary.labels);
        assert_eq!(restored.names, summary.names);
    }

    #[test]
    fn single_profile_is_rejected() {
        let workflow = IdentifiabilityWorkflow::new(AnalysisConfig::default(), vec![profile("solo", 1.0)]);
        assert!(workflow.execute().is_err());
    }
}
