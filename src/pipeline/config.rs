use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cluster::KMeansConfig;
use crate::divergence::DivergenceConfig;
use crate::mahalanobis::{Regularization, DEFAULT_EPSILON};
use crate::projection::{ProjectionMethod, TsneConfig};

/// Settings shared by every analysis workflow. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub seed: u64,
    /// K-Means cluster count; defaults to the number of profiles.
    pub clusters: Option<usize>,
    pub kmeans: KMeansConfig,
    /// Single-profile Mahalanobis distances.
    pub regularization: Regularization,
    /// Distances against the shared reference fitted over all profiles.
    pub reference_regularization: Regularization,
    pub divergence: DivergenceConfig,
    pub tsne: TsneConfig,
    pub projection: ProjectionMethod,
    /// Chi-squared tail probability for compactness outlier removal.
    pub outlier_p_value: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            clusters: None,
            kmeans: KMeansConfig::default(),
            regularization: Regularization::on_failure(DEFAULT_EPSILON),
            reference_regularization: Regularization::always(DEFAULT_EPSILON),
            divergence: DivergenceConfig::default(),
            tsne: TsneConfig::default(),
            projection: ProjectionMethod::Pca,
            outlier_p_value: None,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("parse analysis config json")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open config file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("load analysis config from {:?}", path))
    }

    pub fn cluster_count(&self, profiles: usize) -> usize {
        self.clusters.unwrap_or(profiles)
    }

    fn validate(&self) -> Result<()> {
        if let Some(p) = self.outlier_p_value {
            if !(p > 0.0 && p < 1.0) {
                anyhow::bail!("outlier_p_value must lie in (0, 1), got {p}");
            }
        }
        if self.divergence.projections == 0 {
            anyhow::bail!("divergence.projections must be at least 1");
        }
        Ok(())
    }
}
