pub mod ari;
pub mod kmeans;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::profile::CombinedDataset;

pub use ari::adjusted_rand_index;
pub use kmeans::{Clustering, KMeans, KMeansConfig, KMeansFit, KMeansInit};

pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResult {
    pub predicted_labels: Vec<usize>,
    pub ari_score: f64,
    pub centroids: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<KMeansFit>,
}

impl ClusterResult {
    pub fn centroid_separation(&self) -> CentroidSeparation {
        CentroidSeparation::from_centroids(&self.centroids)
    }
}

/// Clusters an already-scaled combined dataset and scores agreement with its true labels.
pub fn evaluate(combined: &CombinedDataset, k: usize) -> Result<ClusterResult> {
    evaluate_with(combined, k, &KMeansConfig::default(), DEFAULT_SEED)
}

pub fn evaluate_with(
    combined: &CombinedDataset,
    k: usize,
    config: &KMeansConfig,
    seed: u64,
) -> Result<ClusterResult> {
    let clustering = KMeans::new(k, config.clone(), seed).fit(combined.matrix())?;
    let ari_score = adjusted_rand_index(combined.labels(), &clustering.labels)?;
    debug!(
        "Clustered {} rows into {} groups: ARI {:.4}, inertia {:.4}",
        combined.row_count(),
        k,
        ari_score,
        clustering.fit.inertia
    );
    Ok(ClusterResult {
        predicted_labels: clustering.labels,
        ari_score,
        centroids: clustering.centroids,
        model: config.include_model.then_some(clustering.fit),
    })
}

/// Euclidean spread between cluster centroids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidSeparation {
    pub distances: Vec<Vec<f64>>,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl CentroidSeparation {
    pub fn from_centroids(centroids: &[Vec<f64>]) -> Self {
        let k = centroids.len();
        let mut distances = vec![vec![0.0; k]; k];
        let mut pairs = Vec::new();
        for i in 0..k {
            for j in (i + 1)..k {
                let d = centroids[i]
                    .iter()
                    .zip(&centroids[j])
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                distances[i][j] = d;
                distances[j][i] = d;
                pairs.push(d);
            }
        }
        if pairs.is_empty() {
            return Self {
                distances,
                mean: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        Self {
            distances,
            mean: pairs.iter().sum::<f64>() / pairs.len() as f64,
            min: pairs.iter().copied().fold(f64::INFINITY, f64::min),
            max: pairs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::profile::{ProfileSample, TRAIT_COUNT};

    fn profile(name: &str, offset: f64) -> ProfileSample {
        let rows: Vec<[f64; TRAIT_COUNT]> = (0..12)
            .map(|i| {
                let x = i as f64;
                std::array::from_fn(|d| offset + ((x + d as f64) * 0.9).sin() * 0.2)
            })
            .collect();
        ProfileSample::from_rows(name, rows).expect("profile")
    }

    #[test]
    fn separated_profiles_are_recovered() {
        let combined = CombinedDataset::stack(&[profile("a", 1.0), profile("b", 4.0)])
            .and_then(|c| c.standardized())
            .expect("combined");
        let result = evaluate(&combined, 2).expect("evaluate");
        assert_eq!(result.ari_score, 1.0);
        assert!(result.model.is_none());
        assert_eq!(result.centroids.len(), 2);
    }

    #[test]
    fn model_details_are_opt_in() {
        let combined = CombinedDataset::stack(&[profile("a", 1.0), profile("b", 4.0)])
            .expect("combined");
        let config = KMeansConfig {
            include_model: true,
            ..KMeansConfig::default()
        };
        let result = evaluate_with(&combined, 2, &config, 9).expect("evaluate");
        let model = result.model.expect("model");
        assert_eq!(model.cluster_sizes.iter().sum::<usize>(), 24);
    }

    #[test]
    fn invalid_k_is_reported() {
        let combined = CombinedDataset::stack(&[profile("a", 1.0)]).expect("combined");
        assert!(matches!(
            evaluate(&combined, 13),
            Err(AnalysisError::InvalidClusterCount { requested: 13, samples: 12 })
        ));
    }

    #[test]
    fn separation_statistics() {
        let separation = CentroidSeparation::from_centroids(&[
            vec![0.0, 0.0],
            vec![3.0, 4.0],
            vec![0.0, 8.0],
        ]);
        assert_eq!(separation.distances[0][1], 5.0);
        assert_eq!(separation.distances[1][0], 5.0);
        assert_eq!(separation.min, 5.0);
        assert_eq!(separation.max, 8.0);
        assert!((separation.mean - 6.0).abs() < 1e-12);

        let single = CentroidSeparation::from_centroids(&[vec![1.0, 2.0]]);
        assert_eq!(single.mean, 0.0);
        assert_eq!(single.distances, vec![vec![0.0]]);
    }
}
