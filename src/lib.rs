pub mod cache;
pub mod cluster;
pub mod compactness;
pub mod divergence;
pub mod error;
pub mod mahalanobis;
pub mod pipeline;
pub mod profile;
pub mod projection;
pub mod stats;
pub mod store;

pub use cache::{CacheKey, CacheMetadata, ReportCache};
pub use cluster::{adjusted_rand_index, evaluate, evaluate_with, CentroidSeparation, ClusterResult};
pub use compactness::{compactness, CompactnessReport};
pub use divergence::{divergence_report, DivergenceConfig, DivergenceReport, FrechetEstimate};
pub use error::{AnalysisError, Result};
pub use mahalanobis::{
    internal_distances, pairwise_distance, reference_distances, ReferenceFrame, Regularization,
    RegularizationPolicy,
};
pub use pipeline::{
    baseline_divergence, compare_profiles, consistency_report, AnalysisConfig,
    ComparisonReport, ConsistencyReport, ConvergenceAnalysis, IdentifiabilitySummary,
    IdentifiabilityWorkflow, ReportDetail,
};
pub use profile::{CombinedDataset, ProfileLoader, ProfileSample, Trait, TraitVector};
pub use projection::{pca_1d, pca_2d, tsne_2d, Projection1D, Projection2D, ProjectionMethod};
pub use stats::{remove_outliers_iqr, shape_metrics, standardize, DistanceSample, ShapeMetrics};
pub use store::{DirectoryLoader, JsonVectorStore, SqliteVectorStore, VectorStore};
