use oceanid::cluster::KMeansConfig;
use oceanid::profile::TRAIT_COUNT;
use oceanid::{
    adjusted_rand_index, evaluate, evaluate_with, AnalysisConfig, CombinedDataset,
    IdentifiabilityWorkflow, ProfileSample, ProjectionMethod,
};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

fn gaussian_profile(name: &str, centre: f64, std: f64, rows: usize, seed: u64) -> ProfileSample {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let normal = Normal::new(centre, std).expect("normal");
    let rows: Vec<[f64; TRAIT_COUNT]> = (0..rows)
        .map(|_| std::array::from_fn(|_| normal.sample(&mut rng)))
        .collect();
    ProfileSample::from_rows(name, rows).expect("profile")
}

fn scaled(profiles: &[ProfileSample]) -> CombinedDataset {
    CombinedDataset::stack(profiles)
        .expect("stack")
        .standardized()
        .expect("standardize")
}

#[test]
fn well_separated_profiles_are_recovered() {
    let profiles = vec![
        gaussian_profile("cautious", 1.0, 0.3, 50, 1),
        gaussian_profile("bold", 6.0, 0.3, 50, 2),
    ];
    let result = evaluate(&scaled(&profiles), 2).expect("evaluate");
    assert!(result.ari_score > 0.8, "ari {}", result.ari_score);
    assert_eq!(result.predicted_labels.len(), 100);
    assert_eq!(result.centroids.len(), 2);
}

#[test]
fn identical_sources_are_not_identifiable() {
    for seed in [3_u64, 17, 101] {
        let profiles = vec![
            gaussian_profile("first", 3.0, 1.0, 50, seed),
            gaussian_profile("second", 3.0, 1.0, 50, seed + 1000),
        ];
        let result = evaluate_with(&scaled(&profiles), 2, &KMeansConfig::default(), seed)
            .expect("evaluate");
        assert!(result.ari_score.abs() <= 0.2, "seed {seed}: ari {}", result.ari_score);
    }
}

#[test]
fn ari_ignores_cluster_relabeling() {
    let profiles = vec![
        gaussian_profile("a", 2.0, 0.8, 40, 5),
        gaussian_profile("b", 3.0, 0.8, 40, 6),
        gaussian_profile("c", 4.0, 0.8, 40, 7),
    ];
    let combined = scaled(&profiles);
    let result = evaluate(&combined, 3).expect("evaluate");
    let permuted: Vec<usize> = result
        .predicted_labels
        .iter()
        .map(|label| [2, 0, 1][*label])
        .collect();
    let relabeled = adjusted_rand_index(combined.labels(), &permuted).expect("ari");
    assert!((relabeled - result.ari_score).abs() < 1e-12);
}

#[test]
fn workflow_reports_every_row() {
    let profiles = vec![
        gaussian_profile("human", 3.0, 0.7, 30, 11),
        gaussian_profile("model_a", 4.5, 0.7, 30, 12),
        gaussian_profile("model_b", 1.5, 0.7, 30, 13),
    ];
    let mut config = AnalysisConfig::default();
    config.kmeans.include_model = true;
    let summary = IdentifiabilityWorkflow::new(config, profiles)
        .execute()
        .expect("workflow");

    assert_eq!(summary.names, ["human", "model_a", "model_b"]);
    assert_eq!(summary.labels[..30], [0; 30]);
    assert_eq!(summary.labels[60..], [2; 30]);
    assert_eq!(summary.projection.points.len(), 90);
    let model = summary.cluster.model.as_ref().expect("model details");
    assert_eq!(model.cluster_sizes.iter().sum::<usize>(), 90);
    let variance = summary.projection.explained_variance.expect("pca variance");
    assert!(variance[0] >= variance[1] && variance[0] + variance[1] <= 1.0 + 1e-12);
    assert_eq!(summary.separation.distances.len(), 3);
}

#[test]
fn tsne_workflow_is_reproducible() {
    let profiles = vec![
        gaussian_profile("a", 2.0, 0.5, 20, 21),
        gaussian_profile("b", 4.0, 0.5, 20, 22),
    ];
    let mut config = AnalysisConfig::default();
    config.projection = ProjectionMethod::Tsne;
    config.tsne.iterations = 300;
    config.tsne.exaggeration_iterations = 100;

    let first = IdentifiabilityWorkflow::new(config.clone(), profiles.clone())
        .execute()
        .expect("first");
    let second = IdentifiabilityWorkflow::new(config, profiles)
        .execute()
        .expect("second");
    assert_eq!(first.projection.points, second.projection.points);
    assert!(first.projection.explained_variance.is_none());
    assert!(first
        .projection
        .points
        .iter()
        .all(|[x, y]| x.is_finite() && y.is_finite()));
}
