use criterion::{black_box, criterion_group, criterion_main, Criterion};
use oceanid::profile::TRAIT_COUNT;
use oceanid::{
    divergence_report, evaluate, internal_distances, pca_2d, AnalysisConfig, CombinedDataset,
    DivergenceConfig, IdentifiabilityWorkflow, ProfileSample, Regularization,
};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

fn gaussian_profile(name: &str, centre: f64, rows: usize, seed: u64) -> ProfileSample {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let normal = Normal::new(centre, 0.8).expect("normal");
    let rows: Vec<[f64; TRAIT_COUNT]> = (0..rows)
        .map(|_| std::array::from_fn(|_| normal.sample(&mut rng)))
        .collect();
    ProfileSample::from_rows(name, rows).expect("profile")
}

fn bench_analysis_pipeline(c: &mut Criterion) {
    let profiles: Vec<_> = (0..4)
        .map(|i| gaussian_profile(&format!("source_{i}"), 2.0 + i as f64 * 0.7, 150, i))
        .collect();
    let combined = CombinedDataset::stack(&profiles)
        .expect("stack")
        .standardized()
        .expect("scale");

    let mut group = c.benchmark_group("analysis_pipeline");

    group.bench_function("internal_distances_150", |b| {
        b.iter(|| {
            let distances =
                internal_distances(&profiles[0], &Regularization::default()).expect("distances");
            black_box(distances);
        });
    });

    group.bench_function("kmeans_600", |b| {
        b.iter(|| {
            let result = evaluate(&combined, 4).expect("evaluate");
            black_box(result.ari_score);
        });
    });

    group.bench_function("pca_600", |b| {
        b.iter(|| {
            let projection = pca_2d(combined.matrix()).expect("pca");
            black_box(projection);
        });
    });

    group.bench_function("divergence_150", |b| {
        let config = DivergenceConfig::default();
        b.iter(|| {
            let report =
                divergence_report(&profiles[0], &profiles[1], &config, 42).expect("divergence");
            black_box(report);
        });
    });

    group.sample_size(10);
    group.bench_function("identifiability_600", |b| {
        b.iter(|| {
            let summary = IdentifiabilityWorkflow::new(AnalysisConfig::default(), profiles.clone())
                .execute()
                .expect("workflow");
            black_box(summary.ari());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_analysis_pipeline);
criterion_main!(benches);
