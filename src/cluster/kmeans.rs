use std::cmp::Ordering;

use log::{debug, trace};
use nalgebra::DMatrix;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KMeansInit {
    #[default]
    PlusPlus,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    pub max_iterations: usize,
    /// Relative to the mean per-column variance of the data.
    pub tolerance: f64,
    /// Number of restarts; `None` picks 1 for k-means++ and 10 for random seeding.
    pub n_init: Option<usize>,
    pub init: KMeansInit,
    /// Attach inertia, iteration and size details to cluster results.
    pub include_model: bool,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: None,
            init: KMeansInit::PlusPlus,
            include_model: false,
        }
    }
}

impl KMeansConfig {
    pub fn restarts(&self) -> usize {
        self.n_init.unwrap_or(match self.init {
            KMeansInit::PlusPlus => 1,
            KMeansInit::Random => 10,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansFit {
    pub inertia: f64,
    pub iterations: usize,
    pub cluster_sizes: Vec<usize>,
    pub restarts: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub fit: KMeansFit,
}

/// Lloyd's algorithm with seeded restarts; the lowest-inertia run wins.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    config: KMeansConfig,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize, config: KMeansConfig, seed: u64) -> Self {
        Self { k, config, seed }
    }

    pub fn fit(&self, data: &DMatrix<f64>) -> Result<Clustering> {
        let n = data.nrows();
        if self.k < 1 || self.k > n {
            return Err(AnalysisError::InvalidClusterCount {
                requested: self.k,
                samples: n,
            });
        }
        let restarts = self.config.restarts();
        if restarts == 0 || self.config.max_iterations == 0 {
            return Err(AnalysisError::invalid(
                "k-means needs at least one restart and one iteration",
            ));
        }

        let points: Vec<Vec<f64>> = data
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        let tolerance = self.config.tolerance * mean_column_variance(data);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);

        let mut best: Option<Clustering> = None;
        for run in 0..restarts {
            let centers = match self.config.init {
                KMeansInit::PlusPlus => init_plus_plus(&points, self.k, &mut rng),
                KMeansInit::Random => sample(&mut rng, n, self.k)
                    .into_iter()
                    .map(|idx| points[idx].clone())
                    .collect(),
            };
            let candidate = self.lloyd(&points, centers, tolerance, restarts);
            debug!(
                "K-Means run {}: inertia {:.6} after {} iterations",
                run, candidate.fit.inertia, candidate.fit.iterations
            );
            let better = best
                .as_ref()
                .map_or(true, |current| candidate.fit.inertia < current.fit.inertia);
            if better {
                best = Some(candidate);
            }
        }
        best.ok_or_else(|| AnalysisError::invalid("k-means produced no run"))
    }

    fn lloyd(
        &self,
        points: &[Vec<f64>],
        mut centers: Vec<Vec<f64>>,
        tolerance: f64,
        restarts: usize,
    ) -> Clustering {
        let mut labels = assign(points, &centers);
        let mut iterations = 0;
        for iteration in 1..=self.config.max_iterations {
            iterations = iteration;
            let updated = recompute_centers(points, &labels, &centers);
            let shift: f64 = updated
                .iter()
                .zip(&centers)
                .map(|(new, old)| squared_distance(new, old))
                .sum();
            centers = updated;
            let next = assign(points, &centers);
            let unchanged = next == labels;
            labels = next;
            if unchanged {
                trace!("K-Means converged: labels stable at iteration {iteration}");
                break;
            }
            if shift <= tolerance {
                trace!("K-Means converged: center shift {shift:e} within {tolerance:e}");
                break;
            }
        }

        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &l)| squared_distance(p, &centers[l]))
            .sum();
        let mut cluster_sizes = vec![0usize; centers.len()];
        for &label in &labels {
            cluster_sizes[label] += 1;
        }
        Clustering {
            labels,
            centroids: centers,
            fit: KMeansFit {
                inertia,
                iterations,
                cluster_sizes,
                restarts,
            },
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn mean_column_variance(data: &DMatrix<f64>) -> f64 {
    let n = data.nrows() as f64;
    let total: f64 = data
        .column_iter()
        .map(|col| {
            let mean = col.sum() / n;
            col.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
        })
        .sum();
    total / data.ncols().max(1) as f64
}

/// Nearest center per point; ties go to the lower index.
fn assign(points: &[Vec<f64>], centers: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = (0, f64::INFINITY);
            for (idx, center) in centers.iter().enumerate() {
                let d = squared_distance(p, center);
                if d < best.1 {
                    best = (idx, d);
                }
            }
            best.0
        })
        .collect()
}

fn recompute_centers(points: &[Vec<f64>], labels: &[usize], centers: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = centers.len();
    let dims = centers.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dims]; k];
    let mut counts = vec![0usize; k];
    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (acc, v) in sums[label].iter_mut().zip(point) {
            *acc += v;
        }
    }

    let empty: Vec<usize> = (0..k).filter(|&c| counts[c] == 0).collect();
    if !empty.is_empty() {
        // Empty clusters take over the points farthest from their current center.
        let distances: Vec<f64> = points
            .iter()
            .zip(labels)
            .map(|(p, &l)| squared_distance(p, &centers[l]))
            .collect();
        let mut order: Vec<usize> = (0..points.len()).collect();
        order.sort_by(|&a, &b| {
            distances[b]
                .partial_cmp(&distances[a])
                .unwrap_or(Ordering::Equal)
        });
        for (&cluster, &idx) in empty.iter().zip(&order) {
            let donor = labels[idx];
            if counts[donor] > 1 {
                for (acc, v) in sums[donor].iter_mut().zip(&points[idx]) {
                    *acc -= v;
                }
                counts[donor] -= 1;
            }
            sums[cluster] = points[idx].clone();
            counts[cluster] = 1;
        }
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| sum.into_iter().map(|v| v / count as f64).collect())
        .collect()
}

/// Greedy k-means++: each step samples several candidates proportional to the
/// current potential and keeps the one that lowers it most.
fn init_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<Vec<f64>> {
    let n = points.len();
    let trials = 2 + (k as f64).ln().floor() as usize;
    let first = rng.gen_range(0..n);
    let mut centers = vec![points[first].clone()];
    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &points[first]))
        .collect();
    let mut potential: f64 = closest.iter().sum();

    while centers.len() < k {
        if potential <= 0.0 {
            centers.push(points[rng.gen_range(0..n)].clone());
            continue;
        }
        let mut best: Option<(usize, f64, Vec<f64>)> = None;
        for _ in 0..trials {
            let target = rng.gen::<f64>() * potential;
            let candidate = pick_weighted(&closest, target);
            let updated: Vec<f64> = closest
                .iter()
                .zip(points)
                .map(|(c, p)| c.min(squared_distance(p, &points[candidate])))
                .collect();
            let candidate_potential: f64 = updated.iter().sum();
            if best
                .as_ref()
                .map_or(true, |(_, pot, _)| candidate_potential < *pot)
            {
                best = Some((candidate, candidate_potential, updated));
            }
        }
        if let Some((idx, pot, updated)) = best {
            centers.push(points[idx].clone());
            closest = updated;
            potential = pot;
        }
    }
    centers
}

fn pick_weighted(weights: &[f64], target: f64) -> usize {
    let mut cumulative = 0.0;
    for (idx, w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > target {
            return idx;
        }
    }
    weights.len() - 1
}
