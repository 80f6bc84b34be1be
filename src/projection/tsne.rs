use log::{debug, trace};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::projection::pca::{column_std, Pca};
use crate::projection::Projection2D;

const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const PERPLEXITY_STEPS: usize = 100;
const MIN_GAIN: f64 = 0.01;
const MIN_GRAD_NORM: f64 = 1e-7;
const GRAD_CHECK_INTERVAL: usize = 50;
const INIT_SCALE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TsneInit {
    #[default]
    Pca,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsneConfig {
    /// Effective perplexity is `min(max_perplexity, N - 1)`.
    pub max_perplexity: f64,
    pub iterations: usize,
    pub early_exaggeration: f64,
    pub exaggeration_iterations: usize,
    /// `None` picks `max(N / early_exaggeration / 4, 50)`.
    pub learning_rate: Option<f64>,
    pub init: TsneInit,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            max_perplexity: 30.0,
            iterations: 1000,
            early_exaggeration: 12.0,
            exaggeration_iterations: 250,
            learning_rate: None,
            init: TsneInit::Pca,
        }
    }
}

impl TsneConfig {
    fn validate(&self) -> Result<()> {
        if !(self.max_perplexity > 0.0) {
            return Err(AnalysisError::invalid(format!(
                "perplexity must be positive, got {}",
                self.max_perplexity
            )));
        }
        if !(self.early_exaggeration > 0.0) {
            return Err(AnalysisError::invalid("early exaggeration must be positive"));
        }
        if matches!(self.learning_rate, Some(rate) if !(rate > 0.0)) {
            return Err(AnalysisError::invalid("learning rate must be positive"));
        }
        Ok(())
    }
}

/// Exact t-SNE into two dimensions. Only the grouping of the output is meaningful.
pub fn tsne_2d(matrix: &DMatrix<f64>, config: &TsneConfig, seed: u64) -> Result<Projection2D> {
    config.validate()?;
    let n = matrix.nrows();
    if n < 2 {
        return Err(AnalysisError::degenerate(format!(
            "t-SNE needs at least 2 rows, got {n}"
        )));
    }
    let perplexity = config.max_perplexity.min((n - 1) as f64);
    let distances = squared_distances(matrix);
    let mut affinities = joint_probabilities(&distances, n, perplexity);
    let mut embedding = initial_embedding(matrix, config.init, seed)?;
    let learning_rate = config
        .learning_rate
        .unwrap_or_else(|| (n as f64 / config.early_exaggeration / 4.0).max(50.0));
    debug!(
        "t-SNE on {} rows: perplexity {:.1}, learning rate {:.1}",
        n, perplexity, learning_rate
    );

    let mut optimizer = Optimizer::new(n, learning_rate);
    let exaggerated = config.exaggeration_iterations.min(config.iterations);
    affinities.iter_mut().for_each(|p| *p *= config.early_exaggeration);
    optimizer.run(&affinities, &mut embedding, exaggerated, 0.5);
    affinities.iter_mut().for_each(|p| *p /= config.early_exaggeration);
    optimizer.run(
        &affinities,
        &mut embedding,
        config.iterations - exaggerated,
        0.8,
    );

    Ok(Projection2D {
        points: embedding,
        explained_variance: None,
    })
}

fn squared_distances(matrix: &DMatrix<f64>) -> Vec<f64> {
    let n = matrix.nrows();
    let mut out = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = (matrix.row(i) - matrix.row(j)).norm_squared();
            out[i * n + j] = d;
            out[j * n + i] = d;
        }
    }
    out
}

/// Symmetrized affinities, each row calibrated to the target perplexity.
fn joint_probabilities(distances: &[f64], n: usize, perplexity: f64) -> Vec<f64> {
    let target_entropy = perplexity.ln();
    let mut conditional = vec![0.0; n * n];
    for i in 0..n {
        let row = &distances[i * n..(i + 1) * n];
        let out = &mut conditional[i * n..(i + 1) * n];
        let (mut beta, mut beta_min, mut beta_max) = (1.0_f64, f64::NEG_INFINITY, f64::INFINITY);
        for _ in 0..PERPLEXITY_STEPS {
            let mut sum = 0.0;
            for j in 0..n {
                out[j] = if j == i { 0.0 } else { (-row[j] * beta).exp() };
                sum += out[j];
            }
            if sum == 0.0 {
                sum = 1e-8;
            }
            let mut weighted = 0.0;
            for j in 0..n {
                out[j] /= sum;
                weighted += row[j] * out[j];
            }
            let entropy = sum.ln() + beta * weighted;
            let diff = entropy - target_entropy;
            if diff.abs() <= PERPLEXITY_TOLERANCE {
                break;
            }
            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max.is_infinite() {
                    beta * 2.0
                } else {
                    (beta + beta_max) / 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min.is_infinite() {
                    beta / 2.0
                } else {
                    (beta + beta_min) / 2.0
                };
            }
        }
        trace!("t-SNE row {i}: sigma {:.4}", (1.0 / beta).sqrt());
    }

    let mut joint = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            joint[i * n + j] = conditional[i * n + j] + conditional[j * n + i];
        }
    }
    let total = joint.iter().sum::<f64>().max(f64::EPSILON);
    for (idx, p) in joint.iter_mut().enumerate() {
        *p = if idx % (n + 1) == 0 {
            0.0
        } else {
            (*p / total).max(f64::EPSILON)
        };
    }
    joint
}

fn initial_embedding(matrix: &DMatrix<f64>, init: TsneInit, seed: u64) -> Result<Vec<[f64; 2]>> {
    match init {
        TsneInit::Pca => {
            let pca = Pca::fit(matrix)?;
            let coords = pca.transform(matrix, 2_usize.min(matrix.ncols()))?;
            let first: Vec<f64> = coords.column(0).iter().copied().collect();
            let std = column_std(&first);
            let scale = if std > 0.0 { INIT_SCALE / std } else { INIT_SCALE };
            Ok(coords
                .row_iter()
                .map(|row| {
                    let second = if row.len() > 1 { row[1] } else { 0.0 };
                    [row[0] * scale, second * scale]
                })
                .collect())
        }
        TsneInit::Random => {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            Ok((0..matrix.nrows())
                .map(|_| {
                    let x: f64 = StandardNormal.sample(&mut rng);
                    let y: f64 = StandardNormal.sample(&mut rng);
                    [x * INIT_SCALE, y * INIT_SCALE]
                })
                .collect())
        }
    }
}

/// Gradient descent with momentum and per-coordinate adaptive gains.
struct Optimizer {
    n: usize,
    learning_rate: f64,
    update: Vec<[f64; 2]>,
    gains: Vec<[f64; 2]>,
}

impl Optimizer {
    fn new(n: usize, learning_rate: f64) -> Self {
        Self {
            n,
            learning_rate,
            update: vec![[0.0; 2]; n],
            gains: vec![[1.0; 2]; n],
        }
    }

    fn run(&mut self, p: &[f64], embedding: &mut [[f64; 2]], iterations: usize, momentum: f64) {
        for iteration in 0..iterations {
            let gradient = self.gradient(p, embedding);
            let mut norm = 0.0;
            for i in 0..self.n {
                for d in 0..2 {
                    let g = gradient[i][d];
                    norm += g * g;
                    let gain = &mut self.gains[i][d];
                    let adjusted = if self.update[i][d] * g < 0.0 {
                        *gain + 0.2
                    } else {
                        *gain * 0.8
                    };
                    *gain = adjusted.max(MIN_GAIN);
                    self.update[i][d] =
                        momentum * self.update[i][d] - self.learning_rate * g * *gain;
                    embedding[i][d] += self.update[i][d];
                }
            }
            if (iteration + 1) % GRAD_CHECK_INTERVAL == 0 && norm.sqrt() <= MIN_GRAD_NORM {
                trace!("t-SNE gradient vanished after {} iterations", iteration + 1);
                break;
            }
        }
    }

    /// KL gradient under a Student-t kernel with one degree of freedom.
    fn gradient(&self, p: &[f64], embedding: &[[f64; 2]]) -> Vec<[f64; 2]> {
        let n = self.n;
        let mut kernel = vec![0.0; n * n];
        let mut total = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = embedding[i][0] - embedding[j][0];
                let dy = embedding[i][1] - embedding[j][1];
                let k = 1.0 / (1.0 + dx * dx + dy * dy);
                kernel[i * n + j] = k;
                kernel[j * n + i] = k;
                total += 2.0 * k;
            }
        }
        let total = total.max(f64::EPSILON);
        let mut gradient = vec![[0.0; 2]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let k = kernel[i * n + j];
                let q = (k / total).max(f64::EPSILON);
                let weight = (p[i * n + j] - q) * k;
                gradient[i][0] += weight * (embedding[i][0] - embedding[j][0]);
                gradient[i][1] += weight * (embedding[i][1] - embedding[j][1]);
            }
            gradient[i][0] *= 4.0;
            gradient[i][1] *= 4.0;
        }
        gradient
    }
}
