use std::cmp::Ordering;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

const IQR_FENCE: f64 = 1.5;

/// One-dimensional sample of non-negative distances, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct DistanceSample {
    values: Array1<f64>,
}

impl DistanceSample {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: Array1::from(values),
        }
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn remove_outliers_iqr(&self) -> DistanceSample {
        remove_outliers_iqr(self)
    }

    pub fn shape_metrics(&self) -> ShapeMetrics {
        shape_metrics(self)
    }

    pub fn summary(&self) -> Option<DistanceSummary> {
        if self.is_empty() {
            return None;
        }
        let min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(DistanceSummary {
            mean: self.values.mean().unwrap_or(0.0),
            std: self.values.std(0.0),
            min,
            max,
            count: self.len(),
        })
    }

    pub fn histogram(&self) -> Histogram {
        Histogram::auto(self)
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        sorted
    }
}

impl From<Vec<f64>> for DistanceSample {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<DistanceSample> for Vec<f64> {
    fn from(sample: DistanceSample) -> Self {
        sample.values.to_vec()
    }
}

/// Keeps points inside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`; samples under 4 points pass through.
pub fn remove_outliers_iqr(sample: &DistanceSample) -> DistanceSample {
    if sample.len() < 4 {
        return sample.clone();
    }
    let sorted = sample.sorted();
    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;
    DistanceSample::new(
        sample
            .values
            .iter()
            .copied()
            .filter(|v| *v >= lower && *v <= upper)
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeMetrics {
    /// Coefficient of variation.
    pub cv: f64,
    /// Excess (Fisher) kurtosis.
    pub kurtosis: f64,
}

/// Defaults to zeros rather than NaN on samples too small to describe.
pub fn shape_metrics(sample: &DistanceSample) -> ShapeMetrics {
    if sample.len() < 2 {
        return ShapeMetrics {
            cv: 0.0,
            kurtosis: 0.0,
        };
    }
    let values = sample.values();
    let mean = values.mean().unwrap_or(0.0);
    let std = values.std(0.0);
    let cv = if mean != 0.0 { std / mean } else { 0.0 };
    let kurtosis = if sample.len() >= 4 && std > 0.0 {
        values.mapv(|v| ((v - mean) / std).powi(4)).mean().unwrap_or(0.0) - 3.0
    } else {
        0.0
    };
    ShapeMetrics { cv, kurtosis }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

pub const MAX_BINS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    pub probabilities: Vec<f64>,
}

impl Histogram {
    /// Bin count is the larger of the Sturges and Freedman-Diaconis estimates,
    /// falling back to Sturges when the latter would exceed [`MAX_BINS`].
    pub fn auto(sample: &DistanceSample) -> Self {
        if sample.is_empty() {
            return Self {
                edges: Vec::new(),
                counts: Vec::new(),
                probabilities: Vec::new(),
            };
        }
        let sorted = sample.sorted();
        let n = sorted.len();
        let (mut lo, mut hi) = (sorted[0], sorted[n - 1]);
        let bins = if hi > lo {
            let range = hi - lo;
            let sturges = range / ((n as f64).log2() + 1.0);
            let iqr = percentile(&sorted, 75.0) - percentile(&sorted, 25.0);
            let fd = 2.0 * iqr * (n as f64).powf(-1.0 / 3.0);
            let width = if fd > 0.0 { sturges.min(fd) } else { sturges };
            let count = (range / width).ceil();
            // A near-zero IQR next to a wide range explodes the FD count.
            let count = if count.is_finite() && count <= MAX_BINS as f64 {
                count
            } else {
                (range / sturges).ceil()
            };
            (count as usize).clamp(1, MAX_BINS)
        } else {
            lo -= 0.5;
            hi += 0.5;
            1
        };

        let step = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins)
            .map(|i| if i == bins { hi } else { lo + step * i as f64 })
            .collect();
        let mut counts = vec![0usize; bins];
        for value in &sorted {
            let raw = ((value - lo) / (hi - lo) * bins as f64).floor();
            let idx = (raw.max(0.0) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        let probabilities = counts.iter().map(|c| *c as f64 / n as f64).collect();
        Self {
            edges,
            counts,
            probabilities,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }
}

/// Linear-interpolated percentile over already sorted data, `q` in `[0, 100]`.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
