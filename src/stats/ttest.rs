use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::profile::{ProfileSample, Trait};
use crate::stats::special::student_t_two_sided_p;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTest {
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitTest {
    #[serde(rename = "trait")]
    pub trait_: Trait,
    pub mean_a: f64,
    pub mean_b: f64,
    pub test: TTest,
}

/// Two-sample Student t-test with pooled variance.
pub fn student_t_test(a: &[f64], b: &[f64]) -> Result<TTest> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return Err(AnalysisError::degenerate(format!(
            "t-test needs at least 2 observations per group, got {n1} and {n2}"
        )));
    }
    let (m1, v1) = mean_and_variance(a);
    let (m2, v2) = mean_and_variance(b);
    let dof = (n1 + n2 - 2) as f64;
    let pooled = ((n1 - 1) as f64 * v1 + (n2 - 1) as f64 * v2) / dof;
    if pooled <= 0.0 {
        return Err(AnalysisError::degenerate(
            "t-test groups have zero pooled variance",
        ));
    }
    let statistic = (m1 - m2) / (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    Ok(TTest {
        statistic,
        p_value: student_t_two_sided_p(statistic, dof)?,
        degrees_of_freedom: dof,
    })
}

pub fn trait_t_tests(a: &ProfileSample, b: &ProfileSample) -> Result<Vec<TraitTest>> {
    Trait::ALL
        .iter()
        .map(|&trait_| {
            let left = a.column(trait_);
            let right = b.column(trait_);
            Ok(TraitTest {
                trait_,
                mean_a: mean_and_variance(&left).0,
                mean_b: mean_and_variance(&right).0,
                test: student_t_test(&left, &right)?,
            })
        })
        .collect()
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = if values.len() > 1 {
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    (mean, variance)
}
