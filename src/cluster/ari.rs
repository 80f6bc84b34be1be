use std::collections::HashMap;

use crate::error::{AnalysisError, Result};

/// Adjusted Rand Index between two labelings of the same items.
///
/// Computed from the pair confusion matrix, so any relabeling of either
/// partition leaves the score unchanged.
pub fn adjusted_rand_index(truth: &[usize], predicted: &[usize]) -> Result<f64> {
    if truth.len() != predicted.len() {
        return Err(AnalysisError::invalid(format!(
            "label lengths differ: {} true vs {} predicted",
            truth.len(),
            predicted.len()
        )));
    }
    let n = truth.len() as f64;

    let mut contingency: HashMap<(usize, usize), f64> = HashMap::new();
    let mut row_sums: HashMap<usize, f64> = HashMap::new();
    let mut col_sums: HashMap<usize, f64> = HashMap::new();
    for (&t, &p) in truth.iter().zip(predicted) {
        *contingency.entry((t, p)).or_default() += 1.0;
        *row_sums.entry(t).or_default() += 1.0;
        *col_sums.entry(p).or_default() += 1.0;
    }
    let sum_nij = sum_of_squares(contingency.values());
    let sum_a = sum_of_squares(row_sums.values());
    let sum_b = sum_of_squares(col_sums.values());

    let tp = sum_nij - n;
    let fp = sum_b - sum_nij;
    let fn_ = sum_a - sum_nij;
    let tn = n * n - fp - fn_ - sum_nij;

    if fn_ == 0.0 && fp == 0.0 {
        return Ok(1.0);
    }
    Ok(2.0 * (tp * tn - fn_ * fp) / ((tp + fn_) * (fn_ + tn) + (tp + fp) * (fp + tn)))
}

fn sum_of_squares<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.map(|v| v * v).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_match_under_relabeling() {
        let truth = [0, 0, 1, 1, 2, 2];
        let relabeled = [2, 2, 0, 0, 1, 1];
        assert_eq!(adjusted_rand_index(&truth, &relabeled).expect("ari"), 1.0);
    }

    #[test]
    fn matches_reference_value() {
        let ari = adjusted_rand_index(&[0, 0, 1, 1], &[0, 0, 1, 2]).expect("ari");
        assert!((ari - 0.571_428_571_428_571_4).abs() < 1e-12);
        let ari = adjusted_rand_index(&[0, 0, 0, 1, 1, 1], &[0, 0, 1, 1, 2, 2]).expect("ari");
        assert!((ari - 0.242_424_242_424_242_4).abs() < 1e-12);
    }

    #[test]
    fn disagreement_can_be_negative() {
        let ari = adjusted_rand_index(&[0, 0, 1, 1], &[0, 1, 0, 1]).expect("ari");
        assert!(ari < 0.0);
    }

    #[test]
    fn single_cluster_both_sides_is_perfect() {
        assert_eq!(adjusted_rand_index(&[3, 3, 3], &[0, 0, 0]).expect("ari"), 1.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(adjusted_rand_index(&[0, 1], &[0]).is_err());
    }
}
