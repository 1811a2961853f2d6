//! Quality metrics comparing anomaly scores against ground-truth labels
//!
//! The engine only depends on the [`Metric`] trait; [`RocAuc`] is the bundled
//! implementation so a benchmark is runnable end to end.

use std::cmp::Ordering;

use crate::error::DriftError;

/// Scalar quality metric over (scores, labels)
///
/// Implementations must be deterministic and return a value in `[0, 1]`.
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;

    /// Score one evaluation; labels are binary ground truth (0 = normal,
    /// 1 = anomaly). Fails with a shape mismatch when lengths differ.
    fn evaluate(&self, scores: &[f64], labels: &[f64]) -> Result<f64, DriftError>;
}

/// Threshold-independent ROC/AUC, rank-based with average ranks for ties
#[derive(Debug, Clone, Copy, Default)]
pub struct RocAuc;

impl Metric for RocAuc {
    fn name(&self) -> &str {
        "roc_auc"
    }

    fn evaluate(&self, scores: &[f64], labels: &[f64]) -> Result<f64, DriftError> {
        if scores.len() != labels.len() {
            return Err(DriftError::ShapeMismatch {
                scores: scores.len(),
                labels: labels.len(),
            });
        }

        let n = scores.len();
        let n_pos = labels.iter().filter(|&&label| label > 0.5).count();
        let n_neg = n - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Err(DriftError::Execution(
                "ROC/AUC needs both an anomalous and a normal class in the labels".to_string(),
            ));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

        // Average ranks over tied score groups (1-based)
        let mut ranks = vec![0.0_f64; n];
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
                j += 1;
            }
            let rank = (i + j) as f64 / 2.0 + 1.0;
            for &idx in &order[i..=j] {
                ranks[idx] = rank;
            }
            i = j + 1;
        }

        let positive_rank_sum: f64 = labels
            .iter()
            .zip(&ranks)
            .filter(|(&label, _)| label > 0.5)
            .map(|(_, &rank)| rank)
            .sum();

        let n_pos = n_pos as f64;
        let n_neg = n_neg as f64;
        Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
    }
}
