//! Binary classification metrics on 0/1 labels.
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

fn check_lengths(a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(RiskError::invalid_state(format!(
            "metric inputs differ in length: {} vs {}",
            a, b
        )));
    }
    if a == 0 {
        return Err(RiskError::invalid_state("metric inputs are empty"));
    }
    Ok(())
}

/// (true positives, false positives, false negatives, true negatives)
fn confusion(y_true: &[i32], y_pred: &[i32]) -> (f64, f64, f64, f64) {
    let mut c = (0.0, 0.0, 0.0, 0.0);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == 1, p == 1) {
            (true, true) => c.0 += 1.0,
            (false, true) => c.1 += 1.0,
            (true, false) => c.2 += 1.0,
            (false, false) => c.3 += 1.0,
        }
    }
    c
}

pub fn accuracy(y_true: &[i32], y_pred: &[i32]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(hits as f64 / y_true.len() as f64)
}

/// Fraction of positives predicted positive; 0 when there are no positives.
pub fn recall(y_true: &[i32], y_pred: &[i32]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let (tp, _, fn_, _) = confusion(y_true, y_pred);
    Ok(if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 })
}

/// 0 when nothing is predicted positive.
pub fn precision(y_true: &[i32], y_pred: &[i32]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let (tp, fp, _, _) = confusion(y_true, y_pred);
    Ok(if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 })
}

pub fn f1_score(y_true: &[i32], y_pred: &[i32]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let (tp, fp, fn_, _) = confusion(y_true, y_pred);
    let denom = 2.0 * tp + fp + fn_;
    Ok(if denom > 0.0 { 2.0 * tp / denom } else { 0.0 })
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share
/// their average rank. Needs both classes in `y_true`.
pub fn roc_auc_score(y_true: &[i32], y_score: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_score.len())?;
    let n_pos = y_true.iter().filter(|&&t| t == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(RiskError::invalid_state(
            "ROC AUC is undefined when only one class is present",
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        // ranks are 1-based: positions i..=j share (i + j) / 2 + 1
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            if y_true[k] == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Test-set metrics of one fitted pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
}

impl Metrics {
    /// Display names in table order.
    pub const NAMES: [&'static str; 4] = ["Accuracy", "Recall", "F1 Score", "ROC AUC"];

    pub fn values(&self) -> [f64; 4] {
        [self.accuracy, self.recall, self.f1, self.roc_auc]
    }

    /// `(display name, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        Self::NAMES.into_iter().zip(self.values())
    }

    /// Look up a metric by display name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Tracking name for a display name, e.g. "F1 Score" -> "test_f1_score".
pub fn tracking_name(display: &str) -> String {
    format!("test_{}", display.to_lowercase().replace(' ', "_"))
}

pub fn get_metrics(y_true: &[i32], y_pred: &[i32], y_prob: &[f64]) -> Result<Metrics> {
    Ok(Metrics {
        accuracy: accuracy(y_true, y_pred)?,
        recall: recall(y_true, y_pred)?,
        f1: f1_score(y_true, y_pred)?,
        roc_auc: roc_auc_score(y_true, y_prob)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confusion_based_scores() {
        let t = [1, 1, 1, 0, 0, 0];
        let p = [1, 1, 0, 1, 0, 0];
        assert!((accuracy(&t, &p).unwrap() - 4.0 / 6.0).abs() < 1e-12);
        assert!((recall(&t, &p).unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert!((precision(&t, &p).unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert!((f1_score(&t, &p).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn undefined_scores_are_zero() {
        assert_eq!(recall(&[0, 0], &[0, 1]).unwrap(), 0.0);
        assert_eq!(f1_score(&[0, 0], &[0, 0]).unwrap(), 0.0);
    }

    #[test]
    fn auc_handles_ties_and_perfect_ranking() {
        assert_eq!(roc_auc_score(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
        assert_eq!(roc_auc_score(&[0, 1], &[0.5, 0.5]).unwrap(), 0.5);
        // 0.4 ranks below the 0.5 negative; the other three pairs are ordered
        let auc = roc_auc_score(&[0, 1, 0, 1], &[0.5, 0.4, 0.1, 0.8]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
        assert!(roc_auc_score(&[1, 1], &[0.2, 0.3]).is_err());
    }

    #[test]
    fn metric_names() {
        let m = Metrics {
            accuracy: 0.9,
            recall: 0.8,
            f1: 0.7,
            roc_auc: 0.6,
        };
        assert_eq!(m.get("Recall"), Some(0.8));
        let names: Vec<String> = Metrics::NAMES.iter().map(|n| tracking_name(n)).collect();
        assert_eq!(
            names,
            ["test_accuracy", "test_recall", "test_f1_score", "test_roc_auc"]
        );
    }
}
