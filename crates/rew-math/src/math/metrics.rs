//! Binary classification metrics.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Area under the ROC curve via the rank-sum (Mann–Whitney) statistic.
///
/// Tied scores receive their average rank. Returns `None` when either class
/// is absent or the inputs disagree in length.
pub fn roc_auc(y_true: &Array1<u8>, scores: &Array1<f64>) -> Option<f64> {
    if y_true.len() != scores.len() || y_true.is_empty() {
        return None;
    }
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; ties share the mean of their positions.
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|&(&y, _)| y == 1)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

/// Per-class metrics plus accuracy for a 0/1 classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryClassificationReport {
    pub negative: ClassMetrics,
    pub positive: ClassMetrics,
    pub accuracy: f64,
    pub macro_f1: f64,
}

impl BinaryClassificationReport {
    /// Build from true labels and hard predictions (both 0/1).
    pub fn from_predictions(y_true: &Array1<u8>, y_pred: &Array1<u8>) -> Self {
        let (mut tp, mut tn, mut fp, mut fn_) = (0usize, 0usize, 0usize, 0usize);
        for (&y, &p) in y_true.iter().zip(y_pred.iter()) {
            match (y, p) {
                (1, 1) => tp += 1,
                (0, 0) => tn += 1,
                (0, _) => fp += 1,
                _ => fn_ += 1,
            }
        }
        let positive = ClassMetrics::from_counts(tp, fp, fn_);
        let negative = ClassMetrics::from_counts(tn, fn_, fp);
        let total = tp + tn + fp + fn_;
        let accuracy = if total == 0 {
            0.0
        } else {
            (tp + tn) as f64 / total as f64
        };
        Self {
            negative,
            positive,
            accuracy,
            macro_f1: (negative.f1 + positive.f1) / 2.0,
        }
    }
}

impl std::fmt::Display for BinaryClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:>10} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for (name, m) in [("0", &self.negative), ("1", &self.positive)] {
            writeln!(
                f,
                "{:>10} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        write!(
            f,
            "{:>10} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.negative.support + self.positive.support
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn auc_perfect_separation() {
        let auc = roc_auc(&array![0, 0, 1, 1], &array![0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_eq!(auc, 1.0);
    }

    #[test]
    fn auc_inverted() {
        let auc = roc_auc(&array![1, 1, 0, 0], &array![0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_eq!(auc, 0.0);
    }

    #[test]
    fn auc_all_ties_is_half() {
        let auc = roc_auc(&array![0, 1, 0, 1], &array![0.5, 0.5, 0.5, 0.5]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auc_known_value() {
        // pairs (pos, neg): (0.35 vs 0.1 ✓, 0.35 vs 0.4 ✗, 0.8 vs both ✓) = 3/4
        let auc = roc_auc(&array![0, 0, 1, 1], &array![0.1, 0.4, 0.35, 0.8]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn auc_single_class_is_none() {
        assert!(roc_auc(&array![1, 1], &array![0.2, 0.3]).is_none());
        assert!(roc_auc(&Array1::zeros(0), &Array1::zeros(0)).is_none());
        assert!(roc_auc(&array![0, 1], &array![0.2]).is_none());
    }

    #[test]
    fn report_counts() {
        let report = BinaryClassificationReport::from_predictions(&array![1, 1, 0, 0], &array![1, 0, 0, 1]);
        assert_eq!(report.accuracy, 0.5);
        assert_eq!(report.positive.precision, 0.5);
        assert_eq!(report.positive.recall, 0.5);
        assert_eq!(report.positive.support, 2);
        assert_eq!(report.negative.support, 2);
    }

    #[test]
    fn report_handles_no_positive_predictions() {
        let report = BinaryClassificationReport::from_predictions(&array![1, 0], &array![0, 0]);
        assert_eq!(report.positive.precision, 0.0);
        assert_eq!(report.positive.f1, 0.0);
        assert!(report.to_string().contains("accuracy"));
    }
}
