//! Binary classification metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::artifact::ClassificationMetricArtifact;
use crate::config::constants::POSITIVE_LABEL;

/// Confusion counts for the positive label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut matrix = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            let actual = (t - POSITIVE_LABEL).abs() < 0.5;
            let predicted = (p - POSITIVE_LABEL).abs() < 0.5;
            match (actual, predicted) {
                (true, true) => matrix.true_positive += 1,
                (false, true) => matrix.false_positive += 1,
                (true, false) => matrix.false_negative += 1,
                (false, false) => matrix.true_negative += 1,
            }
        }
        matrix
    }

    /// `[[tn, fp], [fn, tp]]`, rows are actual classes
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Precision, recall and F1 for label 1; an empty denominator scores 0
pub fn precision_recall_f1(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (f64, f64, f64) {
    let cm = ConfusionMatrix::compute(y_true, y_pred);
    let tp = cm.true_positive as f64;
    let precision = if cm.true_positive + cm.false_positive > 0 {
        tp / (cm.true_positive + cm.false_positive) as f64
    } else {
        0.0
    };
    let recall = if cm.true_positive + cm.false_negative > 0 {
        tp / (cm.true_positive + cm.false_negative) as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

pub fn f1_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    precision_recall_f1(y_true, y_pred).2
}

impl ClassificationMetricArtifact {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let (precision_score, recall_score, f1_score) = precision_recall_f1(y_true, y_pred);
        Self {
            f1_score,
            precision_score,
            recall_score,
            accuracy: accuracy_score(y_true, y_pred),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let metrics = ClassificationMetricArtifact::compute(&y_true, &y_pred);
        assert!((metrics.accuracy - 0.75).abs() < 1e-12);
        assert!((metrics.precision_score - 0.75).abs() < 1e-12);
        assert!((metrics.recall_score - 0.75).abs() < 1e-12);
        assert!((metrics.f1_score - 0.75).abs() < 1e-12);

        let cm = ConfusionMatrix::compute(&y_true, &y_pred);
        assert_eq!(cm.as_rows(), [[3, 1], [1, 3]]);
    }

    #[test]
    fn test_zero_division_scores_zero() {
        let y_true = array![0.0, 0.0];
        let y_pred = array![0.0, 0.0];
        let (p, r, f1) = precision_recall_f1(&y_true, &y_pred);
        assert_eq!((p, r, f1), (0.0, 0.0, 0.0));
        assert_eq!(accuracy_score(&y_true, &y_pred), 1.0);
    }
}
