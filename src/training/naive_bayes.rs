//! Gaussian naive Bayes

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{check_fit_inputs, Classifier};
use crate::error::{ChurnError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClassStats {
    log_prior: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

/// Gaussian naive Bayes over the two classes {0, 1}.
///
/// `var_smoothing` is scaled by the largest feature variance and added to
/// every per-class variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNB {
    pub var_smoothing: f64,
    /// Index 0 is class 0, index 1 is class 1; `None` when absent from training
    classes: Vec<Option<ClassStats>>,
    n_features: usize,
}

impl Default for GaussianNB {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNB {
    pub fn new() -> Self {
        Self {
            var_smoothing: 1e-9,
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    fn log_likelihood(stats: &ClassStats, row: ndarray::ArrayView1<f64>) -> f64 {
        let mut total = stats.log_prior;
        for ((&x, &mean), &var) in row.iter().zip(&stats.means).zip(&stats.variances) {
            total -= 0.5 * (2.0 * std::f64::consts::PI * var).ln();
            total -= (x - mean).powi(2) / (2.0 * var);
        }
        total
    }
}

impl Classifier for GaussianNB {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_inputs(x, y)?;
        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();

        let max_variance = x
            .columns()
            .into_iter()
            .map(|col| {
                let mean = col.mean().unwrap_or(0.0);
                col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n_samples
            })
            .fold(0.0, f64::max);
        let epsilon = self.var_smoothing * max_variance.max(f64::MIN_POSITIVE);

        self.classes = [0.0, 1.0]
            .iter()
            .map(|&label| {
                let rows: Vec<usize> = y
                    .iter()
                    .enumerate()
                    .filter(|(_, &v)| v == label)
                    .map(|(i, _)| i)
                    .collect();
                if rows.is_empty() {
                    return None;
                }

                // Welford mean/variance per feature
                let mut means = vec![0.0; n_features];
                let mut m2 = vec![0.0; n_features];
                for (count, &row) in rows.iter().enumerate() {
                    let count = (count + 1) as f64;
                    for j in 0..n_features {
                        let value = x[[row, j]];
                        let delta = value - means[j];
                        means[j] += delta / count;
                        m2[j] += delta * (value - means[j]);
                    }
                }
                let n_class = rows.len() as f64;
                Some(ClassStats {
                    log_prior: (n_class / n_samples).ln(),
                    means,
                    variances: m2.into_iter().map(|v| v / n_class + epsilon).collect(),
                })
            })
            .collect();
        self.n_features = n_features;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.classes.is_empty() {
            return Err(ChurnError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| match (&self.classes[0], &self.classes[1]) {
                (Some(neg), Some(pos)) => {
                    let a = Self::log_likelihood(neg, row);
                    let b = Self::log_likelihood(pos, row);
                    // log-sum-exp
                    let max = a.max(b);
                    let norm = max + ((a - max).exp() + (b - max).exp()).ln();
                    (b - norm).exp()
                }
                (None, Some(_)) => 1.0,
                _ => 0.0,
            })
            .collect())
    }
}
