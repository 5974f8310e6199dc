//! Gradient boosted trees with binomial deviance loss

use ndarray::{Array1, Array2, Axis};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use super::{check_fit_inputs, Classifier};
use crate::error::{ChurnError, Result};

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Additive model of regression trees fitted to the negative gradient of
/// the log loss. The raw score starts at the training log-odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Fraction of rows drawn without replacement for each stage
    pub subsample: f64,
    pub random_state: Option<u64>,
    init_score: f64,
    stages: Vec<DecisionTree>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientBoostingClassifier {
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            subsample: 1.0,
            random_state: None,
            init_score: 0.0,
            stages: Vec::new(),
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_subsample(mut self, fraction: f64) -> Self {
        self.subsample = fraction;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut scores = Array1::from_elem(x.nrows(), self.init_score);
        for tree in &self.stages {
            scores = scores + self.learning_rate * tree.predict_values(x)?;
        }
        Ok(scores)
    }
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_inputs(x, y)?;
        if self.learning_rate <= 0.0 {
            return Err(ChurnError::invalid_parameter(
                "learning_rate",
                self.learning_rate,
                "must be positive",
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ChurnError::invalid_parameter(
                "subsample",
                self.subsample,
                "must be in (0, 1]",
            ));
        }

        let n_samples = x.nrows();
        let positive_rate = (y.sum() / n_samples as f64).clamp(1e-6, 1.0 - 1e-6);
        self.init_score = (positive_rate / (1.0 - positive_rate)).ln();
        self.stages.clear();

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let n_subsample = ((n_samples as f64 * self.subsample).round() as usize).clamp(1, n_samples);
        let mut scores = Array1::from_elem(n_samples, self.init_score);

        for _ in 0..self.n_estimators {
            let residuals = y - &scores.mapv(sigmoid);

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.max_depth)
                .with_min_samples_split(self.min_samples_split)
                .with_random_state(rng.gen());
            if n_subsample < n_samples {
                let mut rows = sample(&mut rng, n_samples, n_subsample).into_vec();
                rows.sort_unstable();
                let residual_rows: Array1<f64> = rows.iter().map(|&i| residuals[i]).collect();
                tree.fit_values(&x.select(Axis(0), &rows), &residual_rows)?;
            } else {
                tree.fit_values(x, &residuals)?;
            }

            scores = scores + self.learning_rate * tree.predict_values(x)?;
            self.stages.push(tree);
        }
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.stages.is_empty() && self.n_estimators > 0 {
            return Err(ChurnError::ModelNotFitted);
        }
        Ok(self.raw_scores(x)?.mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_boosting_fits_training_data() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [10.0], [11.0], [12.0], [13.0]];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let mut gb = GradientBoostingClassifier::new().with_n_estimators(20);
        gb.fit(&x, &y).unwrap();

        assert_eq!(gb.n_stages(), 20);
        assert_eq!(gb.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_initial_score_is_log_odds() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 1.0, 1.0];
        let mut gb = GradientBoostingClassifier::new().with_n_estimators(0);
        gb.fit(&x, &y).unwrap();
        let proba = gb.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (p - 0.75).abs() < 1e-9));
    }

    #[test]
    fn test_rejects_bad_subsample() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let mut gb = GradientBoostingClassifier::new().with_subsample(1.5);
        assert!(matches!(
            gb.fit(&x, &y),
            Err(ChurnError::InvalidParameter { .. })
        ));
    }
}
