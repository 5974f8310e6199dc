//! Stacking ensemble method

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChurnError, Result};
use crate::training::cross_validation::StratifiedKFold;
use crate::training::{check_fit_inputs, Classifier, Estimator, LogisticRegression};

/// Configuration for stacking ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingConfig {
    /// Number of stratified folds used to build the meta-features
    pub n_folds: usize,
    /// Whether to append the original features to the meta-features
    pub passthrough: bool,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            passthrough: false,
        }
    }
}

/// Stacking classifier.
///
/// Meta-features are the out-of-fold positive-class probabilities of every
/// base estimator. After the meta-learner is trained on them, each base
/// estimator is refit on the full training set and those refits serve
/// predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingClassifier {
    config: StackingConfig,
    estimators: Vec<(String, Estimator)>,
    final_estimator: LogisticRegression,
    fitted: bool,
}

impl StackingClassifier {
    pub fn new(estimators: Vec<(String, Estimator)>) -> Self {
        Self {
            config: StackingConfig::default(),
            estimators,
            final_estimator: LogisticRegression::new(),
            fitted: false,
        }
    }

    pub fn with_config(mut self, config: StackingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn estimator_names(&self) -> Vec<&str> {
        self.estimators.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn final_estimator(&self) -> &LogisticRegression {
        &self.final_estimator
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn with_passthrough(&self, meta: Array2<f64>, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.config.passthrough {
            Ok(ndarray::concatenate(Axis(1), &[meta.view(), x.view()])?)
        } else {
            Ok(meta)
        }
    }
}

impl Classifier for StackingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_inputs(x, y)?;
        if self.estimators.is_empty() {
            return Err(ChurnError::ConfigError(
                "stacking needs at least one base estimator".to_string(),
            ));
        }

        let splits = StratifiedKFold::new(self.config.n_folds).split(y)?;
        let n_samples = x.nrows();

        // One column of out-of-fold probabilities per base estimator
        let columns: Vec<Array1<f64>> = self
            .estimators
            .par_iter()
            .map(|(name, estimator)| {
                let mut column = Array1::<f64>::zeros(n_samples);
                for split in &splits {
                    let mut model = estimator.clone();
                    model.fit(
                        &x.select(Axis(0), &split.train_indices),
                        &y.select(Axis(0), &split.train_indices),
                    )?;
                    let proba = model.predict_proba(&x.select(Axis(0), &split.test_indices))?;
                    for (local, &global) in split.test_indices.iter().enumerate() {
                        column[global] = proba[local];
                    }
                }
                debug!(estimator = %name, "Out-of-fold predictions computed");
                Ok(column)
            })
            .collect::<Result<_>>()?;

        let mut meta_features = Array2::<f64>::zeros((n_samples, columns.len()));
        for (j, column) in columns.iter().enumerate() {
            meta_features.column_mut(j).assign(column);
        }
        let meta_features = self.with_passthrough(meta_features, x)?;
        self.final_estimator.fit(&meta_features, y)?;

        self.estimators
            .par_iter_mut()
            .map(|(_, estimator)| estimator.fit(x, y))
            .collect::<Result<Vec<()>>>()?;

        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        let mut meta_features = Array2::<f64>::zeros((x.nrows(), self.estimators.len()));
        for (j, (_, estimator)) in self.estimators.iter().enumerate() {
            meta_features.column_mut(j).assign(&estimator.predict_proba(x)?);
        }
        let meta_features = self.with_passthrough(meta_features, x)?;
        self.final_estimator.predict_proba(&meta_features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{DecisionTree, GaussianNB, KNeighborsClassifier};

    fn blobs() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| {
            let base = if i < 15 { 0.0 } else { 4.0 };
            base + ((i * 7 + j * 3) % 10) as f64 / 10.0
        });
        let y: Array1<f64> = (0..30).map(|i| if i < 15 { 0.0 } else { 1.0 }).collect();
        (x, y)
    }

    fn stack() -> StackingClassifier {
        StackingClassifier::new(vec![
            ("tree".to_string(), Estimator::DecisionTree(DecisionTree::new_classifier())),
            ("nb".to_string(), Estimator::GaussianNB(GaussianNB::new())),
            (
                "knn".to_string(),
                Estimator::KNeighbors(KNeighborsClassifier::new().with_n_neighbors(3)),
            ),
        ])
    }

    #[test]
    fn test_stacking_fits_blobs() {
        let (x, y) = blobs();
        let mut model = stack();
        model.fit(&x, &y).unwrap();

        assert!(model.is_fitted());
        assert_eq!(model.estimator_names(), vec!["tree", "nb", "knn"]);
        assert_eq!(model.predict(&x).unwrap(), y);
        assert_eq!(model.final_estimator().coefficients().unwrap().len(), 3);
    }

    #[test]
    fn test_passthrough_widens_meta_features() {
        let (x, y) = blobs();
        let mut model = stack().with_config(StackingConfig {
            n_folds: 3,
            passthrough: true,
        });
        model.fit(&x, &y).unwrap();
        assert_eq!(model.final_estimator().coefficients().unwrap().len(), 5);
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = blobs();
        assert!(matches!(stack().predict(&x), Err(ChurnError::ModelNotFitted)));
    }

    #[test]
    fn test_serialized_stack_predicts_identically() {
        let (x, y) = blobs();
        let mut model = stack();
        model.fit(&x, &y).unwrap();

        let bytes = bincode::serialize(&model).unwrap();
        let restored: StackingClassifier = bincode::deserialize(&bytes).unwrap();
        assert_eq!(
            model.predict_proba(&x).unwrap(),
            restored.predict_proba(&x).unwrap()
        );
    }
}
