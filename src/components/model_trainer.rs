//! Model selection, tuning and stacking

use ndarray::{Array1, Array2};
use tracing::{debug, info};

use crate::artifact::{ClassificationMetricArtifact, DataTransformationArtifact, ModelTrainerArtifact};
use crate::components::data_transformation::split_target;
use crate::config::ModelTrainerConfig;
use crate::ensemble::{StackingClassifier, StackingConfig};
use crate::error::{ChurnError, Result};
use crate::model::ChurnModel;
use crate::preprocessing::PreprocessingObject;
use crate::training::cross_validation::mean_score;
use crate::training::metrics::{accuracy_score, ConfusionMatrix};
use crate::training::{cross_val_score, Classifier, GridSearchCV, ModelRegistry, StratifiedKFold};
use crate::utils::{load_array, load_object};

/// Outcome of tuning and stacking the selected models
#[derive(Debug, Clone)]
pub struct TrainedEnsemble {
    pub accuracy: f64,
    pub model: StackingClassifier,
    pub metrics: ClassificationMetricArtifact,
}

pub struct ModelTrainer {
    transformation: DataTransformationArtifact,
    config: ModelTrainerConfig,
}

impl ModelTrainer {
    pub fn new(transformation: DataTransformationArtifact, config: ModelTrainerConfig) -> Self {
        Self {
            transformation,
            config,
        }
    }

    fn cv(&self) -> StratifiedKFold {
        StratifiedKFold::new(self.config.cv_folds)
    }

    /// Mean CV accuracy of every registry model with its fixed params,
    /// best first. Equal scores keep registry order.
    pub fn get_top_models(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        registry: &ModelRegistry,
    ) -> Result<Vec<(String, f64)>> {
        let cv = self.cv();
        let mut scored = Vec::with_capacity(registry.len());
        for (name, entry) in registry.iter() {
            let estimator = entry.build_default()?;
            let score = mean_score(&cross_val_score(&estimator, x, y, &cv)?);
            debug!(model = %name, score, "Cross-validated");
            scored.push((name.clone(), score));
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.config.top_k_models);
        info!(top = ?scored, "Selected top models");
        Ok(scored)
    }

    /// Tune the selected models, stack them and score the stack on the test split
    pub fn get_evoluted_model_object_and_report(
        &self,
        x_train: &Array2<f64>,
        x_test: &Array2<f64>,
        y_train: &Array1<f64>,
        y_test: &Array1<f64>,
        registry: &ModelRegistry,
        top: &[(String, f64)],
    ) -> Result<TrainedEnsemble> {
        if top.is_empty() {
            return Err(ChurnError::ConfigError("no models selected for stacking".to_string()));
        }

        let mut estimators = Vec::with_capacity(top.len());
        for (name, entry) in registry.iter() {
            if !top.iter().any(|(selected, _)| selected == name) {
                continue;
            }
            let estimator = if entry.has_grid() {
                info!(model = %name, "Tuning hyper-parameters");
                let result = GridSearchCV::new(entry.kind()?, entry.candidates())
                    .with_cv(self.cv())
                    .fit(x_train, y_train)?;
                info!(
                    model = %name,
                    best_score = result.best_score,
                    best_params = ?result.best_params,
                    "Best hyper-parameters"
                );
                result.best_estimator
            } else {
                let mut estimator = entry.build_default()?;
                estimator.fit(x_train, y_train)?;
                estimator
            };
            estimators.push((name.clone(), estimator));
        }

        let mut model = StackingClassifier::new(estimators).with_config(StackingConfig {
            n_folds: self.config.cv_folds,
            passthrough: false,
        });
        model.fit(x_train, y_train)?;

        let y_pred = model.predict(x_test)?;
        let accuracy = accuracy_score(y_test, &y_pred);
        let confusion = ConfusionMatrix::compute(y_test, &y_pred);
        let metrics = ClassificationMetricArtifact::compute(y_test, &y_pred);
        info!(
            estimators = ?model.estimator_names(),
            accuracy,
            confusion_matrix = ?confusion.as_rows(),
            "Stacking classifier evaluated"
        );

        Ok(TrainedEnsemble {
            accuracy,
            model,
            metrics,
        })
    }

    pub fn initiate_model_trainer(&self) -> Result<ModelTrainerArtifact> {
        info!("Starting model trainer");
        let (x_train, y_train) = split_target(&load_array(&self.transformation.transformed_train_file_path)?)?;
        let (x_test, y_test) = split_target(&load_array(&self.transformation.transformed_test_file_path)?)?;
        let registry = ModelRegistry::from_yaml_file(&self.config.model_config_file_path)?;

        let top = self.get_top_models(&x_train, &y_train, &registry)?;
        let trained = self.get_evoluted_model_object_and_report(
            &x_train, &x_test, &y_train, &y_test, &registry, &top,
        )?;

        if trained.accuracy < self.config.expected_accuracy {
            return Err(ChurnError::AccuracyBelowThreshold {
                actual: trained.accuracy,
                expected: self.config.expected_accuracy,
            });
        }

        let preprocessing: PreprocessingObject =
            load_object(&self.transformation.transformed_object_file_path)?;
        let bundle = ChurnModel::new(
            preprocessing.transformer,
            preprocessing.label_encoder,
            trained.model,
        );
        bundle.save(&self.config.trained_model_file_path)?;

        let artifact = ModelTrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            metric_artifact: trained.metrics,
        };
        info!(?artifact, "Model trainer artifact");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, TrainingPipelineConfig};
    use ndarray::Array;
    use tempfile::tempdir;

    const REGISTRY: &str = r#"
first_nb:
  class: GaussianNB
tree:
  class: DecisionTreeClassifier
  params:
    max_depth: [1, 3]
second_nb:
  class: GaussianNB
"#;

    fn trainer(root: &std::path::Path, top_k: usize) -> ModelTrainer {
        let settings = PipelineConfig::default().with_artifact_dir(root);
        let run = TrainingPipelineConfig::with_timestamp(settings, "run");
        let mut config = ModelTrainerConfig::new(&run);
        config.cv_folds = 3;
        config.top_k_models = top_k;
        ModelTrainer::new(
            DataTransformationArtifact {
                transformed_object_file_path: root.join("pre.bin"),
                transformed_train_file_path: root.join("train.bin"),
                transformed_test_file_path: root.join("test.bin"),
            },
            config,
        )
    }

    fn separable(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array::from_shape_fn((n, 2), |(i, j)| {
            let base = if i % 2 == 0 { -1.0 } else { 1.0 };
            base + (i as f64 * 0.01) + j as f64 * 0.1
        });
        let y = Array::from_shape_fn(n, |i| (i % 2) as f64);
        (x, y)
    }

    #[test]
    fn test_top_models_ties_keep_registry_order() {
        let dir = tempdir().unwrap();
        let registry = ModelRegistry::from_yaml_str(REGISTRY).unwrap();
        let (x, y) = separable(30);
        let top = trainer(dir.path(), 2).get_top_models(&x, &y, &registry).unwrap();
        assert_eq!(top.len(), 2);
        // all three separate the data perfectly
        assert_eq!(top[0].0, "first_nb");
        assert_eq!(top[1].0, "tree");
        assert!(top.iter().all(|(_, s)| (*s - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_stack_is_scored_on_test_split() {
        let dir = tempdir().unwrap();
        let registry = ModelRegistry::from_yaml_str(REGISTRY).unwrap();
        let (x, y) = separable(30);
        let t = trainer(dir.path(), 3);
        let top = t.get_top_models(&x, &y, &registry).unwrap();
        let trained = t
            .get_evoluted_model_object_and_report(&x, &x, &y, &y, &registry, &top)
            .unwrap();
        assert_eq!(trained.model.estimator_names(), vec!["first_nb", "tree", "second_nb"]);
        assert!((trained.accuracy - 1.0).abs() < 1e-12);
        assert!((trained.metrics.f1_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let dir = tempdir().unwrap();
        let registry = ModelRegistry::from_yaml_str(REGISTRY).unwrap();
        let (x, y) = separable(10);
        let result = trainer(dir.path(), 3).get_evoluted_model_object_and_report(
            &x, &x, &y, &y, &registry, &[],
        );
        assert!(matches!(result, Err(ChurnError::ConfigError(_))));
    }
}
