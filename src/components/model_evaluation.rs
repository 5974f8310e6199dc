//! Comparison of the freshly trained bundle against the deployed one

use std::sync::Arc;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::{DataIngestionArtifact, ModelEvaluationArtifact, ModelTrainerArtifact};
use crate::cloud::ModelStorage;
use crate::components::data_transformation::clean_raw_frame;
use crate::config::constants::TARGET_COLUMN;
use crate::config::ModelEvaluationConfig;
use crate::error::Result;
use crate::model::{ChurnEstimator, ChurnModel};
use crate::training::f1_score;
use crate::utils::{blocking, column_as_strings, read_csv};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluateModelResponse {
    pub trained_model_f1_score: f64,
    pub best_model_f1_score: Option<f64>,
    pub is_model_accepted: bool,
    pub difference: f64,
}

impl EvaluateModelResponse {
    /// The trained model is accepted only when it strictly beats the deployed
    /// score; a missing deployment scores 0.
    pub fn compare(trained_model_f1_score: f64, best_model_f1_score: Option<f64>) -> Self {
        let baseline = best_model_f1_score.unwrap_or(0.0);
        Self {
            trained_model_f1_score,
            best_model_f1_score,
            is_model_accepted: trained_model_f1_score > baseline,
            difference: trained_model_f1_score - baseline,
        }
    }
}

pub struct ModelEvaluation {
    config: ModelEvaluationConfig,
    ingestion: DataIngestionArtifact,
    trainer: ModelTrainerArtifact,
    storage: Arc<dyn ModelStorage>,
}

impl ModelEvaluation {
    pub fn new(
        config: ModelEvaluationConfig,
        ingestion: DataIngestionArtifact,
        trainer: ModelTrainerArtifact,
        storage: Arc<dyn ModelStorage>,
    ) -> Self {
        Self {
            config,
            ingestion,
            trainer,
            storage,
        }
    }

    /// Handle on the deployed bundle, if one exists
    pub async fn get_best_model(&self) -> Result<Option<ChurnEstimator>> {
        let estimator = ChurnEstimator::new(
            Arc::clone(&self.storage),
            self.config.bucket_name.clone(),
            self.config.s3_model_key_path.clone(),
        );
        if estimator.is_model_present().await? {
            Ok(Some(estimator))
        } else {
            Ok(None)
        }
    }

    pub async fn evaluate_model(&self) -> Result<EvaluateModelResponse> {
        let deployed = match self.get_best_model().await? {
            Some(estimator) => Some(estimator.load_model().await?),
            None => None,
        };

        let test_file_path = self.ingestion.test_file_path.clone();
        let best_model_f1_score = blocking("evaluation", move || {
            let raw = read_csv(&test_file_path)?;
            log_missing_cells(&raw)?;
            deployed
                .map(|model| deployed_f1_score(&model, &raw))
                .transpose()
        })
        .await?;
        if best_model_f1_score.is_none() {
            info!("No deployed model found");
        }

        let trained_model_f1_score = self.trainer.metric_artifact.f1_score;
        let response = EvaluateModelResponse::compare(trained_model_f1_score, best_model_f1_score);
        info!(?response, "Model evaluation result");
        Ok(response)
    }

    pub async fn initiate_model_evaluation(&self) -> Result<ModelEvaluationArtifact> {
        let response = self.evaluate_model().await?;
        let artifact = ModelEvaluationArtifact {
            is_model_accepted: response.is_model_accepted,
            changed_accuracy: response.difference,
            s3_model_path: self.config.s3_model_key_path.clone(),
            trained_model_path: self.trainer.trained_model_file_path.clone(),
        };
        info!(
            ?artifact,
            changed_threshold_score = self.config.changed_threshold_score,
            "Model evaluation artifact"
        );
        Ok(artifact)
    }
}

/// F1 of the deployed bundle on the raw test rows
fn deployed_f1_score(model: &ChurnModel, raw: &DataFrame) -> Result<f64> {
    let test_df = clean_raw_frame(raw)?;
    let labels = column_as_strings(&test_df, TARGET_COLUMN)?;
    let y_true = model.label_encoder().transform(&labels)?;
    let y_pred = model.predict(&test_df.drop(TARGET_COLUMN)?)?;
    Ok(f1_score(&y_true, &y_pred))
}

fn log_missing_cells(df: &DataFrame) -> Result<()> {
    for column in df.get_columns() {
        let nulls = column.null_count();
        let blanks = if column.dtype() == &DataType::String {
            column
                .as_materialized_series()
                .str()?
                .into_iter()
                .filter(|v| matches!(v, Some(s) if s.trim().is_empty()))
                .count()
        } else {
            0
        };
        debug!(column = %column.name(), nulls, blanks, "Missing cells in test data");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_better_model_is_accepted() {
        let response = EvaluateModelResponse::compare(0.75, Some(0.70));
        assert!(response.is_model_accepted);
        assert!((response.difference - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_equal_score_is_rejected() {
        let response = EvaluateModelResponse::compare(0.7, Some(0.7));
        assert!(!response.is_model_accepted);
        assert_eq!(response.difference, 0.0);
    }

    #[test]
    fn test_no_deployment_scores_zero() {
        let response = EvaluateModelResponse::compare(0.42, None);
        assert!(response.is_model_accepted);
        assert_eq!(response.difference, 0.42);
        assert_eq!(response.best_model_f1_score, None);
    }
}
