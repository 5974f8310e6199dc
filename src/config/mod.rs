//! Pipeline configuration
//!
//! [`PipelineConfig`] holds the process-wide settings (with env overrides),
//! [`TrainingPipelineConfig`] pins one timestamped run directory, and the
//! per-stage configs derive every artifact path from that run directory.

pub mod constants;
mod schema;

pub use schema::SchemaConfig;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ChurnError, Result};
use constants::*;

/// What the validation stage does when drift is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftPolicy {
    /// Drift is recorded in the message but does not fail validation
    #[default]
    Report,
    /// Drift fails validation and blocks the transformation stage
    Block,
}

impl FromStr for DriftPolicy {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(DriftPolicy::Report),
            "block" => Ok(DriftPolicy::Block),
            other => Err(ChurnError::invalid_parameter(
                "DRIFT_POLICY",
                other,
                "expected 'report' or 'block'",
            )),
        }
    }
}

impl DriftPolicy {
    /// Unset means the default; an unrecognised value warns and falls back to it
    pub fn from_env_value(value: Option<String>) -> Self {
        match value.as_deref().map(str::parse::<DriftPolicy>) {
            None => DriftPolicy::default(),
            Some(Ok(policy)) => policy,
            Some(Err(e)) => {
                warn!(error = %e, fallback = ?DriftPolicy::default(), "Ignoring DRIFT_POLICY");
                DriftPolicy::default()
            }
        }
    }
}

/// Process-wide pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipeline_name: String,
    pub artifact_dir: PathBuf,
    pub schema_file: PathBuf,
    pub model_config_file: PathBuf,
    pub database_name: String,
    pub collection_name: String,
    pub model_bucket: String,
    pub model_key: String,
    pub aws_region: String,
    pub train_test_split_ratio: f64,
    pub expected_accuracy: f64,
    pub changed_threshold_score: f64,
    pub drift_policy: DriftPolicy,
    pub cv_folds: usize,
    pub top_k_models: usize,
    pub random_state: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline_name: PIPELINE_NAME.to_string(),
            artifact_dir: std::env::var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(ARTIFACT_DIR)),
            schema_file: std::env::var("SCHEMA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(SCHEMA_FILE_PATH)),
            model_config_file: std::env::var("MODEL_CONFIG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(MODEL_CONFIG_FILE_PATH)),
            database_name: DATABASE_NAME.to_string(),
            collection_name: COLLECTION_NAME.to_string(),
            model_bucket: std::env::var("MODEL_BUCKET")
                .unwrap_or_else(|_| MODEL_BUCKET_NAME.to_string()),
            model_key: MODEL_PUSHER_S3_KEY.to_string(),
            aws_region: AWS_REGION.to_string(),
            train_test_split_ratio: DATA_INGESTION_TRAIN_TEST_SPLIT_RATIO,
            expected_accuracy: std::env::var("EXPECTED_ACCURACY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MODEL_TRAINER_EXPECTED_SCORE),
            changed_threshold_score: MODEL_EVALUATION_CHANGED_THRESHOLD_SCORE,
            drift_policy: DriftPolicy::from_env_value(std::env::var("DRIFT_POLICY").ok()),
            cv_folds: MODEL_TRAINER_CV_FOLDS,
            top_k_models: MODEL_TRAINER_TOP_K,
            random_state: RANDOM_STATE,
        }
    }
}

impl PipelineConfig {
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_file = path.into();
        self
    }

    pub fn with_model_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_config_file = path.into();
        self
    }

    pub fn with_expected_accuracy(mut self, accuracy: f64) -> Self {
        self.expected_accuracy = accuracy;
        self
    }

    pub fn with_drift_policy(mut self, policy: DriftPolicy) -> Self {
        self.drift_policy = policy;
        self
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.train_test_split_ratio) || self.train_test_split_ratio == 0.0 {
            return Err(ChurnError::invalid_parameter(
                "train_test_split_ratio",
                self.train_test_split_ratio,
                "must lie in (0, 1)",
            ));
        }
        if !(0.0..=1.0).contains(&self.expected_accuracy) {
            return Err(ChurnError::invalid_parameter(
                "expected_accuracy",
                self.expected_accuracy,
                "must lie in [0, 1]",
            ));
        }
        if self.cv_folds < 2 {
            return Err(ChurnError::invalid_parameter(
                "cv_folds",
                self.cv_folds,
                "at least two folds are required",
            ));
        }
        if self.top_k_models == 0 {
            return Err(ChurnError::invalid_parameter(
                "top_k_models",
                self.top_k_models,
                "must keep at least one model",
            ));
        }
        Ok(())
    }
}

/// One pipeline run, rooted at `artifact/<timestamp>/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPipelineConfig {
    pub settings: PipelineConfig,
    pub timestamp: String,
    pub artifact_dir: PathBuf,
}

impl TrainingPipelineConfig {
    pub fn new(settings: PipelineConfig) -> Self {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(settings, timestamp)
    }

    pub fn with_timestamp(settings: PipelineConfig, timestamp: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        let artifact_dir = settings.artifact_dir.join(&timestamp);
        Self {
            settings,
            timestamp,
            artifact_dir,
        }
    }

    fn stage_dir(&self, name: &str) -> PathBuf {
        self.artifact_dir.join(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIngestionConfig {
    pub data_ingestion_dir: PathBuf,
    pub feature_store_file_path: PathBuf,
    pub training_file_path: PathBuf,
    pub testing_file_path: PathBuf,
    pub train_test_split_ratio: f64,
    pub collection_name: String,
    pub database_name: String,
    pub random_state: u64,
}

impl DataIngestionConfig {
    pub fn new(run: &TrainingPipelineConfig) -> Self {
        let dir = run.stage_dir(DATA_INGESTION_DIR_NAME);
        Self {
            feature_store_file_path: dir.join(DATA_INGESTION_FEATURE_STORE_DIR).join(FILE_NAME),
            training_file_path: dir.join(DATA_INGESTION_INGESTED_DIR).join(TRAIN_FILE_NAME),
            testing_file_path: dir.join(DATA_INGESTION_INGESTED_DIR).join(TEST_FILE_NAME),
            data_ingestion_dir: dir,
            train_test_split_ratio: run.settings.train_test_split_ratio,
            collection_name: run.settings.collection_name.clone(),
            database_name: run.settings.database_name.clone(),
            random_state: run.settings.random_state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataValidationConfig {
    pub data_validation_dir: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub drift_policy: DriftPolicy,
    pub significance_level: f64,
}

impl DataValidationConfig {
    pub fn new(run: &TrainingPipelineConfig) -> Self {
        let dir = run.stage_dir(DATA_VALIDATION_DIR_NAME);
        Self {
            drift_report_file_path: dir
                .join(DATA_VALIDATION_DRIFT_REPORT_DIR)
                .join(DATA_VALIDATION_DRIFT_REPORT_FILE_NAME),
            data_validation_dir: dir,
            drift_policy: run.settings.drift_policy,
            significance_level: DRIFT_SIGNIFICANCE_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTransformationConfig {
    pub data_transformation_dir: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
    pub random_state: u64,
}

impl DataTransformationConfig {
    pub fn new(run: &TrainingPipelineConfig) -> Self {
        let dir = run.stage_dir(DATA_TRANSFORMATION_DIR_NAME);
        let data_dir = dir.join(DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR);
        Self {
            transformed_train_file_path: data_dir.join(TRAIN_ARRAY_FILE_NAME),
            transformed_test_file_path: data_dir.join(TEST_ARRAY_FILE_NAME),
            transformed_object_file_path: dir
                .join(DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR)
                .join(PREPROCESSING_OBJECT_FILE_NAME),
            data_transformation_dir: dir,
            random_state: run.settings.random_state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrainerConfig {
    pub model_trainer_dir: PathBuf,
    pub trained_model_file_path: PathBuf,
    pub expected_accuracy: f64,
    pub model_config_file_path: PathBuf,
    pub cv_folds: usize,
    pub top_k_models: usize,
    pub random_state: u64,
}

impl ModelTrainerConfig {
    pub fn new(run: &TrainingPipelineConfig) -> Self {
        let dir = run.stage_dir(MODEL_TRAINER_DIR_NAME);
        Self {
            trained_model_file_path: dir.join(MODEL_TRAINER_TRAINED_MODEL_DIR).join(MODEL_FILE_NAME),
            model_trainer_dir: dir,
            expected_accuracy: run.settings.expected_accuracy,
            model_config_file_path: run.settings.model_config_file.clone(),
            cv_folds: run.settings.cv_folds,
            top_k_models: run.settings.top_k_models,
            random_state: run.settings.random_state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluationConfig {
    pub changed_threshold_score: f64,
    pub bucket_name: String,
    pub s3_model_key_path: String,
}

impl ModelEvaluationConfig {
    pub fn new(run: &TrainingPipelineConfig) -> Self {
        Self {
            changed_threshold_score: run.settings.changed_threshold_score,
            bucket_name: run.settings.model_bucket.clone(),
            s3_model_key_path: run.settings.model_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPusherConfig {
    pub bucket_name: String,
    pub s3_model_key_path: String,
}

impl ModelPusherConfig {
    pub fn new(run: &TrainingPipelineConfig) -> Self {
        Self {
            bucket_name: run.settings.model_bucket.clone(),
            s3_model_key_path: run.settings.model_key.clone(),
        }
    }
}

/// Create the parent directory of `path` if it has one
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
