//! End-to-end training run

use std::sync::Arc;

use tracing::info;

use crate::artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact,
};
use crate::cloud::ModelStorage;
use crate::components::{
    DataIngestion, DataSource, DataTransformation, DataValidation, ModelEvaluation, ModelPusher,
    ModelTrainer,
};
use crate::config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelEvaluationConfig,
    ModelPusherConfig, ModelTrainerConfig, PipelineConfig, SchemaConfig, TrainingPipelineConfig,
};
use crate::error::Result;
use crate::utils::blocking;

/// Artifacts of a finished run. `pusher` is `None` when the deployed model
/// was kept.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub trainer: ModelTrainerArtifact,
    pub evaluation: ModelEvaluationArtifact,
    pub pusher: Option<ModelPusherArtifact>,
}

pub struct TrainingPipeline {
    run: TrainingPipelineConfig,
    source: DataSource,
    storage: Arc<dyn ModelStorage>,
}

impl TrainingPipeline {
    /// A new run rooted at a fresh timestamped artifact directory
    pub fn new(settings: PipelineConfig, source: DataSource, storage: Arc<dyn ModelStorage>) -> Self {
        Self::with_run_config(TrainingPipelineConfig::new(settings), source, storage)
    }

    pub fn with_run_config(
        run: TrainingPipelineConfig,
        source: DataSource,
        storage: Arc<dyn ModelStorage>,
    ) -> Self {
        Self {
            run,
            source,
            storage,
        }
    }

    pub fn run_config(&self) -> &TrainingPipelineConfig {
        &self.run
    }

    pub async fn start_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        info!("Entered the start_data_ingestion method of TrainingPipeline");
        DataIngestion::new(DataIngestionConfig::new(&self.run), self.source.clone())
            .initiate_data_ingestion()
            .await
    }

    pub async fn start_data_validation(
        &self,
        ingestion: DataIngestionArtifact,
        schema: SchemaConfig,
    ) -> Result<DataValidationArtifact> {
        info!("Entered the start_data_validation method of TrainingPipeline");
        let config = DataValidationConfig::new(&self.run);
        blocking("validation", move || {
            DataValidation::new(ingestion, config, schema).initiate_data_validation()
        })
        .await
    }

    pub async fn start_data_transformation(
        &self,
        ingestion: DataIngestionArtifact,
        validation: DataValidationArtifact,
        schema: SchemaConfig,
    ) -> Result<DataTransformationArtifact> {
        info!("Entered the start_data_transformation method of TrainingPipeline");
        let config = DataTransformationConfig::new(&self.run);
        blocking("transformation", move || {
            DataTransformation::new(ingestion, validation, config, schema)
                .initiate_data_transformation()
        })
        .await
    }

    pub async fn start_model_trainer(
        &self,
        transformation: DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact> {
        info!("Entered the start_model_trainer method of TrainingPipeline");
        let config = ModelTrainerConfig::new(&self.run);
        blocking("training", move || {
            ModelTrainer::new(transformation, config).initiate_model_trainer()
        })
        .await
    }

    pub async fn start_model_evaluation(
        &self,
        ingestion: DataIngestionArtifact,
        trainer: ModelTrainerArtifact,
    ) -> Result<ModelEvaluationArtifact> {
        info!("Entered the start_model_evaluation method of TrainingPipeline");
        ModelEvaluation::new(
            ModelEvaluationConfig::new(&self.run),
            ingestion,
            trainer,
            Arc::clone(&self.storage),
        )
        .initiate_model_evaluation()
        .await
    }

    pub async fn start_model_pusher(
        &self,
        evaluation: ModelEvaluationArtifact,
    ) -> Result<ModelPusherArtifact> {
        info!("Entered the start_model_pusher method of TrainingPipeline");
        ModelPusher::new(evaluation, ModelPusherConfig::new(&self.run), Arc::clone(&self.storage))
            .initiate_model_pusher()
            .await
    }

    /// Every stage in order; the pusher runs only for an accepted model
    pub async fn run_pipeline(&self) -> Result<PipelineRun> {
        self.run.settings.validate()?;
        let schema = SchemaConfig::from_yaml_file(&self.run.settings.schema_file)?;
        info!(run_dir = %self.run.artifact_dir.display(), "Starting training pipeline");

        let ingestion = self.start_data_ingestion().await?;
        let validation = self
            .start_data_validation(ingestion.clone(), schema.clone())
            .await?;
        let transformation = self
            .start_data_transformation(ingestion.clone(), validation, schema)
            .await?;
        let trainer = self.start_model_trainer(transformation).await?;
        let evaluation = self
            .start_model_evaluation(ingestion, trainer.clone())
            .await?;

        let pusher = if evaluation.is_model_accepted {
            Some(self.start_model_pusher(evaluation.clone()).await?)
        } else {
            info!("Trained model is not better than the deployed model, deployed model kept");
            None
        };

        info!("Training pipeline finished");
        Ok(PipelineRun {
            trainer,
            evaluation,
            pusher,
        })
    }
}
