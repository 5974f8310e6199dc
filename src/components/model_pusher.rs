//! Deployment of an accepted bundle to object storage

use std::sync::Arc;

use tracing::info;

use crate::artifact::{ModelEvaluationArtifact, ModelPusherArtifact};
use crate::cloud::ModelStorage;
use crate::config::ModelPusherConfig;
use crate::error::Result;
use crate::model::ChurnEstimator;

pub struct ModelPusher {
    evaluation: ModelEvaluationArtifact,
    config: ModelPusherConfig,
    estimator: ChurnEstimator,
}

impl ModelPusher {
    pub fn new(
        evaluation: ModelEvaluationArtifact,
        config: ModelPusherConfig,
        storage: Arc<dyn ModelStorage>,
    ) -> Self {
        let estimator = ChurnEstimator::new(
            storage,
            config.bucket_name.clone(),
            config.s3_model_key_path.clone(),
        );
        Self {
            evaluation,
            config,
            estimator,
        }
    }

    /// Upload the trained bundle, replacing the current deployment
    pub async fn initiate_model_pusher(&self) -> Result<ModelPusherArtifact> {
        info!(
            bucket = %self.config.bucket_name,
            key = %self.config.s3_model_key_path,
            "Uploading trained model"
        );
        self.estimator
            .save_model(&self.evaluation.trained_model_path)
            .await?;

        let artifact = ModelPusherArtifact {
            bucket_name: self.config.bucket_name.clone(),
            s3_model_path: self.config.s3_model_key_path.clone(),
        };
        info!(?artifact, "Model pusher artifact");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::InMemoryModelStorage;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_push_overwrites_deployment() {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("model.bin");
        std::fs::write(&model_path, b"first").unwrap();

        let storage: Arc<dyn ModelStorage> = Arc::new(InMemoryModelStorage::new());
        let config = ModelPusherConfig {
            bucket_name: "models".to_string(),
            s3_model_key_path: "model.bin".to_string(),
        };
        let evaluation = ModelEvaluationArtifact {
            is_model_accepted: true,
            changed_accuracy: 0.1,
            s3_model_path: "model.bin".to_string(),
            trained_model_path: model_path.clone(),
        };
        let pusher = ModelPusher::new(evaluation, config, Arc::clone(&storage));

        let artifact = pusher.initiate_model_pusher().await.unwrap();
        assert_eq!(artifact.bucket_name, "models");
        assert_eq!(storage.download("models", "model.bin").await.unwrap(), b"first");

        std::fs::write(&model_path, b"second").unwrap();
        pusher.initiate_model_pusher().await.unwrap();
        assert_eq!(storage.download("models", "model.bin").await.unwrap(), b"second");
    }
}
