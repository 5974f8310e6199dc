//! Application state shared across handlers

use std::sync::Arc;

use tokio::sync::RwLock;

use super::ServerConfig;
use crate::cloud::ModelStorage;
use crate::components::DataSource;
use crate::config::PipelineConfig;
use crate::pipeline::ChurnClassifier;

pub struct AppState {
    pub config: ServerConfig,
    pub pipeline: PipelineConfig,
    pub storage: Arc<dyn ModelStorage>,
    /// Source for `/train`; `None` connects to MongoDB per run
    pub training_source: Option<DataSource>,
    classifier: RwLock<Arc<ChurnClassifier>>,
}

impl AppState {
    pub fn new(config: ServerConfig, pipeline: PipelineConfig, storage: Arc<dyn ModelStorage>) -> Self {
        let classifier = Self::fresh_classifier(&pipeline, &storage);
        Self {
            config,
            pipeline,
            storage,
            training_source: None,
            classifier: RwLock::new(classifier),
        }
    }

    pub fn with_training_source(mut self, source: DataSource) -> Self {
        self.training_source = Some(source);
        self
    }

    fn fresh_classifier(pipeline: &PipelineConfig, storage: &Arc<dyn ModelStorage>) -> Arc<ChurnClassifier> {
        Arc::new(ChurnClassifier::new(
            Arc::clone(storage),
            pipeline.model_bucket.clone(),
            pipeline.model_key.clone(),
        ))
    }

    pub async fn classifier(&self) -> Arc<ChurnClassifier> {
        Arc::clone(&*self.classifier.read().await)
    }

    /// Drop the cached bundle so the next prediction loads the new deployment
    pub async fn reload_classifier(&self) {
        *self.classifier.write().await = Self::fresh_classifier(&self.pipeline, &self.storage);
    }
}
