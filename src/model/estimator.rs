//! Deployed model in object storage

use std::path::Path;
use std::sync::Arc;

use ndarray::Array1;
use polars::prelude::DataFrame;
use tokio::sync::OnceCell;
use tracing::info;

use super::ChurnModel;
use crate::cloud::ModelStorage;
use crate::error::Result;

/// Handle on the bundle at `bucket/key`.
///
/// The bundle is downloaded on first use and cached for the lifetime of the
/// handle; later calls share the same `Arc`.
pub struct ChurnEstimator {
    storage: Arc<dyn ModelStorage>,
    bucket_name: String,
    model_path: String,
    loaded: OnceCell<Arc<ChurnModel>>,
}

impl ChurnEstimator {
    pub fn new(
        storage: Arc<dyn ModelStorage>,
        bucket_name: impl Into<String>,
        model_path: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            bucket_name: bucket_name.into(),
            model_path: model_path.into(),
            loaded: OnceCell::new(),
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub async fn is_model_present(&self) -> Result<bool> {
        self.storage.exists(&self.bucket_name, &self.model_path).await
    }

    pub async fn load_model(&self) -> Result<Arc<ChurnModel>> {
        let model = self
            .loaded
            .get_or_try_init(|| async {
                let bytes = self.storage.download(&self.bucket_name, &self.model_path).await?;
                let model = ChurnModel::from_bytes(&bytes)?;
                info!(
                    bucket = %self.bucket_name,
                    key = %self.model_path,
                    trained_at = %model.trained_at(),
                    "Loaded deployed model"
                );
                Ok::<_, crate::error::ChurnError>(Arc::new(model))
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Upload a serialized bundle file, replacing whatever was deployed
    pub async fn save_model(&self, from_file: impl AsRef<Path>) -> Result<()> {
        let bytes = tokio::fs::read(from_file.as_ref()).await?;
        self.storage.upload(&self.bucket_name, &self.model_path, bytes).await
    }

    pub async fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        self.load_model().await?.predict(df)
    }
}
