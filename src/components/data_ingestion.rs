//! Export of the raw churn table and its train/test split

use std::path::PathBuf;
use std::sync::Arc;

use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::artifact::DataIngestionArtifact;
use crate::cloud::DocumentStore;
use crate::config::DataIngestionConfig;
use crate::data_access::DataAccessor;
use crate::error::{ChurnError, Result};
use crate::utils::{read_csv, write_csv};

/// Where the raw table comes from
#[derive(Clone)]
pub enum DataSource {
    /// A document-store collection, named by the ingestion config
    Collection(Arc<dyn DocumentStore>),
    /// A local CSV export, for offline runs
    CsvFile(PathBuf),
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Collection(_) => f.write_str("Collection"),
            DataSource::CsvFile(path) => f.debug_tuple("CsvFile").field(path).finish(),
        }
    }
}

pub struct DataIngestion {
    config: DataIngestionConfig,
    source: DataSource,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig, source: DataSource) -> Self {
        Self { config, source }
    }

    /// Pull the full table and persist it as the feature-store CSV
    pub async fn export_data_into_feature_store(&self) -> Result<DataFrame> {
        info!(source = ?self.source, "Exporting data into feature store");
        let mut df = match &self.source {
            DataSource::Collection(store) => {
                let accessor = DataAccessor::new(store.as_ref(), self.config.database_name.clone());
                accessor
                    .export_collection_as_dataframe(&self.config.collection_name, None)
                    .await?
            }
            DataSource::CsvFile(path) => read_csv(path)?,
        };
        info!(rows = df.height(), columns = df.width(), "Shape of exported dataframe");

        write_csv(&mut df, &self.config.feature_store_file_path)?;
        info!(
            path = %self.config.feature_store_file_path.display(),
            "Saved exported data into feature store"
        );
        Ok(df)
    }

    /// Shuffle with the configured seed and cut off `ceil(n * ratio)` test rows
    pub fn split_data_as_train_test(&self, df: &DataFrame) -> Result<(DataFrame, DataFrame)> {
        let n_rows = df.height();
        let n_test = (n_rows as f64 * self.config.train_test_split_ratio).ceil() as usize;
        if n_test == 0 || n_test >= n_rows {
            return Err(ChurnError::DataError(format!(
                "cannot split {n_rows} rows with test ratio {}",
                self.config.train_test_split_ratio
            )));
        }

        let mut order: Vec<IdxSize> = (0..n_rows as IdxSize).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        order.shuffle(&mut rng);
        let (test_idx, train_idx) = order.split_at(n_test);

        let mut train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
        let mut test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;
        info!(train_rows = train.height(), test_rows = test.height(), "Performed train test split");

        write_csv(&mut train, &self.config.training_file_path)?;
        write_csv(&mut test, &self.config.testing_file_path)?;
        Ok((train, test))
    }

    pub async fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        let df = self.export_data_into_feature_store().await?;
        self.split_data_as_train_test(&df)?;

        let artifact = DataIngestionArtifact {
            train_file_path: self.config.training_file_path.clone(),
            test_file_path: self.config.testing_file_path.clone(),
        };
        info!(?artifact, "Data ingestion artifact");
        Ok(artifact)
    }
}
