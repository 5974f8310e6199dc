//! Fitted preprocessing + classifier, persisted as one bincode blob

use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ensemble::StackingClassifier;
use crate::error::{ChurnError, Result};
use crate::preprocessing::{ColumnTransformer, LabelEncoder};
use crate::training::Classifier;
use crate::utils::{load_object, save_object};

/// Bumped whenever the serialized layout of [`ChurnModel`] changes
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Model bundle: every prediction runs the column transformer and then the
/// stacked classifier, both fitted in the same training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnModel {
    format_version: u32,
    trained_at: DateTime<Utc>,
    preprocessor: ColumnTransformer,
    label_encoder: LabelEncoder,
    classifier: StackingClassifier,
}

impl ChurnModel {
    pub fn new(
        preprocessor: ColumnTransformer,
        label_encoder: LabelEncoder,
        classifier: StackingClassifier,
    ) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            trained_at: Utc::now(),
            preprocessor,
            label_encoder,
            classifier,
        }
    }

    /// Encoded class per row (`1.0` is the churn class)
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        self.check_input_columns(df)?;
        let features = self.preprocessor.transform(df)?;
        debug!(rows = features.nrows(), features = features.ncols(), "Predicting");
        self.classifier.predict(&features)
    }

    /// Original target labels per row, e.g. `"Yes"` / `"No"`
    pub fn predict_labels(&self, df: &DataFrame) -> Result<Vec<String>> {
        let encoded = self.predict(df)?;
        self.label_encoder.inverse_transform(&encoded.to_vec())
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }

    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.label_encoder
    }

    pub fn classifier(&self) -> &StackingClassifier {
        &self.classifier
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model: ChurnModel = bincode::deserialize(bytes)?;
        model.check_version()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_object(path, self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let model: ChurnModel = load_object(path)?;
        model.check_version()
    }

    /// Every column the preprocessor reads must be present in the request
    fn check_input_columns(&self, df: &DataFrame) -> Result<()> {
        let present = df.get_column_names();
        let missing: Vec<&str> = self
            .preprocessor
            .input_columns()
            .into_iter()
            .filter(|c| !present.iter().any(|p| p.as_str() == *c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ChurnError::ColumnNotFound(missing.join(", ")))
        }
    }

    fn check_version(self) -> Result<Self> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ChurnError::SerializationError(format!(
                "model bundle format {} is not supported (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }
        Ok(self)
    }
}
