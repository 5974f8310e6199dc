//! Schema checks and train/test drift detection

use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::config::{DataValidationConfig, DriftPolicy, SchemaConfig};
use crate::drift::DatasetDriftReport;
use crate::error::Result;
use crate::utils::{drop_columns, read_csv};

const MISSING_IN_TRAIN: &str = "Columns are missing in training dataframe.";
const MISSING_IN_TEST: &str = "Columns are missing in test dataframe.";
pub const DRIFT_DETECTED: &str = "Drift detected";
pub const DRIFT_NOT_DETECTED: &str = "Drift not detected";

pub struct DataValidation {
    ingestion: DataIngestionArtifact,
    config: DataValidationConfig,
    schema: SchemaConfig,
}

impl DataValidation {
    pub fn new(
        ingestion: DataIngestionArtifact,
        config: DataValidationConfig,
        schema: SchemaConfig,
    ) -> Self {
        Self {
            ingestion,
            config,
            schema,
        }
    }

    pub fn validate_number_of_columns(&self, df: &DataFrame) -> bool {
        let status = df.width() == self.schema.number_of_columns();
        info!(status, expected = self.schema.number_of_columns(), actual = df.width(), "Is required column count present");
        status
    }

    /// Every schema numerical and categorical column is present
    pub fn is_column_exist(&self, df: &DataFrame) -> bool {
        let present = |name: &String| df.column(name).is_ok();
        let missing_numerical: Vec<&String> =
            self.schema.numerical_columns.iter().filter(|c| !present(c)).collect();
        let missing_categorical: Vec<&String> =
            self.schema.categorical_columns.iter().filter(|c| !present(c)).collect();

        if !missing_numerical.is_empty() {
            warn!(columns = ?missing_numerical, "Missing numerical columns");
        }
        if !missing_categorical.is_empty() {
            warn!(columns = ?missing_categorical, "Missing categorical columns");
        }
        missing_numerical.is_empty() && missing_categorical.is_empty()
    }

    /// Compare the two frames column by column and write the YAML report;
    /// true when any column drifted
    ///
    /// Identifier columns listed under the schema's `drop_columns` never
    /// overlap between splits, so they are left out of the comparison.
    pub fn detect_dataset_drift(&self, reference: &DataFrame, current: &DataFrame) -> Result<bool> {
        let reference = self.without_dropped_columns(reference)?;
        let current = self.without_dropped_columns(current)?;
        let report =
            DatasetDriftReport::compute(&reference, &current, self.config.significance_level)?;
        report.save(&self.config.drift_report_file_path)?;
        info!(
            drifted = report.number_of_drifted_columns,
            columns = report.number_of_columns,
            drifted_columns = ?report.drifted_columns(),
            "Drift detection finished"
        );
        Ok(report.share_of_drifted_columns > 0.0)
    }

    fn without_dropped_columns(&self, df: &DataFrame) -> Result<DataFrame> {
        let present: Vec<String> = self
            .schema
            .drop_columns
            .iter()
            .filter(|c| df.column(c).is_ok())
            .cloned()
            .collect();
        drop_columns(df, &present)
    }

    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact> {
        info!("Starting data validation");
        let train_df = read_csv(&self.ingestion.train_file_path)?;
        let test_df = read_csv(&self.ingestion.test_file_path)?;

        let mut message = String::new();
        if !self.validate_number_of_columns(&train_df) {
            message.push_str(MISSING_IN_TRAIN);
        }
        if !self.validate_number_of_columns(&test_df) {
            message.push_str(MISSING_IN_TEST);
        }
        if !self.is_column_exist(&train_df) {
            message.push_str(MISSING_IN_TRAIN);
        }
        if !self.is_column_exist(&test_df) {
            message.push_str(MISSING_IN_TEST);
        }

        let columns_ok = message.is_empty();
        let mut validation_status = columns_ok;
        if columns_ok {
            let drift = self.detect_dataset_drift(&train_df, &test_df)?;
            message = if drift { DRIFT_DETECTED } else { DRIFT_NOT_DETECTED }.to_string();
            if drift && self.config.drift_policy == DriftPolicy::Block {
                warn!("Drift detected and the drift policy blocks the run");
                validation_status = false;
            }
        } else {
            warn!(%message, "Validation error");
        }

        let artifact = DataValidationArtifact {
            validation_status,
            message,
            drift_report_file_path: self.config.drift_report_file_path.clone(),
        };
        info!(?artifact, "Data validation artifact");
        Ok(artifact)
    }
}
