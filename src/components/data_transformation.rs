//! Cleaning, oversampling and encoding of the ingested splits

use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::*;
use tracing::info;

use crate::artifact::{DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact};
use crate::config::constants::{COERCED_NUMERIC_COLUMN, TARGET_COLUMN};
use crate::config::{DataTransformationConfig, SchemaConfig};
use crate::error::{ChurnError, Result};
use crate::preprocessing::{ColumnTransformer, LabelEncoder, PreprocessingObject};
use crate::synthetic::{class_counts, SmoteNc};
use crate::utils::{
    column_as_strings, drop_columns, is_numeric_dtype, read_csv, save_array, save_object,
};

const BLANK_CELL: &str = " ";

/// Remove every row holding a literal `" "` in any string column
pub fn drop_blank_rows(df: &DataFrame) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];
    for column in df.get_columns() {
        if column.dtype() != &DataType::String {
            continue;
        }
        for (row, value) in column.as_materialized_series().str()?.into_iter().enumerate() {
            if value == Some(BLANK_CELL) {
                keep[row] = false;
            }
        }
    }
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        info!(dropped, "Removed rows with blank cells");
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

/// Strict cast of `TotalCharges` to `Float64`
pub fn coerce_numeric_column(df: &DataFrame) -> Result<DataFrame> {
    let series = df
        .column(COERCED_NUMERIC_COLUMN)?
        .as_materialized_series()
        .strict_cast(&DataType::Float64)
        .map_err(|e| {
            ChurnError::DataError(format!("cannot cast {COERCED_NUMERIC_COLUMN} to float: {e}"))
        })?;
    let mut out = df.clone();
    out.with_column(series)?;
    Ok(out)
}

/// Blank-row removal followed by the `TotalCharges` cast, as applied to any
/// raw frame before it meets a fitted transformer
pub fn clean_raw_frame(df: &DataFrame) -> Result<DataFrame> {
    coerce_numeric_column(&drop_blank_rows(df)?)
}

/// Cast every column that is neither numeric nor string (e.g. booleans) to
/// string, so it is treated as categorical downstream
fn stringify_non_numeric(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();
    for column in df.get_columns() {
        let dtype = column.dtype();
        if !is_numeric_dtype(dtype) && dtype != &DataType::String {
            let cast = column.as_materialized_series().cast(&DataType::String)?;
            out.with_column(cast)?;
        }
    }
    Ok(out)
}

pub struct DataTransformation {
    ingestion: DataIngestionArtifact,
    validation: DataValidationArtifact,
    config: DataTransformationConfig,
    schema: SchemaConfig,
}

impl DataTransformation {
    pub fn new(
        ingestion: DataIngestionArtifact,
        validation: DataValidationArtifact,
        config: DataTransformationConfig,
        schema: SchemaConfig,
    ) -> Self {
        Self {
            ingestion,
            validation,
            config,
            schema,
        }
    }

    /// Split a cleaned frame into model inputs and raw target labels
    fn split_features(&self, df: &DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let target = column_as_strings(df, TARGET_COLUMN)?;
        let features = df.drop(TARGET_COLUMN)?;
        let features = drop_columns(&features, &self.schema.drop_columns)?;
        Ok((stringify_non_numeric(&features)?, target))
    }

    pub fn initiate_data_transformation(&self) -> Result<DataTransformationArtifact> {
        if !self.validation.validation_status {
            return Err(ChurnError::ValidationFailed(self.validation.message.clone()));
        }
        info!("Starting data transformation");

        let train_df = clean_raw_frame(&read_csv(&self.ingestion.train_file_path)?)?;
        let test_df = clean_raw_frame(&read_csv(&self.ingestion.test_file_path)?)?;

        let (train_features, train_target) = self.split_features(&train_df)?;
        let (test_features, test_target) = self.split_features(&test_df)?;

        info!(classes = ?class_counts(&train_target), "Applying SMOTE-NC on training dataset");
        let (train_features, train_target, summary) = SmoteNc::new()
            .with_seed(self.config.random_state)
            .fit_resample(&train_features, &train_target)?;
        info!(
            original = summary.n_original,
            synthetic = summary.n_synthetic,
            total = summary.n_total(),
            "Resampled training dataset"
        );

        let mut transformer = ColumnTransformer::from_dtypes(&train_features);
        let x_train = transformer.fit_transform(&train_features)?;
        let x_test = transformer.transform(&test_features)?;

        let mut label_encoder = LabelEncoder::new(TARGET_COLUMN);
        let y_train = label_encoder.fit_transform(&train_target)?;
        let y_test = label_encoder.transform(&test_target)?;
        if label_encoder.classes().len() > 2 {
            return Err(ChurnError::NonBinaryTarget(label_encoder.classes().len()));
        }

        let train_arr = with_target(&x_train, &y_train)?;
        let test_arr = with_target(&x_test, &y_test)?;
        info!(
            train_shape = ?train_arr.dim(),
            test_shape = ?test_arr.dim(),
            features = ?transformer.feature_names(),
            "Created train and test arrays"
        );

        save_object(
            &self.config.transformed_object_file_path,
            &PreprocessingObject {
                transformer,
                label_encoder,
            },
        )?;
        save_array(&self.config.transformed_train_file_path, &train_arr)?;
        save_array(&self.config.transformed_test_file_path, &test_arr)?;

        let artifact = DataTransformationArtifact {
            transformed_object_file_path: self.config.transformed_object_file_path.clone(),
            transformed_train_file_path: self.config.transformed_train_file_path.clone(),
            transformed_test_file_path: self.config.transformed_test_file_path.clone(),
        };
        info!(?artifact, "Data transformation artifact");
        Ok(artifact)
    }
}

/// Append the target as the last column
fn with_target(features: &Array2<f64>, target: &Array1<f64>) -> Result<Array2<f64>> {
    let target = target.view().insert_axis(Axis(1));
    Ok(concatenate(Axis(1), &[features.view(), target])?)
}

/// Features and target of an array produced by [`with_target`]
pub fn split_target(array: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    let n_cols = array.ncols();
    if n_cols < 2 {
        return Err(ChurnError::ShapeError {
            expected: "at least one feature column plus the target".to_string(),
            actual: format!("{n_cols} columns"),
        });
    }
    let features = array.slice(ndarray::s![.., ..n_cols - 1]).to_owned();
    let target = array.column(n_cols - 1).to_owned();
    Ok((features, target))
}
