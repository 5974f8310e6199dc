//! Numeric + categorical feature block

use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::encoder::OneHotEncoder;
use super::scaler::StandardScaler;
use crate::error::{ChurnError, Result};
use crate::utils::{numeric_columns, string_columns};

/// Standard-scales the numeric columns and one-hot encodes the string
/// columns. Output layout is the numeric block first, then the one-hot
/// block, each in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl ColumnTransformer {
    pub fn new(numeric_columns: Vec<String>, categorical_columns: Vec<String>) -> Self {
        Self {
            numeric_columns,
            categorical_columns,
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(),
            is_fitted: false,
        }
    }

    /// Column roles taken from dtypes: strings are categorical, numbers numeric
    pub fn from_dtypes(df: &DataFrame) -> Self {
        Self::new(numeric_columns(df), string_columns(df))
    }

    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        if self.numeric_columns.is_empty() && self.categorical_columns.is_empty() {
            return Err(ChurnError::DataError(
                "column transformer has no input columns".to_string(),
            ));
        }
        self.scaler.fit(df, &self.numeric_columns)?;
        self.encoder.fit(df, &self.categorical_columns)?;
        self.is_fitted = true;
        debug!(
            numeric = self.numeric_columns.len(),
            categorical = self.categorical_columns.len(),
            output_features = self.n_features_out(),
            "Fitted column transformer"
        );
        Ok(self)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        let numeric = self.scaler.transform(df)?;
        let categorical = self.encoder.transform(df)?;
        Ok(concatenate(Axis(1), &[numeric.view(), categorical.view()])?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    pub fn n_features_out(&self) -> usize {
        self.numeric_columns.len() + self.encoder.n_output_features()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric_columns.clone();
        names.extend(self.encoder.feature_names());
        names
    }

    /// Every input column the transformer reads
    pub fn input_columns(&self) -> Vec<&str> {
        self.numeric_columns
            .iter()
            .chain(&self.categorical_columns)
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df! {
            "gender" => &["Male", "Female", "Female", "Male"],
            "tenure" => &[1i64, 10, 20, 30],
            "Contract" => &["One year", "Two year", "One year", "One year"],
            "MonthlyCharges" => &[20.0f64, 50.0, 80.0, 110.0],
        }
        .unwrap()
    }

    #[test]
    fn test_input_columns() {
        let mut transformer = ColumnTransformer::from_dtypes(&frame());
        transformer.fit(&frame()).unwrap();
        assert_eq!(
            transformer.input_columns(),
            vec!["tenure", "MonthlyCharges", "gender", "Contract"]
        );
    }

    #[test]
    fn test_layout_numeric_then_one_hot() {
        let df = frame();
        let mut transformer = ColumnTransformer::from_dtypes(&df);
        let out = transformer.fit_transform(&df).unwrap();

        assert_eq!(out.shape(), &[4, 2 + 2 + 2]);
        assert_eq!(
            transformer.feature_names(),
            vec![
                "tenure",
                "MonthlyCharges",
                "gender_Female",
                "gender_Male",
                "Contract_One year",
                "Contract_Two year"
            ]
        );
        assert_eq!(out.row(0).slice(ndarray::s![2..]).to_vec(), vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let df = frame();
        let mut transformer = ColumnTransformer::from_dtypes(&df);
        transformer.fit(&df).unwrap();
        let first = transformer.transform(&df).unwrap();
        let second = transformer.transform(&df).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_input_column() {
        let df = frame();
        let mut transformer = ColumnTransformer::from_dtypes(&df);
        transformer.fit(&df).unwrap();
        let reduced = df.drop("tenure").unwrap();
        assert!(transformer.transform(&reduced).is_err());
    }
}
