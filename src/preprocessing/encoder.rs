//! Categorical encoders

use std::collections::BTreeSet;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};
use crate::utils::column_as_strings;

/// One-hot encoding with sorted categories per column.
/// Unseen categories at transform time are an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let mut categories = Vec::with_capacity(columns.len());
        for name in columns {
            let values = column_as_strings(df, name)?;
            let unique: BTreeSet<String> = values.into_iter().collect();
            categories.push(unique.into_iter().collect());
        }
        self.columns = columns.to_vec();
        self.categories = categories;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        let mut out = Array2::zeros((df.height(), self.n_output_features()));
        let mut offset = 0;
        for (name, categories) in self.columns.iter().zip(&self.categories) {
            let values = column_as_strings(df, name)?;
            for (i, value) in values.iter().enumerate() {
                let position = categories
                    .binary_search(value)
                    .map_err(|_| ChurnError::UnknownCategory {
                        column: name.clone(),
                        value: value.clone(),
                    })?;
                out[[i, offset + position]] = 1.0;
            }
            offset += categories.len();
        }
        Ok(out)
    }

    pub fn n_output_features(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// `column_category` names in output order
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{name}_{c}")))
            .collect()
    }
}

/// Maps class labels to `0..n` in sorted label order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            classes: Vec::new(),
        }
    }

    pub fn fit(&mut self, labels: &[String]) -> &mut Self {
        let unique: BTreeSet<&String> = labels.iter().collect();
        self.classes = unique.into_iter().cloned().collect();
        self
    }

    pub fn transform(&self, labels: &[String]) -> Result<Array1<f64>> {
        if self.classes.is_empty() {
            return Err(ChurnError::ModelNotFitted);
        }
        labels
            .iter()
            .map(|label| {
                self.classes
                    .binary_search(label)
                    .map(|i| i as f64)
                    .map_err(|_| ChurnError::UnknownCategory {
                        column: self.column.clone(),
                        value: label.clone(),
                    })
            })
            .collect()
    }

    pub fn fit_transform(&mut self, labels: &[String]) -> Result<Array1<f64>> {
        self.fit(labels);
        self.transform(labels)
    }

    pub fn inverse_transform(&self, encoded: &[f64]) -> Result<Vec<String>> {
        encoded
            .iter()
            .map(|&v| {
                let idx = v.round();
                if idx < 0.0 || idx as usize >= self.classes.len() {
                    return Err(ChurnError::DataError(format!(
                        "encoded label {v} outside 0..{}",
                        self.classes.len()
                    )));
                }
                Ok(self.classes[idx as usize].clone())
            })
            .collect()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_sorted_categories() {
        let df = df! {
            "contract" => &["Two year", "Month-to-month", "One year", "Month-to-month"],
        }
        .unwrap();
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&df, &["contract".to_string()]).unwrap();
        assert_eq!(
            encoder.feature_names(),
            vec!["contract_Month-to-month", "contract_One year", "contract_Two year"]
        );

        let out = encoder.transform(&df).unwrap();
        assert_eq!(out.shape(), &[4, 3]);
        assert_eq!(out.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(out.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(encoder.feature_names()[1], "contract_One year");
    }

    #[test]
    fn test_unknown_category_errors() {
        let train = df! { "g" => &["a", "b"] }.unwrap();
        let test = df! { "g" => &["c"] }.unwrap();
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&train, &["g".to_string()]).unwrap();
        let err = encoder.transform(&test).unwrap_err();
        assert!(matches!(err, ChurnError::UnknownCategory { .. }));
    }

    #[test]
    fn test_label_encoder() {
        let labels: Vec<String> = ["Yes", "No", "No"].iter().map(|s| s.to_string()).collect();
        let mut encoder = LabelEncoder::new("Churn");
        let encoded = encoder.fit_transform(&labels).unwrap();
        assert_eq!(encoded.to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(encoder.classes(), &["No", "Yes"]);
        assert_eq!(encoder.inverse_transform(&[1.0]).unwrap(), vec!["Yes".to_string()]);
        assert!(encoder.transform(&["Maybe".to_string()]).is_err());
    }
}
