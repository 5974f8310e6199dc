//! Standard scaling of numeric columns

use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};
use crate::utils::column_as_f64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    mean: f64,
    scale: f64,
}

/// z-score scaling with population standard deviation; constant columns get scale 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StandardScaler {
    columns: Vec<String>,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        let mut params = Vec::with_capacity(columns.len());
        for name in columns {
            let values = column_as_f64(df, name)?;
            if values.is_empty() {
                return Err(ChurnError::DataError(format!(
                    "cannot fit scaler on empty column '{name}'"
                )));
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            params.push(ScalerParams {
                mean,
                scale: if std == 0.0 { 1.0 } else { std },
            });
        }

        self.columns = columns.to_vec();
        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Scaled values, one output column per fitted input column
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        let mut out = Array2::zeros((df.height(), self.columns.len()));
        for (j, (name, params)) in self.columns.iter().zip(&self.params).enumerate() {
            let values = column_as_f64(df, name)?;
            for (i, v) in values.into_iter().enumerate() {
                out[[i, j]] = (v - params.mean) / params.scale;
            }
        }
        Ok(out)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
