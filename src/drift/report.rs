//! Per-column drift comparison of two frames

use std::path::Path;

use indexmap::IndexMap;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ChiSquareTest, DriftResult, KolmogorovSmirnovTest};
use crate::error::Result;
use crate::utils::{is_numeric_dtype, write_yaml};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Num,
    Cat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub column_type: ColumnType,
    #[serde(flatten)]
    pub result: DriftResult,
}

/// Drift summary written to `drift_report/report.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDriftReport {
    pub number_of_columns: usize,
    pub number_of_drifted_columns: usize,
    pub share_of_drifted_columns: f64,
    pub dataset_drift: bool,
    pub drift_by_columns: IndexMap<String, ColumnDrift>,
}

impl DatasetDriftReport {
    /// Compare every column present in both frames. Numeric columns use the
    /// KS test, everything else the chi-square test. Nulls are ignored;
    /// a column that is entirely null on either side is skipped.
    pub fn compute(reference: &DataFrame, current: &DataFrame, alpha: f64) -> Result<Self> {
        let ks = KolmogorovSmirnovTest::new(alpha);
        let chi2 = ChiSquareTest::new(alpha);

        let mut drift_by_columns = IndexMap::new();
        for column in reference.get_columns() {
            let name = column.name().as_str();
            let Ok(other) = current.column(name) else {
                debug!(column = name, "Column missing from current frame, not compared");
                continue;
            };

            let numeric = is_numeric_dtype(column.dtype()) && is_numeric_dtype(other.dtype());
            let drift = if numeric {
                let a = non_null_f64(column)?;
                let b = non_null_f64(other)?;
                if a.is_empty() || b.is_empty() {
                    continue;
                }
                ColumnDrift {
                    column_type: ColumnType::Num,
                    result: ks.detect(&a, &b)?,
                }
            } else {
                let a = non_null_strings(column)?;
                let b = non_null_strings(other)?;
                if a.is_empty() || b.is_empty() {
                    continue;
                }
                ColumnDrift {
                    column_type: ColumnType::Cat,
                    result: chi2.detect(&a, &b)?,
                }
            };
            drift_by_columns.insert(name.to_string(), drift);
        }

        let number_of_columns = drift_by_columns.len();
        let number_of_drifted_columns = drift_by_columns
            .values()
            .filter(|d| d.result.drift_detected)
            .count();
        let share_of_drifted_columns = if number_of_columns == 0 {
            0.0
        } else {
            number_of_drifted_columns as f64 / number_of_columns as f64
        };

        let report = Self {
            number_of_columns,
            number_of_drifted_columns,
            share_of_drifted_columns,
            dataset_drift: number_of_drifted_columns > 0,
            drift_by_columns,
        };
        info!(
            columns = report.number_of_columns,
            drifted = report.number_of_drifted_columns,
            share = report.share_of_drifted_columns,
            "Computed drift report"
        );
        Ok(report)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_yaml(path, self)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.drift_by_columns
            .iter()
            .filter(|(_, d)| d.result.drift_detected)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn non_null_f64(column: &Column) -> Result<Vec<f64>> {
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().flatten().collect())
}

fn non_null_strings(column: &Column) -> Result<Vec<String>> {
    let series = column.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}
