//! File and frame helpers shared by the pipeline stages

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::Array2;
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ensure_parent_dir;
use crate::error::{ChurnError, Result};

/// Run a CPU-bound stage off the async worker threads
pub async fn blocking<T, F>(stage: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ChurnError::Internal(format!("{stage} stage did not complete: {e}")))?
}

/// Load a headered CSV file, inferring dtypes from the whole file
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(file)
        .finish()?;
    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded CSV");
    Ok(df)
}

/// Write `df` with a header row, creating parent directories
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    debug!(path = %path.display(), rows = df.height(), "Wrote CSV");
    Ok(())
}

/// Serialize any serde value to `path` with bincode
pub fn save_object<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, value)?;
    debug!(path = %path.display(), "Saved object");
    Ok(())
}

pub fn load_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(bincode::deserialize_from(reader)?)
}

pub fn save_array(path: impl AsRef<Path>, array: &Array2<f64>) -> Result<()> {
    save_object(path, array)
}

pub fn load_array(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    load_object(path)
}

pub fn read_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ChurnError::ConfigError(format!("cannot read {}: {e}", path.display())))?;
    Ok(serde_yaml::from_str(&text)?)
}

pub fn write_yaml<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let text = serde_yaml::to_string(value)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Drop every named column; a missing name is an error
pub fn drop_columns(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut out = df.clone();
    for name in columns {
        if out.column(name).is_err() {
            return Err(ChurnError::ColumnNotFound(name.clone()));
        }
        out = out.drop(name)?;
    }
    Ok(out)
}

/// Names of the string-typed columns, in frame order
pub fn string_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::String))
        .map(|c| c.name().to_string())
        .collect()
}

/// Names of the numeric columns, in frame order
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Values of a numeric column as `f64`, rejecting nulls
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| ChurnError::DataError(format!("column '{name}' contains missing values")))
        })
        .collect()
}

/// Values of a column as strings, rejecting nulls
pub fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::to_string)
                .ok_or_else(|| ChurnError::DataError(format!("column '{name}' contains missing values")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_blocking_returns_stage_result() {
        assert_eq!(blocking("sum", || Ok(2 + 2)).await.unwrap(), 4);

        let err = blocking("scoring", || -> Result<()> { Err(ChurnError::ModelNotFitted) })
            .await
            .unwrap_err();
        assert!(matches!(err, ChurnError::ModelNotFitted));
    }

    #[tokio::test]
    async fn test_blocking_reports_panicked_stage() {
        let err = blocking("scoring", || -> Result<()> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, ChurnError::Internal(ref msg) if msg.starts_with("scoring stage")));
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/frame.csv");
        let mut df = df! {
            "gender" => &["Male", "Female"],
            "tenure" => &[1i64, 24],
        }
        .unwrap();

        write_csv(&mut df, &path).unwrap();
        let loaded = read_csv(&path).unwrap();
        assert_eq!(loaded.shape(), (2, 2));
        assert_eq!(string_columns(&loaded), vec!["gender".to_string()]);
        assert_eq!(numeric_columns(&loaded), vec!["tenure".to_string()]);
    }

    #[test]
    fn test_array_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arr.bin");
        let array = ndarray::array![[1.0, 2.0], [3.0, 4.5]];
        save_array(&path, &array).unwrap();
        assert_eq!(load_array(&path).unwrap(), array);
    }

    #[test]
    fn test_drop_columns() {
        let df = df! {
            "customerID" => &["a", "b"],
            "tenure" => &[1i64, 2],
        }
        .unwrap();
        let dropped = drop_columns(&df, &["customerID".to_string()]).unwrap();
        let names: Vec<String> = dropped.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["tenure".to_string()]);

        let err = drop_columns(&df, &["missing".to_string()]).unwrap_err();
        assert!(matches!(err, ChurnError::ColumnNotFound(_)));
    }

    #[test]
    fn test_column_as_f64_rejects_nulls() {
        let df = df! { "x" => &[Some(1.0f64), None] }.unwrap();
        assert!(column_as_f64(&df, "x").is_err());
    }
}
