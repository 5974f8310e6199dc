//! Export of the churn collection as a DataFrame

use indexmap::IndexMap;
use polars::prelude::*;
use serde_json::Value;
use tracing::info;

use crate::cloud::{Document, DocumentStore};
use crate::error::Result;

const ID_FIELD: &str = "_id";
const NA_TOKEN: &str = "na";

/// Pulls collections out of a [`DocumentStore`]
pub struct DataAccessor<'a> {
    store: &'a dyn DocumentStore,
    default_database: String,
}

impl<'a> DataAccessor<'a> {
    pub fn new(store: &'a dyn DocumentStore, default_database: impl Into<String>) -> Self {
        Self {
            store,
            default_database: default_database.into(),
        }
    }

    /// All documents of `collection` as a frame, without `_id`, with `"na"` as null
    pub async fn export_collection_as_dataframe(
        &self,
        collection: &str,
        database: Option<&str>,
    ) -> Result<DataFrame> {
        let database = database.unwrap_or(&self.default_database);
        let documents = self.store.find_all(database, collection).await?;
        let df = documents_to_dataframe(&documents)?;
        info!(database, collection, rows = df.height(), columns = df.width(), "Exported collection");
        Ok(df)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

fn kind_of(values: &[Option<&Value>]) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values.iter().flatten() {
        let this = match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => ColumnKind::Int,
            Value::Number(_) => ColumnKind::Float,
            Value::Bool(_) => ColumnKind::Bool,
            _ => ColumnKind::Text,
        };
        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Int), ColumnKind::Float) | (Some(ColumnKind::Float), ColumnKind::Int) => {
                ColumnKind::Float
            }
            _ => return ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Text)
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten documents into columns in first-seen field order
pub(crate) fn documents_to_dataframe(documents: &[Document]) -> Result<DataFrame> {
    let mut fields: IndexMap<&str, Vec<Option<&Value>>> = IndexMap::new();
    for document in documents {
        for name in document.keys() {
            if name != ID_FIELD {
                fields.entry(name.as_str()).or_default();
            }
        }
    }

    for (name, values) in fields.iter_mut() {
        for document in documents {
            let value = document.get(*name).filter(|v| match v {
                Value::Null => false,
                Value::String(s) => s != NA_TOKEN,
                _ => true,
            });
            values.push(value);
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(fields.len());
    for (name, values) in fields {
        let series = match kind_of(&values) {
            ColumnKind::Int => {
                let data: Vec<Option<i64>> = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
                Series::new(name.into(), data)
            }
            ColumnKind::Float => {
                let data: Vec<Option<f64>> = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
                Series::new(name.into(), data)
            }
            ColumnKind::Bool => {
                let data: Vec<Option<bool>> = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
                Series::new(name.into(), data)
            }
            ColumnKind::Text => {
                let data: Vec<Option<String>> = values.iter().map(|v| v.map(as_text)).collect();
                Series::new(name.into(), data)
            }
        };
        columns.push(series.into());
    }

    Ok(DataFrame::new(columns)?)
}
