use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};

/// Column contract for the raw churn table, read from `config/schema.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaConfig {
    /// Expected columns in order, each a one-entry `name: dtype` map
    pub columns: Vec<IndexMap<String, String>>,
    #[serde(default)]
    pub numerical_columns: Vec<String>,
    #[serde(default)]
    pub categorical_columns: Vec<String>,
    #[serde(default)]
    pub drop_columns: Vec<String>,
}

impl SchemaConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::ConfigError(format!("cannot read schema {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let schema: SchemaConfig = serde_yaml::from_str(text)?;
        if let Some(bad) = schema.columns.iter().find(|entry| entry.len() != 1) {
            return Err(ChurnError::ConfigError(format!(
                "schema column entries must map exactly one name to a dtype, got {} keys",
                bad.len()
            )));
        }
        Ok(schema)
    }

    /// Column names in schema order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter_map(|entry| entry.keys().next().map(String::as_str))
            .collect()
    }

    pub fn number_of_columns(&self) -> usize {
        self.columns.len()
    }
}
