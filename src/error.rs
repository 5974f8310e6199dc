//! Error types for the churn pipeline and prediction service

use thiserror::Error;

/// Result type alias for churn operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Closed set of failure categories callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing env var, bad schema or registry, invalid parameter
    Configuration,
    /// Document store or object store transport failure
    Connectivity,
    /// A pipeline gate refused to continue
    ValidationFailure,
    /// The data does not have the shape or content the pipeline expects
    DataContract,
    /// I/O, serialization and everything else
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Connectivity => "connectivity",
            ErrorCategory::ValidationFailure => "validation_failure",
            ErrorCategory::DataContract => "data_contract",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Main error type for the churn crate
#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Document store error: {0}")]
    DocumentStoreError(String),

    #[error("Object storage error: {0}")]
    ObjectStorageError(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Trained model accuracy {actual:.4} is below the expected {expected:.4}")]
    AccuracyBelowThreshold { actual: f64, expected: f64 },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Target must be binary, found {0} classes")]
    NonBinaryTarget(usize),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChurnError {
    /// Category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChurnError::ConfigError(_)
            | ChurnError::MissingEnvVar(_)
            | ChurnError::InvalidParameter { .. } => ErrorCategory::Configuration,
            ChurnError::DocumentStoreError(_) | ChurnError::ObjectStorageError(_) => {
                ErrorCategory::Connectivity
            }
            ChurnError::ValidationFailed(_) | ChurnError::AccuracyBelowThreshold { .. } => {
                ErrorCategory::ValidationFailure
            }
            ChurnError::ColumnNotFound(_)
            | ChurnError::DataError(_)
            | ChurnError::UnknownCategory { .. }
            | ChurnError::ShapeError { .. }
            | ChurnError::NonBinaryTarget(_) => ErrorCategory::DataContract,
            ChurnError::ModelNotFitted
            | ChurnError::IoError(_)
            | ChurnError::SerializationError(_)
            | ChurnError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Only transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Connectivity
    }

    pub(crate) fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ChurnError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        use polars::error::PolarsError;
        match err {
            PolarsError::ColumnNotFound(name) => ChurnError::ColumnNotFound(name.to_string()),
            PolarsError::IO { error, .. } => {
                ChurnError::IoError(std::io::Error::new(error.kind(), error.to_string()))
            }
            other => ChurnError::DataError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        ChurnError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ChurnError {
    fn from(err: serde_yaml::Error) -> Self {
        ChurnError::ConfigError(err.to_string())
    }
}

impl From<bincode::Error> for ChurnError {
    fn from(err: bincode::Error) -> Self {
        ChurnError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChurnError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChurnError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for ChurnError {
    fn from(err: mongodb::error::Error) -> Self {
        ChurnError::DocumentStoreError(err.to_string())
    }
}

impl From<object_store::Error> for ChurnError {
    fn from(err: object_store::Error) -> Self {
        ChurnError::ObjectStorageError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ChurnError {
    fn from(err: tokio::task::JoinError) -> Self {
        ChurnError::Internal(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChurnError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");

        let err = ChurnError::ValidationFailed("Drift detected".to_string());
        assert_eq!(err.to_string(), "Drift detected");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChurnError = io_err.into();
        assert!(matches!(err, ChurnError::IoError(_)));
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            ChurnError::MissingEnvVar("MONGODB_URL".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            ChurnError::AccuracyBelowThreshold { actual: 0.4, expected: 0.6 }.category(),
            ErrorCategory::ValidationFailure
        );
        assert_eq!(
            ChurnError::UnknownCategory { column: "gender".into(), value: "x".into() }.category(),
            ErrorCategory::DataContract
        );
        assert_eq!(ChurnError::NonBinaryTarget(3).category(), ErrorCategory::DataContract);
    }

    #[test]
    fn test_only_connectivity_is_retryable() {
        assert!(ChurnError::ObjectStorageError("timeout".into()).is_retryable());
        assert!(ChurnError::DocumentStoreError("refused".into()).is_retryable());
        assert!(!ChurnError::ConfigError("bad".into()).is_retryable());
        assert!(!ChurnError::ModelNotFitted.is_retryable());
    }
}
