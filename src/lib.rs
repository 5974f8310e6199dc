//! Telco churn - training pipeline and prediction service
//!
//! A churn classifier for telecom customers, trained by a linear pipeline
//! that passes artifacts from stage to stage:
//! ingestion → validation → transformation → training → evaluation → push.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`components`] - The six pipeline stages
//! - [`pipeline`] - Orchestration of a run and the prediction entry point
//! - [`artifact`] - Records handed between stages
//! - [`config`] - Settings, stage configs and the column schema
//!
//! ## Machine learning
//! - [`preprocessing`] - Scaling, one-hot and label encoding
//! - [`synthetic`] - SMOTE-NC oversampling
//! - [`drift`] - Train/test drift detection
//! - [`training`] - Classifiers, cross-validation, grid search, model registry
//! - [`ensemble`] - Stacking
//! - [`model`] - The persisted model bundle and its deployed handle
//!
//! ## Infrastructure
//! - [`cloud`] - Document store and object storage clients
//! - [`data_access`] - Collection export as a DataFrame
//! - [`server`] - HTTP service
//! - [`cli`] - Command-line interface

pub mod error;

pub mod artifact;
pub mod components;
pub mod config;
pub mod pipeline;

pub mod drift;
pub mod ensemble;
pub mod model;
pub mod preprocessing;
pub mod synthetic;
pub mod training;

pub mod cloud;
pub mod data_access;
pub mod utils;

pub mod cli;
pub mod server;

pub use error::{ChurnError, ErrorCategory, Result};

/// Prelude for common imports
pub mod prelude {
    pub use crate::artifact::*;
    pub use crate::cloud::{DocumentStore, ModelStorage};
    pub use crate::components::DataSource;
    pub use crate::config::{PipelineConfig, SchemaConfig, TrainingPipelineConfig};
    pub use crate::error::{ChurnError, Result};
    pub use crate::model::{ChurnEstimator, ChurnModel};
    pub use crate::pipeline::{ChurnClassifier, ChurnData, TrainingPipeline};
    pub use crate::training::Classifier;
}
