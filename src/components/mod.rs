//! Pipeline stages
//!
//! Each stage takes its config plus the artifacts of earlier stages and
//! returns its own artifact. Stages never read each other's internals, only
//! the files their artifacts point to.

pub mod data_ingestion;
pub mod data_transformation;
pub mod data_validation;
pub mod model_evaluation;
pub mod model_pusher;
pub mod model_trainer;

pub use data_ingestion::{DataIngestion, DataSource};
pub use data_transformation::DataTransformation;
pub use data_validation::DataValidation;
pub use model_evaluation::{EvaluateModelResponse, ModelEvaluation};
pub use model_pusher::ModelPusher;
pub use model_trainer::ModelTrainer;
