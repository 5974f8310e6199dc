//! Training run orchestration and the prediction entry point

mod prediction;
mod training_pipeline;

pub use prediction::{churn_status, ChurnClassifier, ChurnData, CHURN_MESSAGE, STAY_MESSAGE};
pub use training_pipeline::{PipelineRun, TrainingPipeline};
