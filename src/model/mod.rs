//! Deployable model bundle and its object-storage wrapper

mod churn_model;
mod estimator;

pub use churn_model::{ChurnModel, BUNDLE_FORMAT_VERSION};
pub use estimator::ChurnEstimator;
