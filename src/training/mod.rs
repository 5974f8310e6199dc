//! Model training module
//!
//! Binary classifiers written over `ndarray`, plus the selection machinery
//! the trainer stage uses:
//! - Logistic regression, CART trees, random forests, gradient boosting
//! - K-nearest neighbours and Gaussian naive Bayes
//! - Stratified k-fold cross-validation and exhaustive grid search
//! - A YAML model registry mapping names to classifier kinds and grids

pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod grid_search;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod naive_bayes;
pub mod random_forest;
pub mod registry;

pub use cross_validation::{cross_val_score, CVSplit, StratifiedKFold};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::GradientBoostingClassifier;
pub use grid_search::{GridSearchCV, GridSearchResult};
pub use knn::{DistanceMetric, KNeighborsClassifier, WeightScheme};
pub use linear_models::LogisticRegression;
pub use metrics::{accuracy_score, f1_score, precision_recall_f1, ConfusionMatrix};
pub use naive_bayes::GaussianNB;
pub use random_forest::{MaxFeatures, RandomForestClassifier};
pub use registry::{ClassifierKind, ModelRegistry, ModelSpec, ParamSet, ParamSpec, ParamValue};

use std::collections::BTreeSet;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};

/// Binary classifier over a dense feature matrix.
///
/// Labels are `0.0`/`1.0`; `predict_proba` returns the probability of the
/// positive class for every row.
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }
}

/// Shared precondition of every `fit`: matching lengths, at least one row,
/// labels drawn from {0, 1}.
pub(crate) fn check_fit_inputs(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ChurnError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(ChurnError::DataError("cannot fit on an empty matrix".to_string()));
    }
    if y.iter().any(|&v| v != 0.0 && v != 1.0) {
        let distinct: BTreeSet<u64> = y.iter().map(|v| v.to_bits()).collect();
        return Err(ChurnError::NonBinaryTarget(distinct.len()));
    }
    Ok(())
}

/// Any of the supported classifiers, as one serializable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForestClassifier),
    KNeighbors(KNeighborsClassifier),
    GaussianNB(GaussianNB),
    GradientBoosting(GradientBoostingClassifier),
}

impl Estimator {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Estimator::LogisticRegression(_) => ClassifierKind::LogisticRegression,
            Estimator::DecisionTree(_) => ClassifierKind::DecisionTree,
            Estimator::RandomForest(_) => ClassifierKind::RandomForest,
            Estimator::KNeighbors(_) => ClassifierKind::KNeighbors,
            Estimator::GaussianNB(_) => ClassifierKind::GaussianNB,
            Estimator::GradientBoosting(_) => ClassifierKind::GradientBoosting,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Estimator::LogisticRegression(m) => m,
            Estimator::DecisionTree(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::KNeighbors(m) => m,
            Estimator::GaussianNB(m) => m,
            Estimator::GradientBoosting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Estimator::LogisticRegression(m) => m,
            Estimator::DecisionTree(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::KNeighbors(m) => m,
            Estimator::GaussianNB(m) => m,
            Estimator::GradientBoosting(m) => m,
        }
    }
}

impl Classifier for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict_proba(x)
    }
}
