//! Ensemble methods module
//!
//! Stacking of tuned base classifiers under a logistic-regression
//! meta-learner.

mod stacking;

pub use stacking::{StackingClassifier, StackingConfig};
