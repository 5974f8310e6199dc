//! Data drift detection
//!
//! Two-sample tests comparing the training split against the test split,
//! aggregated into a per-column YAML report.

mod report;

pub use report::{ColumnDrift, ColumnType, DatasetDriftReport};
pub use statistical_tests::{ChiSquareTest, KolmogorovSmirnovTest};

use serde::{Deserialize, Serialize};

/// Outcome of one two-sample test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    pub stat_test: String,
    pub statistic: f64,
    pub p_value: f64,
    /// Significance level the p-value is compared against
    pub threshold: f64,
    pub drift_detected: bool,
}

impl DriftResult {
    pub fn from_p_value(stat_test: &str, statistic: f64, p_value: f64, alpha: f64) -> Self {
        Self {
            stat_test: stat_test.to_string(),
            statistic,
            p_value,
            threshold: alpha,
            drift_detected: p_value < alpha,
        }
    }
}
