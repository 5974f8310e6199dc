//! Synthetic minority oversampling
//!
//! Provides SMOTE-NC for mixed numeric/categorical training frames.

mod smote_nc;

pub use smote_nc::SmoteNc;

use std::collections::BTreeMap;

/// Row counts before and after resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleSummary {
    pub n_original: usize,
    pub n_synthetic: usize,
}

impl ResampleSummary {
    pub fn n_total(&self) -> usize {
        self.n_original + self.n_synthetic
    }
}

/// Row indices per class label, labels in sorted order
pub fn class_indices(labels: &[String]) -> BTreeMap<String, Vec<usize>> {
    let mut indices: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        indices.entry(label.clone()).or_default().push(i);
    }
    indices
}

/// Count per class label
pub fn class_counts(labels: &[String]) -> BTreeMap<String, usize> {
    class_indices(labels)
        .into_iter()
        .map(|(label, rows)| (label, rows.len()))
        .collect()
}
