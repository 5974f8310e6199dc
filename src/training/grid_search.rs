//! Exhaustive hyper-parameter search scored by cross-validated accuracy

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use tracing::{debug, info};

use super::cross_validation::{cross_val_score, mean_score, StratifiedKFold};
use super::registry::{ClassifierKind, ParamSet};
use super::{Classifier, Estimator};
use crate::error::{ChurnError, Result};

/// Outcome of one grid search
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    /// Best candidate refit on the full training set
    pub best_estimator: Estimator,
    /// Mean CV accuracy of every candidate, in candidate order
    pub candidate_scores: Vec<f64>,
}

pub struct GridSearchCV {
    kind: ClassifierKind,
    candidates: Vec<ParamSet>,
    cv: StratifiedKFold,
}

impl GridSearchCV {
    pub fn new(kind: ClassifierKind, candidates: Vec<ParamSet>) -> Self {
        Self {
            kind,
            candidates,
            cv: StratifiedKFold::new(5),
        }
    }

    pub fn with_cv(mut self, cv: StratifiedKFold) -> Self {
        self.cv = cv;
        self
    }

    /// Score every candidate in parallel, then refit the best one.
    ///
    /// On equal mean scores the earlier candidate wins.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<GridSearchResult> {
        if self.candidates.is_empty() {
            return Err(ChurnError::ConfigError(format!(
                "empty parameter grid for {}",
                self.kind.class_name()
            )));
        }

        let candidate_scores: Vec<f64> = self
            .candidates
            .par_iter()
            .map(|params| {
                let estimator = self.kind.build(params)?;
                let scores = cross_val_score(&estimator, x, y, &self.cv)?;
                let mean = mean_score(&scores);
                debug!(class = self.kind.class_name(), ?params, mean, "Grid candidate scored");
                Ok(mean)
            })
            .collect::<Result<_>>()?;

        let mut best_idx = 0;
        for (idx, &score) in candidate_scores.iter().enumerate() {
            if score > candidate_scores[best_idx] {
                best_idx = idx;
            }
        }

        let best_params = self.candidates[best_idx].clone();
        let mut best_estimator = self.kind.build(&best_params)?;
        best_estimator.fit(x, y)?;

        info!(
            class = self.kind.class_name(),
            best_score = candidate_scores[best_idx],
            n_candidates = self.candidates.len(),
            "Grid search finished"
        );

        Ok(GridSearchResult {
            best_params,
            best_score: candidate_scores[best_idx],
            best_estimator,
            candidate_scores,
        })
    }
}
