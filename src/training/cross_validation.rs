//! Stratified k-fold cross-validation

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::warn;

use super::metrics::accuracy_score;
use super::Classifier;
use crate::error::{ChurnError, Result};

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter that keeps each fold's class proportions close to the
/// full set's.
///
/// Without shuffling, fold membership is deterministic: the class sizes of
/// every fold are found by striding over the sorted labels, then each
/// class's samples are dealt to folds in their original order.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle_seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle_seed: None,
        }
    }

    /// Shuffle each class's samples with a seeded RNG before dealing them out
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        if self.n_splits < 2 {
            return Err(ChurnError::invalid_parameter(
                "n_splits",
                self.n_splits,
                "must be at least 2",
            ));
        }
        if n_samples < self.n_splits {
            return Err(ChurnError::invalid_parameter(
                "n_splits",
                self.n_splits,
                format!("cannot exceed the number of samples ({n_samples})"),
            ));
        }

        let mut class_indices: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in y.iter().enumerate() {
            class_indices.entry(label.to_bits()).or_default().push(idx);
        }
        // Order classes by label value
        let mut classes: Vec<(f64, Vec<usize>)> = class_indices
            .into_iter()
            .map(|(bits, idx)| (f64::from_bits(bits), idx))
            .collect();
        classes.sort_by(|a, b| a.0.total_cmp(&b.0));

        let min_class = classes.iter().map(|(_, idx)| idx.len()).min().unwrap_or(0);
        if min_class < self.n_splits {
            warn!(
                least_populated = min_class,
                n_splits = self.n_splits,
                "The least populated class has fewer members than n_splits"
            );
        }

        // allocation[fold][class]: how many samples of each class land in each fold
        let sorted_classes: Vec<usize> = classes
            .iter()
            .enumerate()
            .flat_map(|(class, (_, idx))| std::iter::repeat(class).take(idx.len()))
            .collect();
        let mut allocation = vec![vec![0usize; classes.len()]; self.n_splits];
        for (position, &class) in sorted_classes.iter().enumerate() {
            allocation[position % self.n_splits][class] += 1;
        }

        let mut rng = self.shuffle_seed.map(ChaCha8Rng::seed_from_u64);
        let mut test_fold = vec![0usize; n_samples];
        for (class, (_, indices)) in classes.iter_mut().enumerate() {
            if let Some(rng) = rng.as_mut() {
                indices.shuffle(rng);
            }
            let mut cursor = 0;
            for (fold, counts) in allocation.iter().enumerate() {
                for &sample in &indices[cursor..cursor + counts[class]] {
                    test_fold[sample] = fold;
                }
                cursor += counts[class];
            }
        }

        Ok((0..self.n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| test_fold[i] == fold_idx);
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect())
    }
}

/// Accuracy of `estimator` on every fold, each fold fitted on a fresh clone.
/// Folds run in parallel; the returned scores are in fold order.
pub fn cross_val_score<C>(
    estimator: &C,
    x: &Array2<f64>,
    y: &Array1<f64>,
    cv: &StratifiedKFold,
) -> Result<Vec<f64>>
where
    C: Classifier + Clone,
{
    let splits = cv.split(y)?;
    splits
        .par_iter()
        .map(|split| {
            let mut model = estimator.clone();
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            model.fit(&x_train, &y_train)?;

            let x_test = x.select(Axis(0), &split.test_indices);
            let y_test = y.select(Axis(0), &split.test_indices);
            let predictions = model.predict(&x_test)?;
            Ok(accuracy_score(&y_test, &predictions))
        })
        .collect()
}

/// Arithmetic mean of fold scores
pub fn mean_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}
