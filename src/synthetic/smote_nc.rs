//! SMOTE-NC: oversampling for frames with numeric and categorical columns

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{class_indices, ResampleSummary};
use crate::error::{ChurnError, Result};
use crate::utils::{column_as_f64, column_as_strings, is_numeric_dtype};

#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

/// Balances every class up to the majority count.
///
/// Synthetic numeric values interpolate between a minority sample and one of
/// its k nearest minority neighbours; synthetic categorical values take the
/// most frequent category among those k neighbours. Each categorical mismatch
/// adds `median_std² / 2` to the squared distance, where `median_std` is the
/// median standard deviation of the numeric columns within the class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoteNc {
    k_neighbors: usize,
    seed: u64,
}

impl Default for SmoteNc {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }
}

impl SmoteNc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Resample `features`/`target`. Original rows come first, synthetic rows
    /// follow, grouped by class in sorted label order.
    pub fn fit_resample(
        &self,
        features: &DataFrame,
        target: &[String],
    ) -> Result<(DataFrame, Vec<String>, ResampleSummary)> {
        if features.height() != target.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} target values", features.height()),
                actual: format!("{} target values", target.len()),
            });
        }

        let indices = class_indices(target);
        let majority = indices.values().map(Vec::len).max().unwrap_or(0);
        if indices.len() < 2 {
            warn!(classes = indices.len(), "SMOTE-NC skipped, fewer than two classes");
            return Ok((
                features.clone(),
                target.to_vec(),
                ResampleSummary {
                    n_original: target.len(),
                    n_synthetic: 0,
                },
            ));
        }

        let columns = self.extract_columns(features)?;
        let numeric_idx: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| matches!(c, ColumnData::Numeric(_)).then_some(i))
            .collect();
        let categorical_idx: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| matches!(c, ColumnData::Categorical(_)).then_some(i))
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut synthetic_rows: Vec<(Vec<f64>, Vec<String>)> = Vec::new();
        let mut synthetic_target: Vec<String> = Vec::new();

        for (label, rows) in &indices {
            let n_to_generate = majority - rows.len();
            if n_to_generate == 0 {
                continue;
            }
            if rows.len() < 2 {
                warn!(class = %label, samples = rows.len(), "Minority class too small to interpolate");
                continue;
            }

            let numeric: Vec<Vec<f64>> = rows
                .iter()
                .map(|&r| {
                    numeric_idx
                        .iter()
                        .map(|&c| match &columns[c] {
                            ColumnData::Numeric(v) => v[r],
                            ColumnData::Categorical(_) => 0.0,
                        })
                        .collect()
                })
                .collect();
            let categorical: Vec<Vec<&str>> = rows
                .iter()
                .map(|&r| {
                    categorical_idx
                        .iter()
                        .map(|&c| match &columns[c] {
                            ColumnData::Categorical(v) => v[r].as_str(),
                            ColumnData::Numeric(_) => "",
                        })
                        .collect()
                })
                .collect();

            let penalty = median_std(&numeric);
            let k = self.k_neighbors.min(rows.len() - 1);
            let neighbors: Vec<Vec<usize>> = (0..rows.len())
                .map(|i| nearest_neighbors(i, &numeric, &categorical, penalty, k))
                .collect();

            for _ in 0..n_to_generate {
                let sample = rng.gen_range(0..rows.len());
                let neighbor = neighbors[sample][rng.gen_range(0..k)];
                let gap: f64 = rng.gen();

                let num_values: Vec<f64> = numeric[sample]
                    .iter()
                    .zip(&numeric[neighbor])
                    .map(|(&a, &b)| a + gap * (b - a))
                    .collect();
                let cat_values: Vec<String> = (0..categorical_idx.len())
                    .map(|j| most_frequent(neighbors[sample].iter().map(|&n| categorical[n][j])))
                    .collect();

                synthetic_rows.push((num_values, cat_values));
                synthetic_target.push(label.clone());
            }
            info!(class = %label, generated = n_to_generate, "Generated synthetic samples");
        }

        let n_synthetic = synthetic_rows.len();
        let mut out_columns: Vec<Column> = Vec::with_capacity(columns.len());
        for (c, (data, name)) in columns
            .into_iter()
            .zip(features.get_column_names())
            .enumerate()
        {
            let series = match data {
                ColumnData::Numeric(mut values) => {
                    let j = numeric_idx.iter().position(|&i| i == c).unwrap_or(0);
                    values.extend(synthetic_rows.iter().map(|(num, _)| num[j]));
                    Series::new(name.clone(), values)
                }
                ColumnData::Categorical(mut values) => {
                    let j = categorical_idx.iter().position(|&i| i == c).unwrap_or(0);
                    values.extend(synthetic_rows.iter().map(|(_, cat)| cat[j].clone()));
                    Series::new(name.clone(), values)
                }
            };
            out_columns.push(series.into());
        }

        let mut out_target = target.to_vec();
        out_target.extend(synthetic_target);

        Ok((
            DataFrame::new(out_columns)?,
            out_target,
            ResampleSummary {
                n_original: target.len(),
                n_synthetic,
            },
        ))
    }

    fn extract_columns(&self, df: &DataFrame) -> Result<Vec<ColumnData>> {
        df.get_columns()
            .iter()
            .map(|column| {
                let name = column.name().as_str();
                match column.dtype() {
                    dtype if is_numeric_dtype(dtype) => Ok(ColumnData::Numeric(column_as_f64(df, name)?)),
                    DataType::String => Ok(ColumnData::Categorical(column_as_strings(df, name)?)),
                    other => Err(ChurnError::DataError(format!(
                        "column '{name}' has unsupported dtype {other:?} for SMOTE-NC"
                    ))),
                }
            })
            .collect()
    }
}

fn median_std(numeric: &[Vec<f64>]) -> f64 {
    let n_rows = numeric.len();
    let n_cols = numeric.first().map_or(0, Vec::len);
    if n_rows == 0 || n_cols == 0 {
        return 1.0;
    }
    let mut stds: Vec<f64> = (0..n_cols)
        .map(|j| {
            let mean = numeric.iter().map(|r| r[j]).sum::<f64>() / n_rows as f64;
            let var = numeric.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n_rows as f64;
            var.sqrt()
        })
        .collect();
    stds.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = stds.len() / 2;
    if stds.len() % 2 == 0 {
        (stds[mid - 1] + stds[mid]) / 2.0
    } else {
        stds[mid]
    }
}

fn nearest_neighbors(
    target: usize,
    numeric: &[Vec<f64>],
    categorical: &[Vec<&str>],
    penalty: f64,
    k: usize,
) -> Vec<usize> {
    let mismatch_cost = penalty * penalty / 2.0;
    let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
    for other in 0..numeric.len() {
        if other == target {
            continue;
        }
        let numeric_part: f64 = numeric[target]
            .iter()
            .zip(&numeric[other])
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        let mismatches = categorical[target]
            .iter()
            .zip(&categorical[other])
            .filter(|(a, b)| a != b)
            .count();
        let candidate = DistIdx(numeric_part + mismatch_cost * mismatches as f64, other);
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }
    }
    let mut found = heap.into_sorted_vec();
    found.truncate(k);
    found.into_iter().map(|DistIdx(_, i)| i).collect()
}

/// Most common value; ties go to the lexicographically smallest
fn most_frequent<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn imbalanced() -> (DataFrame, Vec<String>) {
        let df = df! {
            "tenure" => &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 30.0, 31.0, 32.0],
            "Contract" => &["M", "M", "M", "O", "O", "M", "O", "M", "T", "T", "O"],
        }
        .unwrap();
        let target = labels(&["No", "No", "No", "No", "No", "No", "No", "No", "Yes", "Yes", "Yes"]);
        (df, target)
    }

    #[test]
    fn test_balances_classes() {
        let (df, target) = imbalanced();
        let (out, out_target, summary) = SmoteNc::new().fit_resample(&df, &target).unwrap();

        assert_eq!(summary.n_synthetic, 5);
        assert_eq!(summary.n_total(), 16);
        assert_eq!(out.height(), 16);
        assert_eq!(out_target.iter().filter(|t| *t == "Yes").count(), 8);
        assert_eq!(out_target.iter().filter(|t| *t == "No").count(), 8);

        let tenure = column_as_f64(&out, "tenure").unwrap();
        for value in &tenure[11..] {
            assert!((30.0..=32.0).contains(value));
        }
        let contract = column_as_strings(&out, "Contract").unwrap();
        for value in &contract[11..] {
            assert!(value == "T" || value == "O");
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let (df, target) = imbalanced();
        let (a, _, _) = SmoteNc::new().fit_resample(&df, &target).unwrap();
        let (b, _, _) = SmoteNc::new().fit_resample(&df, &target).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_single_class_passthrough() {
        let df = df! { "x" => &[1.0f64, 2.0] }.unwrap();
        let target = labels(&["No", "No"]);
        let (out, out_target, summary) = SmoteNc::new().fit_resample(&df, &target).unwrap();
        assert!(out.equals(&df));
        assert_eq!(out_target, target);
        assert_eq!(summary.n_synthetic, 0);
    }

    #[test]
    fn test_single_sample_minority_is_left_alone() {
        let df = df! { "x" => &[1.0f64, 2.0, 3.0] }.unwrap();
        let target = labels(&["No", "No", "Yes"]);
        let (out, _, summary) = SmoteNc::new().fit_resample(&df, &target).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(summary.n_synthetic, 0);
    }

    #[test]
    fn test_most_frequent_tie_break() {
        assert_eq!(most_frequent(["b", "a", "b", "a"].into_iter()), "a");
        assert_eq!(most_frequent(["b", "b", "a"].into_iter()), "b");
    }
}
