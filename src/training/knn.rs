//! K-nearest-neighbours classifier

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{check_fit_inputs, Classifier};
use crate::error::{ChurnError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    #[default]
    Uniform,
    /// Inverse distance; an exact match takes all the weight
    Distance,
}

#[derive(Debug, Clone, Copy)]
struct Neighbor(f64, usize);

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Neighbor {}
impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNeighborsClassifier {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNeighborsClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KNeighborsClassifier {
    pub fn new() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
            x_train: None,
            y_train: None,
        }
    }

    pub fn with_n_neighbors(mut self, k: usize) -> Self {
        self.n_neighbors = k;
        self
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self.metric {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
        }
    }

    fn nearest(&self, train: &Array2<f64>, point: ArrayView1<f64>, k: usize) -> Vec<Neighbor> {
        let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);
        for (i, row) in train.rows().into_iter().enumerate() {
            let candidate = Neighbor(self.distance(point, row), i);
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }
        heap.into_sorted_vec()
    }
}

impl Classifier for KNeighborsClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_inputs(x, y)?;
        if self.n_neighbors == 0 {
            return Err(ChurnError::invalid_parameter(
                "n_neighbors",
                self.n_neighbors,
                "must be positive",
            ));
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (train, labels) = match (&self.x_train, &self.y_train) {
            (Some(train), Some(labels)) => (train, labels),
            _ => return Err(ChurnError::ModelNotFitted),
        };
        if x.ncols() != train.ncols() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let k = self.n_neighbors.min(train.nrows());

        let proba: Vec<f64> = x
            .rows()
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|row| {
                let neighbors = self.nearest(train, row, k);
                match self.weights {
                    WeightScheme::Uniform => {
                        neighbors.iter().map(|n| labels[n.1]).sum::<f64>() / neighbors.len() as f64
                    }
                    WeightScheme::Distance => {
                        let exact: Vec<&Neighbor> = neighbors.iter().filter(|n| n.0 == 0.0).collect();
                        if !exact.is_empty() {
                            return exact.iter().map(|n| labels[n.1]).sum::<f64>() / exact.len() as f64;
                        }
                        let (weighted, total) = neighbors.iter().fold((0.0, 0.0), |(w, t), n| {
                            let weight = 1.0 / n.0;
                            (w + weight * labels[n.1], t + weight)
                        });
                        weighted / total
                    }
                }
            })
            .collect();
        Ok(Array1::from_vec(proba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_uniform_vote() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut knn = KNeighborsClassifier::new().with_n_neighbors(3);
        knn.fit(&x, &y).unwrap();

        let proba = knn.predict_proba(&array![[1.0], [11.0], [5.0]]).unwrap();
        assert_eq!(proba[0], 0.0);
        assert_eq!(proba[1], 1.0);
        assert!((proba[2] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weighting() {
        let x = array![[0.0], [3.0]];
        let y = array![0.0, 1.0];
        let mut knn = KNeighborsClassifier::new()
            .with_n_neighbors(2)
            .with_weights(WeightScheme::Distance);
        knn.fit(&x, &y).unwrap();

        let proba = knn.predict_proba(&array![[1.0], [3.0]]).unwrap();
        // weights 1/1 and 1/2
        assert!((proba[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(proba[1], 1.0);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let mut knn = KNeighborsClassifier::new().with_n_neighbors(5);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict_proba(&array![[0.4]]).unwrap()[0], 0.5);
    }
}
