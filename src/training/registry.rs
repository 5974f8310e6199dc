//! Model registry: YAML-declared candidate classifiers and their grids
//!
//! ```yaml
//! random_forest:
//!   class: RandomForestClassifier
//!   params:
//!     n_estimators: 100      # fixed constructor argument
//!     max_depth: [8, 12]     # grid axis
//! ```

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::decision_tree::{Criterion, DecisionTree};
use super::gradient_boosting::GradientBoostingClassifier;
use super::knn::{DistanceMetric, KNeighborsClassifier, WeightScheme};
use super::linear_models::LogisticRegression;
use super::naive_bayes::GaussianNB;
use super::random_forest::{MaxFeatures, RandomForestClassifier};
use super::Estimator;
use crate::error::{ChurnError, Result};

/// A single hyper-parameter value as written in YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("null"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Str(s) => f.write_str(s),
        }
    }
}

/// A parameter entry: a fixed value or a list of grid candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Grid(Vec<ParamValue>),
    Fixed(ParamValue),
}

/// Concrete parameter assignment for one estimator
pub type ParamSet = IndexMap<String, ParamValue>;

/// Registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub class: String,
    #[serde(default)]
    pub params: IndexMap<String, ParamSpec>,
}

impl ModelSpec {
    pub fn kind(&self) -> Result<ClassifierKind> {
        ClassifierKind::from_class_name(&self.class)
    }

    /// Scalar parameters, held fixed across the grid
    pub fn fixed_params(&self) -> ParamSet {
        self.params
            .iter()
            .filter_map(|(name, param)| match param {
                ParamSpec::Fixed(value) => Some((name.clone(), value.clone())),
                ParamSpec::Grid(_) => None,
            })
            .collect()
    }

    pub fn has_grid(&self) -> bool {
        self.params
            .values()
            .any(|param| matches!(param, ParamSpec::Grid(values) if !values.is_empty()))
    }

    /// Cartesian product of the grid axes, each merged over the fixed params.
    ///
    /// Axes are taken in sorted name order with the last axis varying
    /// fastest, so candidate order does not depend on YAML key order.
    pub fn candidates(&self) -> Vec<ParamSet> {
        let mut axes: Vec<(&String, &Vec<ParamValue>)> = self
            .params
            .iter()
            .filter_map(|(name, param)| match param {
                ParamSpec::Grid(values) if !values.is_empty() => Some((name, values)),
                _ => None,
            })
            .collect();
        axes.sort_by(|a, b| a.0.cmp(b.0));

        let mut combos: Vec<ParamSet> = vec![self.fixed_params()];
        for (name, values) in axes {
            combos = combos
                .into_iter()
                .flat_map(|base| {
                    values.iter().map(move |value| {
                        let mut next = base.clone();
                        next.insert(name.clone(), value.clone());
                        next
                    })
                })
                .collect();
        }
        combos
    }

    /// Estimator built from the fixed params only
    pub fn build_default(&self) -> Result<Estimator> {
        self.kind()?.build(&self.fixed_params())
    }
}

/// Ordered set of candidate models, in YAML document order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::ConfigError(format!("cannot read model registry {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and check every entry: the class must be known and every
    /// candidate parameter set must build.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let registry: ModelRegistry = serde_yaml::from_str(content)?;
        if registry.is_empty() {
            return Err(ChurnError::ConfigError("model registry is empty".to_string()));
        }
        for entry in registry.models.values() {
            let kind = entry.kind()?;
            for candidate in entry.candidates() {
                kind.build(&candidate)?;
            }
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModelSpec)> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Compile-time table of supported classifier classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassifierKind {
    LogisticRegression,
    DecisionTree,
    RandomForest,
    KNeighbors,
    GaussianNB,
    GradientBoosting,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 6] = [
        ClassifierKind::LogisticRegression,
        ClassifierKind::DecisionTree,
        ClassifierKind::RandomForest,
        ClassifierKind::KNeighbors,
        ClassifierKind::GaussianNB,
        ClassifierKind::GradientBoosting,
    ];

    pub fn class_name(&self) -> &'static str {
        match self {
            ClassifierKind::LogisticRegression => "LogisticRegression",
            ClassifierKind::DecisionTree => "DecisionTreeClassifier",
            ClassifierKind::RandomForest => "RandomForestClassifier",
            ClassifierKind::KNeighbors => "KNeighborsClassifier",
            ClassifierKind::GaussianNB => "GaussianNB",
            ClassifierKind::GradientBoosting => "GradientBoostingClassifier",
        }
    }

    pub fn from_class_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.class_name() == name)
            .ok_or_else(|| ChurnError::ConfigError(format!("unknown classifier class '{name}'")))
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            ClassifierKind::LogisticRegression => &["C", "max_iter", "tol", "learning_rate", "fit_intercept"],
            ClassifierKind::DecisionTree => &[
                "criterion",
                "max_depth",
                "min_samples_split",
                "min_samples_leaf",
                "max_features",
                "random_state",
            ],
            ClassifierKind::RandomForest => &[
                "n_estimators",
                "criterion",
                "max_depth",
                "min_samples_split",
                "min_samples_leaf",
                "max_features",
                "bootstrap",
                "random_state",
            ],
            ClassifierKind::KNeighbors => &["n_neighbors", "weights", "metric"],
            ClassifierKind::GaussianNB => &["var_smoothing"],
            ClassifierKind::GradientBoosting => &[
                "n_estimators",
                "learning_rate",
                "max_depth",
                "min_samples_split",
                "subsample",
                "random_state",
            ],
        }
    }

    /// Construct an unfitted estimator; unknown names or ill-typed values
    /// are configuration errors
    pub fn build(&self, params: &ParamSet) -> Result<Estimator> {
        let allowed = self.param_names();
        if let Some(unknown) = params.keys().find(|name| !allowed.contains(&name.as_str())) {
            return Err(ChurnError::ConfigError(format!(
                "unknown parameter '{}' for {}",
                unknown,
                self.class_name()
            )));
        }

        let estimator = match self {
            ClassifierKind::LogisticRegression => {
                let mut model = LogisticRegression::new();
                for (name, value) in params {
                    match name.as_str() {
                        "C" => model.c = as_f64(name, value)?,
                        "max_iter" => model.max_iter = as_usize(name, value)?,
                        "tol" => model.tol = as_f64(name, value)?,
                        "learning_rate" => model.learning_rate = as_f64(name, value)?,
                        _ => model.fit_intercept = as_bool(name, value)?,
                    }
                }
                Estimator::LogisticRegression(model)
            }
            ClassifierKind::DecisionTree => {
                let mut model = DecisionTree::new_classifier();
                for (name, value) in params {
                    match name.as_str() {
                        "criterion" => model.criterion = as_criterion(name, value)?,
                        "max_depth" => model.max_depth = as_optional_usize(name, value)?,
                        "min_samples_split" => model.min_samples_split = as_usize(name, value)?.max(2),
                        "min_samples_leaf" => model.min_samples_leaf = as_usize(name, value)?.max(1),
                        "max_features" => model.max_features = as_optional_usize(name, value)?,
                        _ => model.random_state = as_optional_u64(name, value)?,
                    }
                }
                Estimator::DecisionTree(model)
            }
            ClassifierKind::RandomForest => {
                let mut model = RandomForestClassifier::new();
                for (name, value) in params {
                    match name.as_str() {
                        "n_estimators" => model.n_estimators = as_usize(name, value)?,
                        "criterion" => model.criterion = as_criterion(name, value)?,
                        "max_depth" => model.max_depth = as_optional_usize(name, value)?,
                        "min_samples_split" => model.min_samples_split = as_usize(name, value)?.max(2),
                        "min_samples_leaf" => model.min_samples_leaf = as_usize(name, value)?.max(1),
                        "max_features" => model.max_features = as_max_features(name, value)?,
                        "bootstrap" => model.bootstrap = as_bool(name, value)?,
                        _ => model.random_state = as_optional_u64(name, value)?,
                    }
                }
                Estimator::RandomForest(model)
            }
            ClassifierKind::KNeighbors => {
                let mut model = KNeighborsClassifier::new();
                for (name, value) in params {
                    match name.as_str() {
                        "n_neighbors" => model.n_neighbors = as_usize(name, value)?,
                        "weights" => {
                            model.weights = match as_str(name, value)? {
                                "uniform" => WeightScheme::Uniform,
                                "distance" => WeightScheme::Distance,
                                _ => return Err(invalid(name, value, "expected 'uniform' or 'distance'")),
                            }
                        }
                        _ => {
                            model.metric = match as_str(name, value)? {
                                "euclidean" | "minkowski" => DistanceMetric::Euclidean,
                                "manhattan" => DistanceMetric::Manhattan,
                                _ => return Err(invalid(name, value, "expected 'euclidean' or 'manhattan'")),
                            }
                        }
                    }
                }
                Estimator::KNeighbors(model)
            }
            ClassifierKind::GaussianNB => {
                let mut model = GaussianNB::new();
                if let Some(value) = params.get("var_smoothing") {
                    model.var_smoothing = as_f64("var_smoothing", value)?;
                }
                Estimator::GaussianNB(model)
            }
            ClassifierKind::GradientBoosting => {
                let mut model = GradientBoostingClassifier::new();
                for (name, value) in params {
                    match name.as_str() {
                        "n_estimators" => model.n_estimators = as_usize(name, value)?,
                        "learning_rate" => model.learning_rate = as_f64(name, value)?,
                        "max_depth" => model.max_depth = as_usize(name, value)?,
                        "min_samples_split" => model.min_samples_split = as_usize(name, value)?.max(2),
                        "subsample" => model.subsample = as_f64(name, value)?,
                        _ => model.random_state = as_optional_u64(name, value)?,
                    }
                }
                Estimator::GradientBoosting(model)
            }
        };
        Ok(estimator)
    }
}

fn invalid(name: &str, value: &ParamValue, reason: &str) -> ChurnError {
    ChurnError::invalid_parameter(name, value, reason)
}

fn as_f64(name: &str, value: &ParamValue) -> Result<f64> {
    match value {
        ParamValue::Int(i) => Ok(*i as f64),
        ParamValue::Float(x) => Ok(*x),
        _ => Err(invalid(name, value, "expected a number")),
    }
}

fn as_usize(name: &str, value: &ParamValue) -> Result<usize> {
    match value {
        ParamValue::Int(i) if *i >= 0 => Ok(*i as usize),
        _ => Err(invalid(name, value, "expected a non-negative integer")),
    }
}

fn as_optional_usize(name: &str, value: &ParamValue) -> Result<Option<usize>> {
    match value {
        ParamValue::Null => Ok(None),
        _ => as_usize(name, value).map(Some),
    }
}

fn as_optional_u64(name: &str, value: &ParamValue) -> Result<Option<u64>> {
    Ok(as_optional_usize(name, value)?.map(|v| v as u64))
}

fn as_bool(name: &str, value: &ParamValue) -> Result<bool> {
    match value {
        ParamValue::Bool(b) => Ok(*b),
        _ => Err(invalid(name, value, "expected a boolean")),
    }
}

fn as_str<'a>(name: &str, value: &'a ParamValue) -> Result<&'a str> {
    match value {
        ParamValue::Str(s) => Ok(s.as_str()),
        _ => Err(invalid(name, value, "expected a string")),
    }
}

fn as_criterion(name: &str, value: &ParamValue) -> Result<Criterion> {
    match as_str(name, value)? {
        "gini" => Ok(Criterion::Gini),
        "entropy" | "log_loss" => Ok(Criterion::Entropy),
        _ => Err(invalid(name, value, "expected 'gini' or 'entropy'")),
    }
}

fn as_max_features(name: &str, value: &ParamValue) -> Result<MaxFeatures> {
    match value {
        ParamValue::Null => Ok(MaxFeatures::All),
        ParamValue::Int(i) if *i > 0 => Ok(MaxFeatures::Fixed(*i as usize)),
        ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
        ParamValue::Str(s) if s == "sqrt" => Ok(MaxFeatures::Sqrt),
        ParamValue::Str(s) if s == "log2" => Ok(MaxFeatures::Log2),
        _ => Err(invalid(name, value, "expected 'sqrt', 'log2', a positive count or a fraction")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    const REGISTRY: &str = r#"
logistic_regression:
  class: LogisticRegression
  params:
    C: [0.1, 1.0]
    max_iter: 200
knn:
  class: KNeighborsClassifier
  params:
    n_neighbors: [3, 5]
    weights: [uniform, distance]
gaussian_nb:
  class: GaussianNB
"#;

    #[test]
    fn test_registry_keeps_document_order() {
        let registry = ModelRegistry::from_yaml_str(REGISTRY).unwrap();
        let names: Vec<&str> = registry.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["logistic_regression", "knn", "gaussian_nb"]);
        assert!(!registry.get("gaussian_nb").unwrap().has_grid());
    }

    #[test]
    fn test_grid_expansion() {
        let registry = ModelRegistry::from_yaml_str(REGISTRY).unwrap();
        let knn = registry.get("knn").unwrap();
        let candidates = knn.candidates();
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0]["n_neighbors"], ParamValue::Int(3));
        assert_eq!(candidates[0]["weights"], ParamValue::Str("uniform".to_string()));
        assert_eq!(candidates[1]["weights"], ParamValue::Str("distance".to_string()));

        let lr = registry.get("logistic_regression").unwrap();
        let candidates = lr.candidates();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c["max_iter"] == ParamValue::Int(200)));
    }

    #[test]
    fn test_build_applies_params() {
        let registry = ModelRegistry::from_yaml_str(REGISTRY).unwrap();
        match registry.get("logistic_regression").unwrap().build_default().unwrap() {
            Estimator::LogisticRegression(model) => {
                assert_eq!(model.max_iter, 200);
                assert_eq!(model.c, 1.0);
            }
            other => panic!("unexpected estimator {:?}", other.kind()),
        }
    }

    #[test]
    fn test_unknown_class_and_param() {
        let err = ModelRegistry::from_yaml_str("svm:\n  class: SVC\n").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err = ModelRegistry::from_yaml_str(
            "nb:\n  class: GaussianNB\n  params:\n    alpha: 1.0\n",
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_ill_typed_value() {
        let err = ModelRegistry::from_yaml_str(
            "knn:\n  class: KNeighborsClassifier\n  params:\n    weights: [uniform, cosine]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ChurnError::InvalidParameter { .. }));
    }

    #[test]
    fn test_shipped_registry_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/model.yaml");
        let registry = ModelRegistry::from_yaml_file(path).unwrap();
        assert_eq!(registry.len(), 6);
        for (_, entry) in registry.iter() {
            entry.build_default().unwrap();
        }
    }
}
