//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde_json::json;
use telco_churn::cloud::Document;
use telco_churn::config::PipelineConfig;
use telco_churn::ensemble::{StackingClassifier, StackingConfig};
use telco_churn::model::ChurnModel;
use telco_churn::pipeline::ChurnData;
use telco_churn::preprocessing::{ColumnTransformer, LabelEncoder};
use telco_churn::training::{Classifier, ClassifierKind, ParamSet};
use telco_churn::utils::column_as_strings;

/// Six-column table used by the end-to-end pipeline test
pub const SMALL_SCHEMA: &str = r#"
columns:
  - customerID: category
  - gender: category
  - tenure: int
  - Contract: category
  - TotalCharges: float
  - Churn: category
numerical_columns: [tenure, TotalCharges]
categorical_columns: [customerID, gender, Contract, Churn]
drop_columns: [customerID]
"#;

pub const TWO_MODEL_REGISTRY: &str = r#"
logistic_regression:
  class: LogisticRegression
decision_tree:
  class: DecisionTreeClassifier
  params:
    max_depth: 3
"#;

/// Five candidates, so the default top-four selection drops one
pub const FIVE_MODEL_REGISTRY: &str = r#"
logistic_regression:
  class: LogisticRegression
  params:
    C: [0.1, 1.0]
decision_tree:
  class: DecisionTreeClassifier
  params:
    max_depth: [2, 4]
knn:
  class: KNeighborsClassifier
  params:
    n_neighbors: 5
gaussian_nb:
  class: GaussianNB
random_forest:
  class: RandomForestClassifier
  params:
    n_estimators: 10
    max_depth: 4
    random_state: 42
"#;

pub const FIVE_MODEL_NAMES: [&str; 5] =
    ["logistic_regression", "decision_tree", "knn", "gaussian_nb", "random_forest"];

/// Ten churn documents; every category appears at least three times and
/// both classes five times
pub fn small_documents() -> Vec<Document> {
    (0..10)
        .map(|i| {
            let churn = i % 2 == 0;
            let tenure = if churn { 1 + i } else { 30 + i };
            let contract = if (i / 2) % 2 == 0 { "Month-to-month" } else { "Two year" };
            let value = json!({
                "_id": format!("oid{i}"),
                "customerID": format!("{i:04}-CUST"),
                "gender": if churn { "Female" } else { "Male" },
                "tenure": tenure,
                "Contract": contract,
                "TotalCharges": format!("{:.2}", tenure as f64 * 55.5),
                "Churn": if churn { "Yes" } else { "No" },
            });
            value.as_object().cloned().unwrap()
        })
        .collect()
}

const OPTIONS: &[(&str, &[&str])] = &[
    ("gender", &["Female", "Male"]),
    ("Partner", &["Yes", "No"]),
    ("Dependents", &["No", "Yes"]),
    ("PhoneService", &["Yes", "No"]),
    ("MultipleLines", &["No", "Yes", "No phone service"]),
    ("InternetService", &["Fiber optic", "DSL", "No"]),
    ("OnlineSecurity", &["No", "Yes", "No internet service"]),
    ("OnlineBackup", &["Yes", "No", "No internet service"]),
    ("DeviceProtection", &["No", "Yes", "No internet service"]),
    ("TechSupport", &["No", "Yes", "No internet service"]),
    ("StreamingTV", &["Yes", "No", "No internet service"]),
    ("StreamingMovies", &["No", "Yes", "No internet service"]),
    ("Contract", &["Month-to-month", "One year", "Two year"]),
    ("PaperlessBilling", &["Yes", "No"]),
    (
        "PaymentMethod",
        &[
            "Electronic check",
            "Mailed check",
            "Bank transfer (automatic)",
            "Credit card (automatic)",
        ],
    ),
];

/// Even rows churn: short tenure, high monthly charges
pub fn customer_record(i: usize) -> ChurnData {
    let churn = i % 2 == 0;
    let tenure = if churn { 1 + (i % 5) as i64 } else { 30 + (i % 20) as i64 };
    let monthly = if churn { 80.0 + (i % 7) as f64 } else { 30.0 + (i % 9) as f64 };

    let mut fields = serde_json::Map::new();
    for (name, options) in OPTIONS {
        fields.insert(name.to_string(), json!(options[i % options.len()]));
    }
    fields.insert("SeniorCitizen".to_string(), json!((i % 3 == 0) as i64));
    fields.insert("tenure".to_string(), json!(tenure));
    fields.insert("MonthlyCharges".to_string(), json!(monthly));
    fields.insert("TotalCharges".to_string(), json!(monthly * tenure as f64));
    serde_json::from_value(serde_json::Value::Object(fields)).unwrap()
}

pub fn churn_label(i: usize) -> &'static str {
    if i % 2 == 0 {
        "Yes"
    } else {
        "No"
    }
}

/// Raw table in the layout of the churn collection
pub fn customer_table(n: usize) -> DataFrame {
    let frames: Vec<DataFrame> = (0..n)
        .map(|i| customer_record(i).to_dataframe().unwrap())
        .collect();
    let mut df = frames[0].clone();
    for frame in &frames[1..] {
        df.vstack_mut(frame).unwrap();
    }
    let ids: Vec<String> = (0..n).map(|i| format!("{i:04}-CUST")).collect();
    let labels: Vec<&str> = (0..n).map(churn_label).collect();
    df.insert_column(0, Column::new("customerID".into(), ids)).unwrap();
    df.with_column(Column::new("Churn".into(), labels)).unwrap();
    df
}

/// Bundle fitted directly on [`customer_table`]
pub fn train_bundle(n: usize) -> ChurnModel {
    let df = customer_table(n);
    let target = column_as_strings(&df, "Churn").unwrap();
    let features = df.drop("Churn").unwrap().drop("customerID").unwrap();

    let mut transformer = ColumnTransformer::from_dtypes(&features);
    let x = transformer.fit_transform(&features).unwrap();
    let mut label_encoder = LabelEncoder::new("Churn");
    let y = label_encoder.fit_transform(&target).unwrap();

    let mut classifier = StackingClassifier::new(vec![
        (
            "gaussian_nb".to_string(),
            ClassifierKind::GaussianNB.build(&ParamSet::new()).unwrap(),
        ),
        (
            "decision_tree".to_string(),
            ClassifierKind::DecisionTree.build(&ParamSet::new()).unwrap(),
        ),
    ])
    .with_config(StackingConfig {
        n_folds: 3,
        passthrough: false,
    });
    classifier.fit(&x, &y).unwrap();
    ChurnModel::new(transformer, label_encoder, classifier)
}

/// Settings rooted in `root` with a permissive accuracy gate
pub fn settings(root: &Path, schema: &Path, registry: &Path) -> PipelineConfig {
    let mut settings = PipelineConfig::default()
        .with_artifact_dir(root.join("artifact"))
        .with_schema_file(schema)
        .with_model_config_file(registry)
        .with_expected_accuracy(0.0);
    settings.cv_folds = 3;
    settings.top_k_models = 2;
    settings.model_bucket = "test-bucket".to_string();
    settings
}

/// [`settings`] with the shipped fold count and top-k selection
pub fn default_fold_settings(root: &Path, schema: &Path, registry: &Path) -> PipelineConfig {
    let defaults = PipelineConfig::default();
    let mut settings = settings(root, schema, registry);
    settings.cv_folds = defaults.cv_folds;
    settings.top_k_models = defaults.top_k_models;
    settings
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn shipped_schema() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/schema.yaml")
}
