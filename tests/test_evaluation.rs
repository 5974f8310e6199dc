//! Integration test: evaluation of a trained bundle against the deployed one

mod common;

use std::sync::Arc;

use tempfile::tempdir;

use common::*;
use telco_churn::artifact::{ClassificationMetricArtifact, DataIngestionArtifact, ModelTrainerArtifact};
use telco_churn::cloud::{InMemoryModelStorage, ModelStorage};
use telco_churn::components::{EvaluateModelResponse, ModelEvaluation};
use telco_churn::config::ModelEvaluationConfig;
use telco_churn::utils::{drop_columns, write_csv};
use telco_churn::ChurnError;

fn metrics(f1_score: f64) -> ClassificationMetricArtifact {
    ClassificationMetricArtifact {
        f1_score,
        precision_score: f1_score,
        recall_score: f1_score,
        accuracy: f1_score,
    }
}

fn evaluation(
    root: &std::path::Path,
    trained_f1: f64,
    storage: Arc<dyn ModelStorage>,
) -> ModelEvaluation {
    let test_file_path = root.join("test.csv");
    write_csv(&mut customer_table(12), &test_file_path).unwrap();
    ModelEvaluation::new(
        ModelEvaluationConfig {
            changed_threshold_score: 0.02,
            bucket_name: "models".to_string(),
            s3_model_key_path: "model.bin".to_string(),
        },
        DataIngestionArtifact {
            train_file_path: root.join("train.csv"),
            test_file_path,
        },
        ModelTrainerArtifact {
            trained_model_file_path: root.join("model.bin"),
            metric_artifact: metrics(trained_f1),
        },
        storage,
    )
}

#[test]
fn test_acceptance_rule() {
    let better = EvaluateModelResponse::compare(0.75, Some(0.70));
    assert!(better.is_model_accepted);
    assert!((better.difference - 0.05).abs() < 1e-12);

    let first = EvaluateModelResponse::compare(0.75, None);
    assert!(first.is_model_accepted);
    assert_eq!(first.difference, 0.75);
}

#[tokio::test]
async fn test_without_deployment_difference_is_trained_score() {
    let dir = tempdir().unwrap();
    let eval = evaluation(dir.path(), 0.6, Arc::new(InMemoryModelStorage::new()));
    assert!(eval.get_best_model().await.unwrap().is_none());

    let artifact = eval.initiate_model_evaluation().await.unwrap();
    assert!(artifact.is_model_accepted);
    assert_eq!(artifact.changed_accuracy, 0.6);
    assert_eq!(artifact.s3_model_path, "model.bin");
}

#[tokio::test]
async fn test_deployed_model_is_scored_on_raw_test_rows() {
    let dir = tempdir().unwrap();
    let storage: Arc<dyn ModelStorage> = Arc::new(InMemoryModelStorage::new());
    let deployed = train_bundle(20);
    storage
        .upload("models", "model.bin", deployed.to_bytes().unwrap())
        .await
        .unwrap();

    let eval = evaluation(dir.path(), 0.9, Arc::clone(&storage));
    let response = eval.evaluate_model().await.unwrap();
    let best = response.best_model_f1_score.unwrap();
    assert!((0.0..=1.0).contains(&best));
    assert_eq!(response.is_model_accepted, 0.9 > best);
    assert!((response.difference - (0.9 - best)).abs() < 1e-12);
}

#[tokio::test]
async fn test_deployed_scoring_errors_propagate() {
    let dir = tempdir().unwrap();
    let storage: Arc<dyn ModelStorage> = Arc::new(InMemoryModelStorage::new());
    storage
        .upload("models", "model.bin", train_bundle(20).to_bytes().unwrap())
        .await
        .unwrap();

    let eval = evaluation(dir.path(), 0.9, Arc::clone(&storage));
    let mut without_contract =
        drop_columns(&customer_table(12), &["Contract".to_string()]).unwrap();
    write_csv(&mut without_contract, dir.path().join("test.csv")).unwrap();

    let err = eval.evaluate_model().await.unwrap_err();
    assert!(matches!(err, ChurnError::ColumnNotFound(ref names) if names == "Contract"));
}
