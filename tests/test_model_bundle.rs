//! Integration test: model bundle persistence and the deployed-model handle

mod common;

use std::sync::Arc;

use tempfile::tempdir;

use common::*;
use telco_churn::cloud::{InMemoryModelStorage, ModelStorage};
use telco_churn::model::{ChurnEstimator, ChurnModel};
use telco_churn::utils::drop_columns;
use telco_churn::ChurnError;

#[test]
fn test_bytes_roundtrip_predicts_identically() {
    let bundle = train_bundle(20);
    let df = customer_table(20);

    let before = bundle.predict(&df).unwrap();
    let restored = ChurnModel::from_bytes(&bundle.to_bytes().unwrap()).unwrap();
    let after = restored.predict(&df).unwrap();

    assert_eq!(before, after);
    assert_eq!(restored.trained_at(), bundle.trained_at());
}

#[test]
fn test_file_roundtrip_and_labels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/model.bin");
    let bundle = train_bundle(20);
    bundle.save(&path).unwrap();

    let loaded = ChurnModel::load(&path).unwrap();
    let labels = loaded.predict_labels(&customer_table(4)).unwrap();
    assert_eq!(labels, vec!["Yes", "No", "Yes", "No"]);
}

#[test]
fn test_transform_is_repeatable() {
    let bundle = train_bundle(20);
    let df = customer_table(20);
    let first = bundle.preprocessor().transform(&df).unwrap();
    let second = bundle.preprocessor().transform(&df).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unseen_category_is_rejected() {
    let bundle = train_bundle(20);
    let mut record = customer_record(0);
    record.contract = "Ten year".to_string();
    let err = bundle.predict(&record.to_dataframe().unwrap()).unwrap_err();
    assert!(matches!(err, ChurnError::UnknownCategory { ref column, .. } if column == "Contract"));
}

#[test]
fn test_request_missing_columns_are_named() {
    let bundle = train_bundle(20);
    let df = drop_columns(&customer_table(4), &["tenure".to_string(), "Contract".to_string()]).unwrap();
    let err = bundle.predict(&df).unwrap_err();
    match err {
        ChurnError::ColumnNotFound(names) => {
            assert!(names.contains("tenure"));
            assert!(names.contains("Contract"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_garbage_bytes_are_rejected() {
    assert!(ChurnModel::from_bytes(&[1, 2, 3]).is_err());
}

#[tokio::test]
async fn test_estimator_loads_uploaded_bundle_once() {
    let storage: Arc<dyn ModelStorage> = Arc::new(InMemoryModelStorage::new());
    let estimator = ChurnEstimator::new(Arc::clone(&storage), "models", "model.bin");
    assert!(!estimator.is_model_present().await.unwrap());

    let dir = tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let bundle = train_bundle(20);
    bundle.save(&path).unwrap();
    estimator.save_model(&path).await.unwrap();
    assert!(estimator.is_model_present().await.unwrap());

    let first = estimator.load_model().await.unwrap();
    let second = estimator.load_model().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let df = customer_table(6);
    assert_eq!(estimator.predict(&df).await.unwrap(), bundle.predict(&df).unwrap());
}
