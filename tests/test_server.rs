//! Integration test: HTTP routes

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tempfile::tempdir;
use tower::ServiceExt;

use common::*;
use telco_churn::cloud::{InMemoryModelStorage, ModelStorage};
use telco_churn::components::DataSource;
use telco_churn::config::PipelineConfig;
use telco_churn::pipeline::{ChurnData, CHURN_MESSAGE, STAY_MESSAGE};
use telco_churn::server::{create_router, AppState, ServerConfig, TRAINING_SUCCESS};
use telco_churn::utils::write_csv;

fn server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

async fn deployed_state(pipeline: PipelineConfig) -> Arc<AppState> {
    let storage: Arc<dyn ModelStorage> = Arc::new(InMemoryModelStorage::new());
    storage
        .upload(
            &pipeline.model_bucket,
            &pipeline.model_key,
            train_bundle(20).to_bytes().unwrap(),
        )
        .await
        .unwrap();
    Arc::new(AppState::new(server_config(), pipeline, storage))
}

fn empty_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        server_config(),
        PipelineConfig::default(),
        Arc::new(InMemoryModelStorage::new()),
    ))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_body(record: &ChurnData) -> String {
    let value = serde_json::to_value(record).unwrap();
    value
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| {
            let raw = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let encoded = raw.replace(' ', "+").replace('(', "%28").replace(')', "%29");
            format!("{k}={encoded}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = create_router(empty_state())
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_serves_form() {
    let response = create_router(empty_state())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("<form"));
    assert!(page.contains("name=\"PaymentMethod\""));
}

#[tokio::test]
async fn test_json_prediction() {
    let app = create_router(deployed_state(PipelineConfig::default()).await);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&customer_record(0)).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["prediction"], 1);
    assert_eq!(body["status"], CHURN_MESSAGE);
}

#[tokio::test]
async fn test_form_prediction_renders_status() {
    let app = create_router(deployed_state(PipelineConfig::default()).await);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form_body(&customer_record(1))))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(STAY_MESSAGE));
}

#[tokio::test]
async fn test_prediction_without_deployment() {
    let app = create_router(empty_state());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&customer_record(0)).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form_body(&customer_record(0))))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Error: "));
}

#[tokio::test]
async fn test_train_route_runs_pipeline() {
    let dir = tempdir().unwrap();
    let registry_path = write_file(dir.path(), "model.yaml", TWO_MODEL_REGISTRY);
    let csv_path = dir.path().join("raw.csv");
    write_csv(&mut customer_table(30), &csv_path).unwrap();

    let state = AppState::new(
        server_config(),
        settings(dir.path(), &shipped_schema(), &registry_path),
        Arc::new(InMemoryModelStorage::new()),
    )
    .with_training_source(DataSource::CsvFile(csv_path));

    let response = create_router(Arc::new(state))
        .oneshot(Request::builder().uri("/train").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, TRAINING_SUCCESS);
}

#[tokio::test]
async fn test_train_route_reports_errors() {
    let dir = tempdir().unwrap();
    let registry_path = write_file(dir.path(), "model.yaml", TWO_MODEL_REGISTRY);
    let state = AppState::new(
        server_config(),
        settings(dir.path(), &shipped_schema(), &registry_path),
        Arc::new(InMemoryModelStorage::new()),
    )
    .with_training_source(DataSource::CsvFile(dir.path().join("absent.csv")));

    let response = create_router(Arc::new(state))
        .oneshot(Request::builder().uri("/train").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.starts_with("Error Occurred! "));
}

#[tokio::test]
async fn test_unknown_route() {
    let response = create_router(empty_state())
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
