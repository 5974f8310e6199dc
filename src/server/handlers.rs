//! Request handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Form, Json,
};
use serde_json::{json, Value};
use tracing::{error, info};

use super::error::Result;
use super::state::AppState;
use crate::cloud::MongoDocumentStore;
use crate::components::DataSource;
use crate::pipeline::{churn_status, ChurnData, TrainingPipeline};

pub const TRAINING_SUCCESS: &str = "Training successful !!";

const SELECT_FIELDS: &[(&str, &[&str])] = &[
    ("gender", &["Female", "Male"]),
    ("SeniorCitizen", &["0", "1"]),
    ("Partner", &["Yes", "No"]),
    ("Dependents", &["Yes", "No"]),
    ("PhoneService", &["Yes", "No"]),
    ("MultipleLines", &["No phone service", "No", "Yes"]),
    ("InternetService", &["DSL", "Fiber optic", "No"]),
    ("OnlineSecurity", &["No", "Yes", "No internet service"]),
    ("OnlineBackup", &["No", "Yes", "No internet service"]),
    ("DeviceProtection", &["No", "Yes", "No internet service"]),
    ("TechSupport", &["No", "Yes", "No internet service"]),
    ("StreamingTV", &["No", "Yes", "No internet service"]),
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

const NUMBER_FIELDS: &[&str] = &["tenure", "MonthlyCharges", "TotalCharges"];

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The input form, with the last prediction result if there is one
pub fn render_page(result: Option<&str>) -> String {
    let mut fields = String::new();
    for (name, options) in SELECT_FIELDS {
        let options: String = options
            .iter()
            .map(|o| format!("<option value=\"{0}\">{0}</option>", escape_html(o)))
            .collect();
        fields.push_str(&format!(
            "<label>{name}<select name=\"{name}\">{options}</select></label>\n"
        ));
    }
    for name in NUMBER_FIELDS {
        fields.push_str(&format!(
            "<label>{name}<input type=\"number\" step=\"any\" name=\"{name}\" required></label>\n"
        ));
    }
    let result = result
        .map(|r| format!("<p class=\"result\">{}</p>", escape_html(r)))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Telco Churn Prediction</title></head>\n\
         <body>\n<h1>Telco Customer Churn</h1>\n<form method=\"post\" action=\"/\">\n{fields}\
         <button type=\"submit\">Predict</button>\n</form>\n{result}\n</body>\n</html>\n"
    )
}

pub async fn index() -> Html<String> {
    Html(render_page(None))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn run_training(state: &AppState) -> crate::error::Result<()> {
    let source = match &state.training_source {
        Some(source) => source.clone(),
        None => DataSource::Collection(Arc::new(MongoDocumentStore::from_env().await?)),
    };
    let run = TrainingPipeline::new(state.pipeline.clone(), source, Arc::clone(&state.storage))
        .run_pipeline()
        .await?;
    if run.pusher.is_some() {
        state.reload_classifier().await;
    }
    Ok(())
}

pub async fn train(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match run_training(&state).await {
        Ok(()) => (StatusCode::OK, TRAINING_SUCCESS.to_string()),
        Err(e) => {
            error!(error = %e, category = %e.category(), "Training pipeline failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error Occurred! {e}"))
        }
    }
}

pub async fn predict_form(
    State(state): State<Arc<AppState>>,
    Form(record): Form<ChurnData>,
) -> Html<String> {
    let classifier = state.classifier().await;
    let message = match classifier.predict_one(&record).await {
        Ok(prediction) => {
            info!(prediction, "Form prediction");
            churn_status(prediction).to_string()
        }
        Err(e) => {
            error!(error = %e, "Form prediction failed");
            format!("Error: {e}")
        }
    };
    Html(render_page(Some(&message)))
}

pub async fn predict_json(
    State(state): State<Arc<AppState>>,
    Json(record): Json<ChurnData>,
) -> Result<Json<Value>> {
    let prediction = state.classifier().await.predict_one(&record).await?;
    Ok(Json(json!({
        "prediction": prediction as i64,
        "status": churn_status(prediction),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_lists_every_field() {
        let page = render_page(None);
        for (name, _) in SELECT_FIELDS {
            assert!(page.contains(&format!("name=\"{name}\"")));
        }
        for name in NUMBER_FIELDS {
            assert!(page.contains(&format!("name=\"{name}\"")));
        }
        assert!(!page.contains("class=\"result\""));
    }

    #[test]
    fn test_result_is_escaped() {
        let page = render_page(Some("Error: <bad>"));
        assert!(page.contains("Error: &lt;bad&gt;"));
    }
}
