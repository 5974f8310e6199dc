//! Single-customer prediction against the deployed bundle

use std::sync::Arc;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cloud::ModelStorage;
use crate::config::constants::POSITIVE_LABEL;
use crate::error::{ChurnError, Result};
use crate::model::ChurnEstimator;

pub const CHURN_MESSAGE: &str = "Customer will Churn";
pub const STAY_MESSAGE: &str = "Customer will Stay";

/// One customer record, with the column names of the raw churn table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnData {
    pub gender: String,
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: i64,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,
    pub tenure: i64,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
}

impl ChurnData {
    /// One-row frame in raw table layout
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = df! {
            "gender" => [self.gender.as_str()],
            "SeniorCitizen" => [self.senior_citizen],
            "Partner" => [self.partner.as_str()],
            "Dependents" => [self.dependents.as_str()],
            "tenure" => [self.tenure],
            "PhoneService" => [self.phone_service.as_str()],
            "MultipleLines" => [self.multiple_lines.as_str()],
            "InternetService" => [self.internet_service.as_str()],
            "OnlineSecurity" => [self.online_security.as_str()],
            "OnlineBackup" => [self.online_backup.as_str()],
            "DeviceProtection" => [self.device_protection.as_str()],
            "TechSupport" => [self.tech_support.as_str()],
            "StreamingTV" => [self.streaming_tv.as_str()],
            "StreamingMovies" => [self.streaming_movies.as_str()],
            "Contract" => [self.contract.as_str()],
            "PaperlessBilling" => [self.paperless_billing.as_str()],
            "PaymentMethod" => [self.payment_method.as_str()],
            "MonthlyCharges" => [self.monthly_charges],
            "TotalCharges" => [self.total_charges],
        }?;
        Ok(df)
    }
}

/// Text shown for an encoded prediction
pub fn churn_status(prediction: f64) -> &'static str {
    if (prediction - POSITIVE_LABEL).abs() < 0.5 {
        CHURN_MESSAGE
    } else {
        STAY_MESSAGE
    }
}

/// Serves predictions from the deployed bundle, loaded on first use
pub struct ChurnClassifier {
    estimator: ChurnEstimator,
}

impl ChurnClassifier {
    pub fn new(
        storage: Arc<dyn ModelStorage>,
        bucket_name: impl Into<String>,
        model_path: impl Into<String>,
    ) -> Self {
        Self {
            estimator: ChurnEstimator::new(storage, bucket_name, model_path),
        }
    }

    /// Encoded class per row of `df`
    pub async fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        info!(rows = df.height(), "Entered predict method of ChurnClassifier");
        Ok(self.estimator.predict(df).await?.to_vec())
    }

    /// Encoded class for one customer
    pub async fn predict_one(&self, record: &ChurnData) -> Result<f64> {
        let predictions = self.predict(&record.to_dataframe()?).await?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| ChurnError::Internal("model returned no prediction".to_string()))
    }
}
