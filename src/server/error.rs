//! Error responses of the JSON API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::{ChurnError, ErrorCategory};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Churn(#[from] ChurnError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Churn(e) => match e.category() {
                ErrorCategory::DataContract => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCategory::Connectivity => StatusCode::SERVICE_UNAVAILABLE,
                ErrorCategory::Configuration
                | ErrorCategory::ValidationFailure
                | ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": true,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
