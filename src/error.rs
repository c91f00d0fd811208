//! Errors surfaced to HTTP clients.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("{label}: {missing:?}")]
    Missing {
        label: &'static str,
        missing: Vec<&'static str>,
    },

    #[error("{0}")]
    InvalidBody(String),

    #[error("{0}")]
    MalformedCsv(String),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Prediction failed (error id {0})")]
    PredictionRedacted(uuid::Uuid),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn missing_features(missing: Vec<&'static str>) -> Self {
        ApiError::Missing {
            label: "Missing features",
            missing,
        }
    }

    pub fn missing_columns(missing: Vec<&'static str>) -> Self {
        ApiError::Missing {
            label: "Missing columns in CSV",
            missing,
        }
    }

    fn detail(&self) -> Value {
        match self {
            ApiError::Missing { label, missing } => json!({
                "error": label,
                "missing": missing,
            }),
            other => Value::String(other.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Missing { .. } | ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::MalformedCsv(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelUnavailable(_)
            | ApiError::Prediction(_)
            | ApiError::PredictionRedacted(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.detail() }))
    }
}
