use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;
use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("Feedback {0} not found")]
    NotFound(i64),

    #[error("{context}")]
    Storage {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl AppError {
    /// Maps a store failure, keeping not-found distinct from database errors.
    pub fn from_store(context: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |error| match error {
            StoreError::NotFound(id) => AppError::NotFound(id),
            StoreError::Database(source) => AppError::Storage { context, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::MalformedPayload(detail) => {
                json!({ "error": "Malformed payload", "details": detail })
            }
            AppError::Validation(errors) => {
                json!({ "error": self.to_string(), "details": errors })
            }
            AppError::NotFound(_) => json!({ "error": self.to_string() }),
            AppError::Storage { source, .. } => {
                json!({ "error": self.to_string(), "details": source.to_string() })
            }
        };

        (status, Json(body)).into_response()
    }
}
