use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::{AggregateStats, FeedbackRecord, NewFeedback};
use crate::stats;
use crate::store::FeedbackStore;
use crate::validation;

pub struct AppState<S> {
    pub store: S,
    pub environment: String,
}

pub type SharedState<S> = Arc<AppState<S>>;

fn log_failure(error: AppError) -> AppError {
    match &error {
        AppError::Storage { context, source } => error!(%source, "{context}"),
        other => warn!(%other, "Request rejected"),
    }
    error
}

pub async fn list_feedback_handler<S: FeedbackStore>(
    State(state): State<SharedState<S>>,
) -> Result<Json<Vec<FeedbackRecord>>, AppError> {
    let records = state
        .store
        .list()
        .await
        .map_err(AppError::from_store("Failed to fetch feedback"))
        .map_err(log_failure)?;

    Ok(Json(records))
}

pub async fn create_feedback_handler<S: FeedbackStore>(
    State(state): State<SharedState<S>>,
    payload: Result<Json<NewFeedback>, JsonRejection>,
) -> Result<(StatusCode, Json<FeedbackRecord>), AppError> {
    let Json(candidate) = payload
        .map_err(|rejection| AppError::MalformedPayload(rejection.body_text()))
        .map_err(log_failure)?;

    let feedback = validation::validate(&candidate)
        .map_err(AppError::from)
        .map_err(log_failure)?;

    let record = state
        .store
        .create(feedback)
        .await
        .map_err(AppError::from_store("Failed to create feedback"))
        .map_err(log_failure)?;

    info!(id = record.id, course_code = %record.course_code, "Feedback created");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn delete_feedback_handler<S: FeedbackStore>(
    State(state): State<SharedState<S>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id
        .map_err(|rejection| AppError::MalformedPayload(rejection.body_text()))
        .map_err(log_failure)?;

    state
        .store
        .delete(id)
        .await
        .map_err(AppError::from_store("Failed to delete feedback"))
        .map_err(log_failure)?;

    info!(id, "Feedback deleted");
    Ok(Json(json!({ "message": "Feedback deleted successfully" })))
}

pub async fn stats_handler<S: FeedbackStore>(
    State(state): State<SharedState<S>>,
) -> Result<Json<AggregateStats>, AppError> {
    let records = state
        .store
        .list()
        .await
        .map_err(AppError::from_store("Failed to fetch feedback"))
        .map_err(log_failure)?;

    Ok(Json(stats::aggregate(&records)))
}

pub async fn health_handler<S: FeedbackStore>(
    State(state): State<SharedState<S>>,
) -> Result<impl IntoResponse, AppError> {
    state
        .store
        .health()
        .await
        .map_err(AppError::from_store("Database connection failed"))
        .map_err(log_failure)?;

    Ok(Json(json!({
        "status": "ok",
        "database": "connected",
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

pub async fn api_test_handler<S: FeedbackStore>(
    State(state): State<SharedState<S>>,
) -> impl IntoResponse {
    Json(json!({
        "message": "API is working!",
        "environment": state.environment,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
