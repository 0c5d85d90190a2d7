use crate::store::StoreError;
use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use shared::model::EntityId;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Error, Debug)]
pub enum ResourceApiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not load seed data: {0}")]
    Seed(#[from] StoreError),
}

/// Errors returned by the CRUD handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Id in path ({path_id}) does not match id in body ({body_id})")]
    IdMismatch { path_id: EntityId, body_id: EntityId },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::IdMismatch { .. } => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::MissingReference { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Restricted { .. }) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::DuplicateId { .. }) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::InvalidId { .. }) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}
