use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Content model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Reasons a track could not be resolved to a feature record.
///
/// These are the only resolution failures that reach a caller; each carries
/// a short message meant to be shown as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Access to this track is forbidden (track {0})")]
    AccessForbidden(String),

    #[error("Track {0} was not found")]
    NotFound(String),

    #[error("Timed out while resolving track {0}")]
    Timeout(String),

    #[error("Track {0} is not in the local catalogue and upstream lookups are not configured")]
    NotConfigured(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Resolution(ResolutionError::AccessForbidden(_)) => StatusCode::FORBIDDEN,
            AppError::Resolution(ResolutionError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Resolution(ResolutionError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Resolution(_) => StatusCode::BAD_GATEWAY,
            AppError::Dataset(_) | AppError::ModelUnavailable(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match self {
            AppError::InvalidInput(msg) => msg,
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
