//! Mapping from core errors to HTTP responses.

use crate::dto::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use erm_core::{ErmError, ErrorKind};

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// The `x-user-id` header is missing or not a canonical id.
    MissingActor(String),
    /// The acting user may not act on this resource.
    Forbidden(String),
    Core(ErmError),
}

impl From<ErmError> for ApiError {
    fn from(err: ErmError) -> Self {
        Self::Core(err)
    }
}

impl ApiError {
    fn status_and_label(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingActor(_) | Self::Core(ErmError::ActorRequired) => {
                (StatusCode::UNAUTHORIZED, "unauthenticated")
            }
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "access_denied"),
            Self::Core(err) if err.is_access_denied() => (StatusCode::FORBIDDEN, "access_denied"),
            Self::Core(ErmError::VersionConflict { .. }) => (StatusCode::CONFLICT, "conflict"),
            Self::Core(err) => match err.kind() {
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation"),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                ErrorKind::Persistence => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, label) = self.status_and_label();
        let message = match &self {
            Self::MissingActor(reason) | Self::Forbidden(reason) => reason.clone(),
            Self::Core(err) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("request failed: {:?}", err);
                "Internal error".to_string()
            }
            Self::Core(err) => err.to_string(),
        };

        let body = ErrorRes {
            error: label.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
