use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend failed to serve the request.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Missing admin cookie or wrong passphrase.
    #[error("{0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("{0}")]
    InvalidInput(String),
    /// Operation collides with existing data or the current round.
    #[error("{0}")]
    Conflict(String),
    /// Requested resource was not found.
    #[error("{0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UniqueViolation(constraint) => {
                ServiceError::Conflict(constraint.to_string())
            }
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(validation_message(&err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid request (400).
    #[error("{0}")]
    BadRequest(String),
    /// Missing or wrong admin credentials (401).
    #[error("{0}")]
    Unauthorized(String),
    /// Unknown participant or song (404).
    #[error("{0}")]
    NotFound(String),
    /// Uniqueness or round conflict (409).
    #[error("{0}")]
    Conflict(String),
    /// Failure on our side; the detail is logged, not returned.
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => {
                error!(error = %source, "storage operation failed");
                AppError::Internal("internal server error".into())
            }
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

/// Error payload returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            error: self.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Flatten field errors into one readable sentence, fields in a stable order.
fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();

    if messages.is_empty() {
        "invalid request".into()
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::storage::UniqueConstraint;
    use validator::ValidationError;

    #[test]
    fn unique_violation_becomes_conflict() {
        let err: ServiceError = StorageError::UniqueViolation(UniqueConstraint::VotePerSong).into();
        match AppError::from(err) {
            AppError::Conflict(message) => {
                assert_eq!(message, "you have already voted for this song")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn storage_failure_hides_detail() {
        let source = std::io::Error::other("connection reset");
        let err: ServiceError = StorageError::unavailable("write failed".into(), source).into();
        match AppError::from(err) {
            AppError::Internal(message) => assert_eq!(message, "internal server error"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validation_errors_keep_their_messages() {
        let mut errors = ValidationErrors::new();
        let mut missing = ValidationError::new("required");
        missing.message = Some("firstName is required".into());
        errors.add("firstName", missing);

        match AppError::from(errors) {
            AppError::BadRequest(message) => assert_eq!(message, "firstName is required"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_codes_follow_variants() {
        assert_eq!(
            AppError::Conflict("x".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
