// src/error.rs
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

use crate::scheduling::SchedulingError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn db(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        AppError::QuotaExceeded(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Machine-readable kind sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "database_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::ValidationError(_) => "validation_error",
            AppError::Conflict(_) => "conflict",
            AppError::QuotaExceeded(_) => "quota_exceeded",
            AppError::Scheduling(SchedulingError::InvalidTimeFormat(_)) => "invalid_time_format",
            AppError::Scheduling(SchedulingError::InvalidRange(_)) => "invalid_range",
            AppError::Scheduling(SchedulingError::SlotTaken(_)) => "slot_taken",
            AppError::Scheduling(SchedulingError::NotFound(_)) => "not_found",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) | AppError::QuotaExceeded(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Scheduling(err) => match err {
                SchedulingError::InvalidTimeFormat(_) | SchedulingError::InvalidRange(_) => {
                    StatusCode::BAD_REQUEST
                }
                SchedulingError::SlotTaken(_) => StatusCode::CONFLICT,
                SchedulingError::NotFound(_) => StatusCode::NOT_FOUND,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                "Database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_errors_map_to_client_statuses() {
        let cases = [
            (SchedulingError::InvalidTimeFormat("x".into()), StatusCode::BAD_REQUEST, "invalid_time_format"),
            (SchedulingError::InvalidRange("x".into()), StatusCode::BAD_REQUEST, "invalid_range"),
            (SchedulingError::SlotTaken("x".into()), StatusCode::CONFLICT, "slot_taken"),
            (SchedulingError::NotFound("x".into()), StatusCode::NOT_FOUND, "not_found"),
        ];
        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn quota_is_a_bad_request() {
        let err = AppError::quota_exceeded("too many");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
