//! Server error types

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roster_common::ValidationError;
use thiserror::Error;

use crate::api::response::{id_not_found, ErrorResponse};
use crate::entity::{EntityId, IdParseError};
use crate::store::StoreError;

/// Result type alias for handlers
pub type ApiResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("id {0} not found")]
    NotFound(EntityId),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(ValidationError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => AppError::Validation(e),
            other => AppError::Store(other),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<IdParseError> for AppError {
    fn from(err: IdParseError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(id) => return id_not_found(id),
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new("BAD_REQUEST", message))
            },
            AppError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", err.to_string()).with_field(err.field()),
            ),
            AppError::Store(StoreError::TransactionFailure { kind, source }) => {
                tracing::error!(kind, error = %source, "Transaction rolled back");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "TRANSACTION_FAILED",
                        "The change could not be committed and was rolled back",
                    ),
                )
            },
            AppError::Store(err) => {
                tracing::error!(error = %err, "Store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "A database error occurred"),
                )
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound(EntityId::FIRST), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::from(StoreError::Validation(ValidationError::required("lastName"))),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(StoreError::transaction("student", sqlx::Error::PoolClosed)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::from(StoreError::Database(sqlx::Error::RowNotFound)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_store_validation_unwrapped() {
        let err = AppError::from(StoreError::Validation(ValidationError::required("firstName")));
        assert!(matches!(err, AppError::Validation(ValidationError::Required { .. })));
    }

    #[test]
    fn test_id_parse_error_is_bad_request() {
        let err = AppError::from("abc".parse::<EntityId>().unwrap_err());
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
