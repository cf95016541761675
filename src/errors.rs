use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the whole API. Services return this directly and
/// handlers bubble it up with `?`; the `IntoResponse` impl is the single
/// place the error envelope gets built.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("duplicate value: {0}")]
    Duplicate(String),

    #[error("SKU already exists: {0}")]
    SkuExists(String),

    #[error("referenced record does not exist")]
    ForeignKeyViolation,

    #[error("insufficient stock: operation would leave {0} units")]
    InsufficientStock(i32),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("cannot remove the last administrator")]
    LastAdmin,

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_)
            | ServiceError::ForeignKeyViolation
            | ServiceError::InsufficientStock(_)
            | ServiceError::LastAdmin => StatusCode::BAD_REQUEST,
            ServiceError::InvalidCredentials
            | ServiceError::InvalidToken
            | ServiceError::TokenExpired => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Duplicate(_) | ServiceError::SkuExists(_) => StatusCode::CONFLICT,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Duplicate(_) => "DUPLICATE_ENTRY",
            ServiceError::SkuExists(_) => "SKU_EXISTS",
            ServiceError::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            ServiceError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            ServiceError::InvalidCredentials => "INVALID_CREDENTIALS",
            ServiceError::InvalidToken => "INVALID_TOKEN",
            ServiceError::TokenExpired => "TOKEN_EXPIRED",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::LastAdmin => "LAST_ADMIN",
            ServiceError::Database(_) | ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to API clients. Database internals stay in the
    /// logs only.
    fn response_message(&self) -> String {
        match self {
            ServiceError::Database(err) => {
                tracing::error!(error = %err, "database error");
                "an internal error occurred".to_string()
            }
            ServiceError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let body = json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.response_message(),
            },
            "timestamp": Utc::now().to_rfc3339(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Translate driver-level constraint violations into domain errors so
/// clients see 409/400 instead of a blanket 500.
pub fn map_sql_err(err: DbErr, what: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Duplicate(what.to_string()),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => ServiceError::ForeignKeyViolation,
        _ => ServiceError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_classes() {
        assert_eq!(
            ServiceError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InsufficientStock(-5).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::TokenExpired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("admin only".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::NotFound("product".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::SkuExists("ABC-1".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::LastAdmin.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ServiceError::Internal("connection pool exhausted".into());
        assert_eq!(err.response_message(), "an internal error occurred");
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ServiceError::InsufficientStock(-1).error_code(), "INSUFFICIENT_STOCK");
        assert_eq!(ServiceError::SkuExists("x".into()).error_code(), "SKU_EXISTS");
        assert_eq!(ServiceError::ForeignKeyViolation.error_code(), "FOREIGN_KEY_VIOLATION");
    }
}
