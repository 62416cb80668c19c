use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure taxonomy of the booking core.
///
/// Every variant aborts the enclosing transaction; nothing is retried inside the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("seat {seat_id} is no longer available")]
    SeatUnavailable { seat_id: i64 },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("conflicting seat assignment: {0}")]
    Conflict(String),

    #[error("transient store failure: {0}")]
    TransientStoreFailure(String),

    #[error("store error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Only transient failures are worth repeating the whole booking attempt for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::TransientStoreFailure(_))
    }

    /// Maps a Postgres/sqlx failure onto the core taxonomy by SQLSTATE.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                match code.as_str() {
                    // foreign_key_violation
                    "23503" => BookingError::ConstraintViolation(constraint),
                    // unique_violation
                    "23505" => BookingError::Conflict(constraint),
                    // serialization_failure, deadlock_detected, lock_not_available, query_canceled
                    "40001" | "40P01" | "55P03" | "57014" => {
                        BookingError::TransientStoreFailure(db_err.message().to_string())
                    }
                    _ => BookingError::Internal(err.to_string()),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => BookingError::TransientStoreFailure(err.to_string()),
            _ => BookingError::Internal(err.to_string()),
        }
    }
}

/// Error type returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Booking(err) => booking_parts(err),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::Database(sqlx::Error::RowNotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
            ),
            ApiError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                internal()
            }
            ApiError::Cache(err) => {
                tracing::error!(error = %err, "Redis error");
                internal()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

fn booking_parts(err: &BookingError) -> (StatusCode, &'static str, String) {
    match err {
        BookingError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        BookingError::InvalidArgument(msg) => {
            (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", msg.clone())
        }
        BookingError::SeatUnavailable { .. } => {
            (StatusCode::CONFLICT, "SEAT_UNAVAILABLE", err.to_string())
        }
        BookingError::ConstraintViolation(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "CONSTRAINT_VIOLATION",
            "Referenced schedule, user or payment method does not exist".to_string(),
        ),
        BookingError::TransientStoreFailure(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "TRANSIENT_FAILURE",
            "Booking could not be completed, please retry".to_string(),
        ),
        // Conflict is a locking bug, the coordinator has already alerted on it.
        BookingError::Conflict(_) | BookingError::Internal(_) => internal(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let mut body = json!({
            "success": false,
            "error": message,
            "code": code,
        });
        if let ApiError::Booking(BookingError::SeatUnavailable { seat_id }) = &self {
            body["seat_id"] = json!(seat_id);
        }

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
