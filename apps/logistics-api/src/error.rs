//! # API Error Type
//!
//! Unified error type for the HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Entrega                                │
//! │                                                                         │
//! │  Panel / PWA                 Rust Backend                               │
//! │  ───────────                 ────────────                               │
//! │                                                                         │
//! │  POST /api/v1/orders                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<T>, ApiError>                                       │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Business rule? ─── CoreError::BelowMinimumOrder ─ ApiError ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄──── 422 { "code": "BELOW_MINIMUM_ORDER", "message": "..." } ──────  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use entrega_core::{CoreError, ValidationError};
use entrega_db::DbError;
use serde::Serialize;

use crate::providers::ProviderError;

/// Error body returned by every endpoint.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Order not found: 6f1c..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Row changed under us or already exists (409)
    Conflict,

    /// Business logic error (422)
    BusinessLogic,

    /// Address beyond the delivery radius (422)
    OutOfDeliveryRange,

    /// Subtotal under the zone minimum (422)
    BelowMinimumOrder,

    /// Cash session closed or drawer short (422)
    CashRegister,

    /// Routing / geocoding service unavailable (503)
    ProviderUnavailable,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::BusinessLogic
            | ErrorCode::OutOfDeliveryRange
            | ErrorCode::BelowMinimumOrder
            | ErrorCode::CashRegister => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Conflict(message) => ApiError::new(ErrorCode::Conflict, message),
            DbError::Domain(e) => ApiError::from(e),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::CorruptData(e) => {
                tracing::error!("Corrupt data: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::OutOfDeliveryRange { .. } => ErrorCode::OutOfDeliveryRange,
            CoreError::BelowMinimumOrder { .. } => ErrorCode::BelowMinimumOrder,
            CoreError::SessionClosed(_) | CoreError::InsufficientCash { .. } => {
                ErrorCode::CashRegister
            }
            CoreError::NoNextStatus { .. } | CoreError::CannotCancel { .. } => {
                ErrorCode::BusinessLogic
            }
            CoreError::InsufficientChangeAmount { .. }
            | CoreError::TooManyItems { .. }
            | CoreError::EmptyOrder
            | CoreError::AmountOverflow { .. } => ErrorCode::ValidationError,
            CoreError::Validation(e) => return ApiError::from_validation(e),
        };
        ApiError::new(code, err.to_string())
    }
}

impl ApiError {
    fn from_validation(err: &ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from_validation(&err)
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        tracing::warn!(error = %err, "External provider failed");
        ApiError::new(ErrorCode::ProviderUnavailable, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type of every handler.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use entrega_core::money::Money;
    use entrega_core::OrderStatus;

    #[test]
    fn test_db_errors_map_to_codes() {
        let err = ApiError::from(DbError::not_found("Order", "abc"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Order not found: abc");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(DbError::Conflict("already open".into()));
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = ApiError::from(DbError::QueryFailed("syntax error near SELECT".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("SELECT"));
    }

    #[test]
    fn test_domain_errors_pass_through_db() {
        let err = ApiError::from(DbError::Domain(CoreError::CannotCancel {
            status: OrderStatus::Delivered,
        }));
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(DbError::from(ValidationError::required("operator")));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "operator is required");
    }

    #[test]
    fn test_core_errors_map_to_codes() {
        let err = ApiError::from(CoreError::BelowMinimumOrder {
            minimum: Money::from_cents(2000),
            subtotal: Money::from_cents(1500),
        });
        assert_eq!(err.code, ErrorCode::BelowMinimumOrder);

        let err = ApiError::from(CoreError::InsufficientCash {
            available: Money::from_cents(100),
            requested: Money::from_cents(500),
        });
        assert_eq!(err.code, ErrorCode::CashRegister);

        let err = ApiError::from(CoreError::overflow("subtotal"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "subtotal is too large");
    }

    #[test]
    fn test_serializes_screaming_code() {
        let json = serde_json::to_value(ApiError::not_found("Zone", "x")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Zone not found: x");
    }
}
