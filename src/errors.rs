use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

fn current_request_id() -> Option<String> {
    crate::telemetry::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Standard error envelope returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Order with ID 550e8400-e29b-41d4-a716-446655440000 not found",
    "code": null,
    "details": null,
    "request_id": "req-abc123xyz",
    "timestamp": "2025-11-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Order with ID 550e8400-e29b-41d4-a716-446655440000 not found")]
    pub message: String,
    /// Machine-readable kind for errors clients branch on (coupon rejections,
    /// state conflicts)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "coupon_expired")]
    pub code: Option<String>,
    /// Additional error details (validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    #[schema(example = "2025-11-09T10:30:00.000Z")]
    pub timestamp: String,
}

/// Coupon rejection reasons. Each maps to its own machine-readable kind so
/// the storefront can render a specific message without string matching.
#[derive(Debug, Clone, thiserror::Error, Serialize, PartialEq)]
pub enum CouponError {
    #[error("Coupon code not found")]
    NotFound,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon has already been used")]
    AlreadyUsed,

    #[error("Order total does not meet the coupon minimum of {0}")]
    MinOrderNotMet(Decimal),
}

impl CouponError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "coupon_not_found",
            Self::Expired => "coupon_expired",
            Self::AlreadyUsed => "coupon_already_used",
            Self::MinOrderNotMet(_) => "coupon_min_order_not_met",
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Payment verification failed: {0}")]
    PaymentVerification(String),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error("Loyalty card has {0} of 10 stamps")]
    InsufficientStamps(i32),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Inventory error: {0}")]
    InventoryError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::StateConflict(_)
            | Self::PaymentVerification(_)
            | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::Coupon(_) | Self::InsufficientStamps(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InventoryError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::ExternalServiceError(_) => "Upstream service unavailable".to_string(),
            Self::ConcurrentModification(id) => {
                format!("Concurrent modification for ID {}", id)
            }
            _ => self.to_string(),
        }
    }

    /// Machine-readable kind clients can branch on, where one exists.
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Self::Coupon(err) => Some(err.kind()),
            Self::StateConflict(_) => Some("state_conflict"),
            Self::PaymentVerification(_) => Some("payment_verification_failed"),
            Self::InsufficientStamps(_) => Some("insufficient_stamps"),
            Self::ConcurrentModification(_) => Some("concurrent_modification"),
            Self::InventoryError(_) => Some("insufficient_stock"),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            code: self.kind().map(str::to_string),
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
