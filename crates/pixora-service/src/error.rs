//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Webhook signature missing or invalid. Rejected before any mutation.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input or malformed event payload.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Insufficient credits for a generation.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Credits required for the request.
        required: i64,
    },

    /// The upstream generation failed after the debit; the refund committed.
    #[error("generation failed: {message}")]
    GenerationFailed {
        /// Upstream failure description.
        message: String,
        /// Whether credits were returned. Always true on this variant; the
        /// not-refunded case is `RefundFailed`.
        refunded: bool,
    },

    /// The refund credit after a failed generation could not be committed.
    /// Distinct from `GenerationFailed`: the customer's credits were NOT
    /// returned and the case needs investigation.
    #[error("generation failed and refund could not be committed")]
    RefundFailed,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::GenerationFailed { message, refunded } => (
                StatusCode::BAD_GATEWAY,
                "generation_failed",
                message.clone(),
                Some(serde_json::json!({ "refunded": refunded })),
            ),
            Self::RefundFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "refund_failed",
                "Generation failed and the refund did not commit - credits were not returned"
                    .to_string(),
                Some(serde_json::json!({ "refunded": false })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<pixora_store::StoreError> for ApiError {
    fn from(err: pixora_store::StoreError) -> Self {
        match err {
            pixora_store::StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            pixora_store::StoreError::InvalidAmount(amount) => {
                Self::Internal(format!("invalid ledger amount: {amount}"))
            }
            pixora_store::StoreError::Database(msg)
            | pixora_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
