use crate::domain::error::EscrowError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so the HTTP mapping lives in the adapters
/// layer. Only the status code is contractual to the gateway: 2xx stops
/// redelivery, 5xx requests it.
pub struct ApiError(pub EscrowError);

impl From<EscrowError> for ApiError {
    fn from(err: EscrowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            EscrowError::Validation(msg) | EscrowError::InvalidRate(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            EscrowError::WebhookSignature(_) => (
                StatusCode::BAD_REQUEST,
                "webhook_error",
                "invalid webhook signature".to_string(),
            ),
            EscrowError::IllegalTransition { .. }
            | EscrowError::AlreadyInEscrow(_)
            | EscrowError::NotReleasable { .. }
            | EscrowError::AlreadyDisputed(_) => (
                StatusCode::CONFLICT,
                "state_error",
                self.0.to_string(),
            ),
            EscrowError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "not_found",
                self.0.to_string(),
            ),
            // retry-me signals: the gateway redelivers on 5xx
            EscrowError::Precondition(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "precondition_not_met",
                msg.clone(),
            ),
            EscrowError::Conflict(_) | EscrowError::ConcurrentProcessing(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "conflict",
                "concurrent update, retry".to_string(),
            ),
            EscrowError::Gateway(err) => {
                tracing::error!("gateway error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "gateway_error",
                    "upstream gateway error".to_string(),
                )
            }
            EscrowError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            EscrowError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
