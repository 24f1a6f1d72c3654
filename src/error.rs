use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, ApiError>;

/// Error taxonomy of the settlement core. Every variant is a synchronous
/// validation failure; a failing call never partially mutates any entity.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not enough surplus to sell, available: {available} kWh")]
    InsufficientSurplus { available: Decimal },

    #[error("insufficient funds, need: {needed} EUR")]
    InsufficientFunds { needed: Decimal },

    #[error("offer unavailable: {0}")]
    OfferUnavailable(String),

    #[error("cannot accept your own offer")]
    SelfTrade,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(resource: &str) -> Self {
        ApiError::NotFound(resource.to_string())
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidArgument(_) => "invalid_argument",
            ApiError::InsufficientSurplus { .. } => "insufficient_surplus",
            ApiError::InsufficientFunds { .. } => "insufficient_funds",
            ApiError::OfferUnavailable(_) => "offer_unavailable",
            ApiError::SelfTrade => "self_trade_rejected",
            ApiError::Database(_) => "internal_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::InsufficientSurplus { .. }
            | ApiError::InsufficientFunds { .. }
            | ApiError::OfferUnavailable(_)
            | ApiError::SelfTrade => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log_error(&self) {
        match self.status_code() {
            status if status.is_server_error() => {
                error!(error = %self, "server error occurred");
            }
            status if status.is_client_error() => {
                warn!(error = %self, "request rejected");
            }
            _ => {}
        }
    }
}

/// Structured error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_error();

        let status = self.status_code();
        let message = match &self {
            // Don't leak driver internals to callers
            ApiError::Database(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.error_type(),
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_violations_map_to_conflict() {
        assert_eq!(
            ApiError::InsufficientFunds {
                needed: Decimal::ONE
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::InsufficientSurplus {
                available: Decimal::ZERO
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::SelfTrade.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn lookup_and_input_failures_keep_their_status() {
        assert_eq!(
            ApiError::not_found("offer").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::InvalidArgument("kWh must be positive".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
