//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use fleetpulse_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Handler error: an [`AppError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// Status code and machine-readable code for an error kind.
pub fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::InvalidTenant => (StatusCode::FORBIDDEN, "INVALID_TENANT"),
        ErrorKind::NoActiveSubscription => (StatusCode::FORBIDDEN, "NO_ACTIVE_SUBSCRIPTION"),
        ErrorKind::DriverQuotaExceeded => (StatusCode::FORBIDDEN, "DRIVER_QUOTA_EXCEEDED"),
        ErrorKind::ConnectionQuotaExceeded => {
            (StatusCode::TOO_MANY_REQUESTS, "CONNECTION_QUOTA_EXCEEDED")
        }
        ErrorKind::GeocodingUnavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, "GEOCODING_UNAVAILABLE")
        }
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ErrorKind::Serialization => (StatusCode::BAD_REQUEST, "SERIALIZATION_ERROR"),
        ErrorKind::ExternalService => (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR"),
        ErrorKind::DeliveryFailure
        | ErrorKind::Database
        | ErrorKind::Configuration
        | ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, error_code) = status_for(err.kind);

        if status.is_server_error() {
            tracing::error!(kind = ?err.kind, error = %err, "Request failed");
        } else if err.kind.is_admission_denial() {
            tracing::warn!(kind = ?err.kind, error = %err.message, "Connection refused");
        }

        // Internal details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            err.message
        };

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
