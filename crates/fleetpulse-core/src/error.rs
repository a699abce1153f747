//! Unified application error types for FleetPulse.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Admission denials and per-observer
//! delivery failures carry their own [`ErrorKind`] so callers can tell
//! "no subscription" from "quota full" without parsing messages.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested driver or tenant was not found.
    NotFound,
    /// The driver has no tenant, or connects under a tenant it does not belong to.
    InvalidTenant,
    /// The tenant has no active subscription.
    NoActiveSubscription,
    /// The tenant has more registered drivers than its plan allows.
    DriverQuotaExceeded,
    /// The tenant already holds its maximum number of simultaneous connections.
    ConnectionQuotaExceeded,
    /// The geocoding collaborator could not be reached after retries.
    GeocodingUnavailable,
    /// A message could not be delivered to one observer.
    DeliveryFailure,
    /// Input validation failed.
    Validation,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An external service answered with an unexpected response.
    ExternalService,
    /// An internal server error occurred.
    Internal,
}

impl ErrorKind {
    /// Returns `true` for kinds produced by the admission controller.
    pub fn is_admission_denial(&self) -> bool {
        matches!(
            self,
            Self::InvalidTenant
                | Self::NoActiveSubscription
                | Self::DriverQuotaExceeded
                | Self::ConnectionQuotaExceeded
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InvalidTenant => write!(f, "INVALID_TENANT"),
            Self::NoActiveSubscription => write!(f, "NO_ACTIVE_SUBSCRIPTION"),
            Self::DriverQuotaExceeded => write!(f, "DRIVER_QUOTA_EXCEEDED"),
            Self::ConnectionQuotaExceeded => write!(f, "CONNECTION_QUOTA_EXCEEDED"),
            Self::GeocodingUnavailable => write!(f, "GEOCODING_UNAVAILABLE"),
            Self::DeliveryFailure => write!(f, "DELIVERY_FAILURE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout FleetPulse.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a geocoding-unavailable error.
    pub fn geocoding_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeocodingUnavailable, message)
    }

    /// Create an external-service error.
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create a delivery-failure error.
    pub fn delivery_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeliveryFailure, message)
    }

    /// Returns `true` if this error is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
