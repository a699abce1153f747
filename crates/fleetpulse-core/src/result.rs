//! Convenience result type alias for FleetPulse.

use crate::error::AppError;

/// A specialized `Result` type for FleetPulse operations.
pub type AppResult<T> = Result<T, AppError>;
