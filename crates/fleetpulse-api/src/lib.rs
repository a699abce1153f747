//! # fleetpulse-api
//!
//! Axum transport for FleetPulse.
//!
//! Exposes the driver and observer WebSocket channels, the availability
//! search and the health endpoint on top of the real-time engine, and maps
//! domain errors to HTTP responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
