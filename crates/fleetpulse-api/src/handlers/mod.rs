//! HTTP and WebSocket handlers.

pub mod availability;
pub mod driver_ws;
pub mod fleet_ws;
pub mod health;
