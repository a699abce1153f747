//! Shared domain types.

pub mod id;

pub use id::{DriverId, ObserverId, TenantId};
