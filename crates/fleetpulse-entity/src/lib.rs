//! # fleetpulse-entity
//!
//! Domain entity models for FleetPulse. Database rows derive
//! `sqlx::FromRow`; value objects are plain serde structs.

pub mod alert;
pub mod connection;
pub mod position;
pub mod quota;

pub use alert::{AlertKind, QuotaAlert};
pub use connection::ConnectionRecord;
pub use position::{Coordinates, Position};
pub use quota::PlanQuota;
