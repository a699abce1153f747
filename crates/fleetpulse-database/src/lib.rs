//! # fleetpulse-database
//!
//! Durable position store and read-only fleet directory. The PostgreSQL
//! repositories are used in production; the in-memory implementations
//! back single-node deployments and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{FleetDirectory, PositionStore};
