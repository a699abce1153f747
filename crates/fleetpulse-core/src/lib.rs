//! # fleetpulse-core
//!
//! Core crate for FleetPulse. Contains configuration schemas, typed
//! identifiers, and the unified error system shared by the presence,
//! broadcast, and admission crates.
//!
//! This crate has **no** internal dependencies on other FleetPulse crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
