//! # fleetpulse-admission
//!
//! Gate applied before a driver connection is accepted:
//!
//! - Subscription and driver-count quota checks
//! - Simultaneous connection accounting with lazy staleness purge
//! - Alert throttling (one alert per tenant and kind per rolling window)
//! - Periodic sweep of abandoned connection records

pub mod controller;
pub mod decision;
pub mod notifier;
pub mod sweeper;
pub mod table;
pub mod throttle;

pub use controller::{AdmissionController, SweepStats};
pub use decision::{Admission, Denial};
pub use notifier::{AlertNotifier, MemoryAlertNotifier, TracingAlertNotifier};
pub use sweeper::AdmissionSweeper;
pub use table::ConnectionTable;
pub use throttle::AlertThrottle;
