//! Subscription plan quota.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Limits resolved from a tenant's active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuota {
    /// Maximum number of registered drivers.
    pub max_drivers: i32,
    /// Maximum number of simultaneously connected drivers.
    pub max_simultaneous_connections: i32,
    /// Utilisation percentage from which an informational alert is raised.
    pub alert_threshold_percent: i32,
}

impl PlanQuota {
    /// Driver utilisation as a whole percentage (rounded down).
    ///
    /// A plan with a zero driver cap reports 100% for any count.
    pub fn utilisation_percent(&self, driver_count: u64) -> u64 {
        if self.max_drivers <= 0 {
            return 100;
        }
        driver_count.saturating_mul(100) / self.max_drivers as u64
    }

    /// Whether `driver_count` is over the hard cap.
    pub fn drivers_exceeded(&self, driver_count: u64) -> bool {
        driver_count > self.max_drivers.max(0) as u64
    }

    /// Whether `driver_count` reached the alert threshold.
    pub fn threshold_reached(&self, driver_count: u64) -> bool {
        self.utilisation_percent(driver_count) >= self.alert_threshold_percent.max(0) as u64
    }
}
