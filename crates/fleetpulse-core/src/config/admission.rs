//! Admission controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Driver admission and quota alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Whether quota enforcement is enabled. When disabled every driver
    /// with a tenant is admitted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minutes without activity after which a connection record is
    /// considered abandoned.
    #[serde(default = "default_staleness")]
    pub staleness_minutes: u64,
    /// Rolling window, in hours, during which an alert of one kind is sent
    /// at most once per tenant.
    #[serde(default = "default_alert_window")]
    pub alert_window_hours: u64,
    /// Cron expression (with seconds) for the stale-record sweep.
    #[serde(default = "default_sweep_cron")]
    pub sweep_cron: String,
}

impl AdmissionConfig {
    /// Staleness window as a duration.
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_minutes * 60)
    }

    /// Alert throttle window as a duration.
    pub fn alert_window(&self) -> Duration {
        Duration::from_secs(self.alert_window_hours * 3600)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            staleness_minutes: default_staleness(),
            alert_window_hours: default_alert_window(),
            sweep_cron: default_sweep_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_staleness() -> u64 {
    60
}

fn default_alert_window() -> u64 {
    24
}

fn default_sweep_cron() -> String {
    "0 */5 * * * *".to_string()
}
