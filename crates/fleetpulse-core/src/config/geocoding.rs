//! Geocoding collaborator and availability search configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the external geocoding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL of a Nominatim-compatible search API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Total attempts (first call included) before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts, in milliseconds.
    #[serde(default = "default_backoff")]
    pub backoff_base_ms: u64,
}

impl GeocodingConfig {
    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff(),
        }
    }
}

/// Defaults for the nearest-available-driver search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityConfig {
    /// Positions older than this many minutes do not count as available.
    #[serde(default = "default_max_age")]
    pub max_position_age_minutes: i64,
    /// Search radius used when the caller gives none, in kilometres.
    #[serde(default = "default_radius")]
    pub default_radius_km: f64,
    /// Result count used when the caller gives none.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            max_position_age_minutes: default_max_age(),
            default_radius_km: default_radius(),
            default_limit: default_limit(),
        }
    }
}

fn default_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    concat!("fleetpulse/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> u64 {
    3000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff() -> u64 {
    200
}

fn default_max_age() -> i64 {
    15
}

fn default_radius() -> f64 {
    10.0
}

fn default_limit() -> usize {
    10
}
