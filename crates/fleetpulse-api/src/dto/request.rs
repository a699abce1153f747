//! Query-string DTOs.

use serde::Deserialize;

/// Query parameters of the driver channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverChannelQuery {
    /// Re-send period in seconds.
    pub frequency: Option<u64>,
}

/// Query parameters of the observer channels.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObserverChannelQuery {
    /// Role of the observing party, informational.
    pub role: Option<String>,
    /// Re-send period in seconds (driver observers only).
    pub frequency: Option<u64>,
}

/// Query parameters of the availability search.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    /// Free-form address to search around.
    pub address: String,
    /// Search radius in kilometres.
    pub radius_km: Option<f64>,
    /// Maximum number of drivers returned.
    pub limit: Option<usize>,
}
