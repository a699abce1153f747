//! Driver position entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use fleetpulse_core::error::AppError;
use fleetpulse_core::types::{DriverId, TenantId};

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90 to 90.
    pub latitude: f64,
    /// Longitude, -180 to 180.
    pub longitude: f64,
}

impl Coordinates {
    /// Builds coordinates after range checking both axes.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::validation(format!(
                "Latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::validation(format!(
                "Longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// The most recent known location of a driver.
///
/// The store holds at most one row per driver; a new report replaces the
/// previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Driver this position belongs to.
    pub driver_id: DriverId,
    /// Tenant of the driver at capture time.
    pub tenant_id: TenantId,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Server time at which the report was accepted.
    pub captured_at: DateTime<Utc>,
}

impl Position {
    /// Creates a position captured now.
    pub fn new(driver_id: DriverId, tenant_id: TenantId, coords: Coordinates) -> Self {
        Self::captured(driver_id, tenant_id, coords, Utc::now())
    }

    /// Creates a position with an explicit capture time.
    pub fn captured(
        driver_id: DriverId,
        tenant_id: TenantId,
        coords: Coordinates,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            driver_id,
            tenant_id,
            latitude: coords.latitude,
            longitude: coords.longitude,
            captured_at,
        }
    }

    /// Coordinates of this position.
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_in_range() {
        let c = Coordinates::new(48.8566, 2.3522).unwrap();
        assert_eq!(c.latitude, 48.8566);
        assert_eq!(c.longitude, 2.3522);
    }

    #[test]
    fn test_coordinates_out_of_range() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_position_serializes_camel_case() {
        let p = Position::new(
            DriverId::new(),
            TenantId::new(),
            Coordinates::new(1.0, 2.0).unwrap(),
        );
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("driverId").is_some());
        assert!(json.get("capturedAt").is_some());
    }
}
