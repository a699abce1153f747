//! Geocoding collaborator trait.

use async_trait::async_trait;

use fleetpulse_core::result::AppResult;
use fleetpulse_entity::Coordinates;

use crate::distance::haversine_km;

/// Resolves addresses and measures distances.
///
/// `resolve_address` fails with `NotFound` when nothing matches the address
/// and with `ExternalService` for transport or response problems.
#[async_trait]
pub trait GeocodingProvider: Send + Sync + 'static {
    /// Coordinates of a free-text address.
    async fn resolve_address(&self, address: &str) -> AppResult<Coordinates>;

    /// Distance in kilometres between two points.
    fn distance_km(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        haversine_km(lat1, lon1, lat2, lon2)
    }
}
