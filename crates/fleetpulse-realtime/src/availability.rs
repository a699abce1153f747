//! Nearest available drivers around an address.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use fleetpulse_core::config::AvailabilityConfig;
use fleetpulse_core::error::AppError;
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_geo::GeocodingProvider;

use crate::presence::PositionService;

/// A driver close enough to the searched address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDriver {
    /// Driver
    pub driver_id: DriverId,
    /// Last known latitude
    pub latitude: f64,
    /// Last known longitude
    pub longitude: f64,
    /// When that position was captured
    pub captured_at: DateTime<Utc>,
    /// Great-circle distance to the address
    pub distance_km: f64,
}

/// Ranks a tenant's recently seen drivers by distance to an address.
pub struct AvailabilitySearch {
    positions: Arc<PositionService>,
    geocoder: Arc<dyn GeocodingProvider>,
    config: AvailabilityConfig,
}

impl std::fmt::Debug for AvailabilitySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilitySearch")
            .field("config", &self.config)
            .finish()
    }
}

impl AvailabilitySearch {
    /// Create a search over the position service.
    pub fn new(
        positions: Arc<PositionService>,
        geocoder: Arc<dyn GeocodingProvider>,
        config: AvailabilityConfig,
    ) -> Self {
        Self {
            positions,
            geocoder,
            config,
        }
    }

    /// Drivers of `tenant_id` within `radius_km` of `address`, nearest first.
    pub async fn nearest_available(
        &self,
        tenant_id: TenantId,
        address: &str,
        radius_km: Option<f64>,
        limit: Option<usize>,
    ) -> AppResult<Vec<AvailableDriver>> {
        self.nearest_available_at(tenant_id, address, radius_km, limit, Utc::now())
            .await
    }

    /// Same as [`Self::nearest_available`], with positions aged against `now`.
    pub async fn nearest_available_at(
        &self,
        tenant_id: TenantId,
        address: &str,
        radius_km: Option<f64>,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AvailableDriver>> {
        let radius_km = radius_km.unwrap_or(self.config.default_radius_km);
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(AppError::validation("radius_km must be a positive number"));
        }
        let limit = limit.unwrap_or(self.config.default_limit);
        if limit == 0 {
            return Err(AppError::validation("limit must be at least 1"));
        }

        let origin = self.geocoder.resolve_address(address).await?;
        let max_age = TimeDelta::minutes(self.config.max_position_age_minutes);

        let mut found: Vec<AvailableDriver> = self
            .positions
            .all_last_known(tenant_id)
            .await?
            .into_iter()
            .filter(|p| now - p.captured_at <= max_age)
            .map(|p| AvailableDriver {
                distance_km: self.geocoder.distance_km(
                    origin.latitude,
                    origin.longitude,
                    p.latitude,
                    p.longitude,
                ),
                driver_id: p.driver_id,
                latitude: p.latitude,
                longitude: p.longitude,
                captured_at: p.captured_at,
            })
            .filter(|d| d.distance_km <= radius_km)
            .collect();

        found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        found.truncate(limit);

        debug!(
            tenant_id = %tenant_id,
            radius_km,
            results = found.len(),
            "Availability search"
        );
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use fleetpulse_core::error::ErrorKind;
    use fleetpulse_database::PositionStore;
    use fleetpulse_database::memory::{MemoryFleetDirectory, MemoryPositionStore};
    use fleetpulse_entity::{Coordinates, Position};

    use super::*;
    use crate::presence::PresenceCache;

    /// Resolves every address to central Paris; "down" is unavailable.
    struct FixedGeocoder;

    #[async_trait]
    impl GeocodingProvider for FixedGeocoder {
        async fn resolve_address(&self, address: &str) -> AppResult<Coordinates> {
            if address == "down" {
                return Err(AppError::geocoding_unavailable("exhausted"));
            }
            Coordinates::new(48.8566, 2.3522)
        }
    }

    struct Fixture {
        directory: Arc<MemoryFleetDirectory>,
        store: Arc<MemoryPositionStore>,
        search: AvailabilitySearch,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(MemoryFleetDirectory::new());
        let store = Arc::new(MemoryPositionStore::new());
        let positions = Arc::new(PositionService::new(
            store.clone(),
            directory.clone(),
            Arc::new(PresenceCache::new()),
        ));
        let search = AvailabilitySearch::new(
            positions,
            Arc::new(FixedGeocoder),
            AvailabilityConfig::default(),
        );
        Fixture {
            directory,
            store,
            search,
        }
    }

    async fn place(f: &Fixture, tenant: TenantId, lat: f64, lon: f64, at: DateTime<Utc>) -> DriverId {
        let driver = f.directory.add_driver(tenant);
        let position = Position::captured(driver, tenant, Coordinates::new(lat, lon).unwrap(), at);
        f.store.replace(&position).await.unwrap();
        driver
    }

    #[tokio::test]
    async fn test_sorted_by_distance_within_radius() {
        let f = fixture();
        let tenant = TenantId::new();
        let now = Utc::now();
        let far = place(&f, tenant, 48.90, 2.35, now).await; // ~5 km
        let near = place(&f, tenant, 48.86, 2.35, now).await; // <1 km
        place(&f, tenant, 45.76, 4.83, now).await; // Lyon

        let found = f
            .search
            .nearest_available_at(tenant, "Paris", None, None, now)
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|d| d.driver_id).collect();
        assert_eq!(ids, vec![near, far]);
        assert!(found[0].distance_km < found[1].distance_km);
    }

    #[tokio::test]
    async fn test_stale_positions_excluded_and_limit_applied() {
        let f = fixture();
        let tenant = TenantId::new();
        let now = Utc::now();
        place(&f, tenant, 48.86, 2.35, now - TimeDelta::minutes(16)).await;
        let a = place(&f, tenant, 48.857, 2.352, now).await;
        place(&f, tenant, 48.87, 2.36, now - TimeDelta::minutes(5)).await;

        let found = f
            .search
            .nearest_available_at(tenant, "Paris", Some(10.0), Some(1), now)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].driver_id, a);
    }

    #[tokio::test]
    async fn test_geocoding_failure_propagates() {
        let f = fixture();
        let err = f
            .search
            .nearest_available(TenantId::new(), "down", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::GeocodingUnavailable);
    }

    #[tokio::test]
    async fn test_invalid_parameters() {
        let f = fixture();
        let tenant = TenantId::new();
        for (radius, limit) in [(Some(0.0), None), (Some(f64::NAN), None), (None, Some(0))] {
            let err = f
                .search
                .nearest_available(tenant, "Paris", radius, limit)
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }
}
