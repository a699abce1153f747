//! Position service: store-authoritative reads and writes of driver positions.

use std::sync::Arc;

use tracing::{debug, error};

use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_database::{FleetDirectory, PositionStore};
use fleetpulse_entity::{Coordinates, Position};

use super::cache::PresenceCache;

/// Records and reads last known positions.
///
/// The store is written first; the cache only sees a position once the
/// store has accepted it.
pub struct PositionService {
    /// Authoritative store
    store: Arc<dyn PositionStore>,
    /// Driver/tenant directory
    directory: Arc<dyn FleetDirectory>,
    /// Derived cache
    cache: Arc<PresenceCache>,
}

impl std::fmt::Debug for PositionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionService")
            .field("cached_drivers", &self.cache.len())
            .finish()
    }
}

impl PositionService {
    /// Create a service over the given store and directory.
    pub fn new(
        store: Arc<dyn PositionStore>,
        directory: Arc<dyn FleetDirectory>,
        cache: Arc<PresenceCache>,
    ) -> Self {
        Self {
            store,
            directory,
            cache,
        }
    }

    /// Replaces the driver's stored position and returns the stored record.
    ///
    /// Fails with `NotFound` for an unknown driver, `Validation` for
    /// out-of-range coordinates, and `InvalidTenant` for a driver without a
    /// tenant. A store failure leaves the cache untouched.
    pub async fn record_position(
        &self,
        driver_id: DriverId,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<Position> {
        let coords = Coordinates::new(latitude, longitude)?;
        let tenant_id = self.require_tenant(driver_id).await?;

        let position = Position::new(driver_id, tenant_id, coords);
        let stored = self.store.replace(&position).await.map_err(|e| {
            error!(driver_id = %driver_id, error = %e, "Failed to persist driver position");
            e
        })?;

        self.cache.put(stored.clone());
        debug!(
            driver_id = %driver_id,
            latitude = stored.latitude,
            longitude = stored.longitude,
            "Position recorded"
        );
        Ok(stored)
    }

    /// Last known position; a cache miss falls back to the store and
    /// repopulates the cache.
    pub async fn last_known(&self, driver_id: DriverId) -> AppResult<Option<Position>> {
        if let Some(position) = self.cache.get(driver_id) {
            return Ok(Some(position));
        }
        let stored = self.store.find_by_driver(driver_id).await?;
        Ok(stored.map(|position| {
            self.cache.put(position.clone());
            self.cache.get(driver_id).unwrap_or(position)
        }))
    }

    /// Last known position of every driver of a tenant, read from the store.
    ///
    /// The cache is refreshed from the result; where the cache already holds
    /// a newer position, that one is returned.
    pub async fn all_last_known(&self, tenant_id: TenantId) -> AppResult<Vec<Position>> {
        let stored = self.store.find_by_tenant(tenant_id).await?;
        Ok(stored
            .into_iter()
            .map(|position| {
                let driver_id = position.driver_id;
                self.cache.put(position.clone());
                self.cache.get(driver_id).unwrap_or(position)
            })
            .collect())
    }

    /// Cached position only, without touching the store.
    pub fn cached(&self, driver_id: DriverId) -> Option<Position> {
        self.cache.get(driver_id)
    }

    /// Offers a position to the cache (monotonic).
    pub fn refresh_cache(&self, position: &Position) -> bool {
        self.cache.put(position.clone())
    }

    /// `NotFound` unless the tenant exists.
    pub async fn require_known_tenant(&self, tenant_id: TenantId) -> AppResult<()> {
        if self.directory.tenant_exists(tenant_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Tenant {tenant_id} not found")))
        }
    }

    /// Tenant of an existing driver; `InvalidTenant` when it has none.
    pub async fn require_tenant(&self, driver_id: DriverId) -> AppResult<TenantId> {
        self.directory.driver_tenant(driver_id).await?.ok_or_else(|| {
            AppError::new(
                ErrorKind::InvalidTenant,
                format!("Driver {driver_id} does not belong to a tenant"),
            )
        })
    }
}
