//! In-memory fleet directory.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use fleetpulse_core::error::AppError;
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_entity::PlanQuota;

use crate::store::FleetDirectory;

/// Fleet directory held in process memory.
///
/// Drivers and subscriptions are registered through the inherent methods;
/// the [`FleetDirectory`] view is read-only.
#[derive(Debug, Default)]
pub struct MemoryFleetDirectory {
    /// Known tenants.
    tenants: DashSet<TenantId>,
    /// Driver → tenant (`None` for a driver without a tenant).
    drivers: DashMap<DriverId, Option<TenantId>>,
    /// Tenant → quota of the active subscription.
    subscriptions: DashMap<TenantId, PlanQuota>,
}

impl MemoryFleetDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tenant. Adding a driver or a subscription registers the
    /// tenant as well.
    pub fn add_tenant(&self, tenant_id: TenantId) {
        self.tenants.insert(tenant_id);
    }

    /// Registers a driver under a tenant and returns its id.
    pub fn add_driver(&self, tenant_id: TenantId) -> DriverId {
        self.tenants.insert(tenant_id);
        let driver_id = DriverId::new();
        self.drivers.insert(driver_id, Some(tenant_id));
        driver_id
    }

    /// Registers a driver that belongs to no tenant.
    pub fn add_unassigned_driver(&self) -> DriverId {
        let driver_id = DriverId::new();
        self.drivers.insert(driver_id, None);
        driver_id
    }

    /// Removes a driver.
    pub fn remove_driver(&self, driver_id: DriverId) {
        self.drivers.remove(&driver_id);
    }

    /// Activates (or replaces) a tenant's subscription.
    pub fn set_quota(&self, tenant_id: TenantId, quota: PlanQuota) {
        self.tenants.insert(tenant_id);
        self.subscriptions.insert(tenant_id, quota);
    }

    /// Ends a tenant's subscription.
    pub fn clear_quota(&self, tenant_id: TenantId) {
        self.subscriptions.remove(&tenant_id);
    }
}

#[async_trait]
impl FleetDirectory for MemoryFleetDirectory {
    async fn driver_tenant(&self, driver_id: DriverId) -> AppResult<Option<TenantId>> {
        self.drivers
            .get(&driver_id)
            .map(|r| *r.value())
            .ok_or_else(|| AppError::not_found(format!("Driver {driver_id} not found")))
    }

    async fn tenant_exists(&self, tenant_id: TenantId) -> AppResult<bool> {
        Ok(self.tenants.contains(&tenant_id))
    }

    async fn active_quota(&self, tenant_id: TenantId) -> AppResult<Option<PlanQuota>> {
        Ok(self.subscriptions.get(&tenant_id).map(|r| *r.value()))
    }

    async fn driver_count(&self, tenant_id: TenantId) -> AppResult<u64> {
        Ok(self
            .drivers
            .iter()
            .filter(|r| *r.value() == Some(tenant_id))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_driver_is_not_found() {
        let dir = MemoryFleetDirectory::new();
        let err = dir.driver_tenant(DriverId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_counts_only_tenant_drivers() {
        let dir = MemoryFleetDirectory::new();
        let tenant = TenantId::new();
        dir.add_driver(tenant);
        dir.add_driver(tenant);
        dir.add_driver(TenantId::new());
        let orphan = dir.add_unassigned_driver();

        assert_eq!(dir.driver_count(tenant).await.unwrap(), 2);
        assert_eq!(dir.driver_tenant(orphan).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tenants_known_through_drivers_and_plans() {
        let dir = MemoryFleetDirectory::new();
        let with_driver = TenantId::new();
        let with_plan = TenantId::new();
        let bare = TenantId::new();
        dir.add_driver(with_driver);
        dir.set_quota(
            with_plan,
            PlanQuota {
                max_drivers: 1,
                max_simultaneous_connections: 1,
                alert_threshold_percent: 80,
            },
        );
        dir.add_tenant(bare);

        for tenant in [with_driver, with_plan, bare] {
            assert!(dir.tenant_exists(tenant).await.unwrap());
        }
        assert!(!dir.tenant_exists(TenantId::new()).await.unwrap());
    }
}
