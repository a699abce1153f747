//! Storage traits consumed by the presence and admission crates.

use async_trait::async_trait;

use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_entity::{PlanQuota, Position};

/// Authoritative store of each driver's latest position.
///
/// Implementations keep at most one row per driver: `replace` swaps the
/// previous row for the new one atomically, and never lets an older report
/// overwrite a newer row.
#[async_trait]
pub trait PositionStore: Send + Sync + 'static {
    /// Replaces the stored position of `position.driver_id` and returns the
    /// row now stored (the existing one when it is newer).
    async fn replace(&self, position: &Position) -> AppResult<Position>;

    /// Latest stored position of a driver.
    async fn find_by_driver(&self, driver_id: DriverId) -> AppResult<Option<Position>>;

    /// Latest stored positions of every driver of a tenant.
    async fn find_by_tenant(&self, tenant_id: TenantId) -> AppResult<Vec<Position>>;
}

/// Read-only view of drivers, tenants, and subscriptions owned by the
/// record-management side of the backend.
#[async_trait]
pub trait FleetDirectory: Send + Sync + 'static {
    /// Tenant of a driver.
    ///
    /// Fails with `NotFound` when the driver does not exist and returns
    /// `Ok(None)` when the driver exists without a tenant.
    async fn driver_tenant(&self, driver_id: DriverId) -> AppResult<Option<TenantId>>;

    /// Whether the tenant exists.
    async fn tenant_exists(&self, tenant_id: TenantId) -> AppResult<bool>;

    /// Quota of the tenant's active subscription, if any.
    async fn active_quota(&self, tenant_id: TenantId) -> AppResult<Option<PlanQuota>>;

    /// Number of drivers registered to the tenant.
    async fn driver_count(&self, tenant_id: TenantId) -> AppResult<u64>;
}
