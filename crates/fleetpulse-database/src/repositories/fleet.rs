//! Read-only queries against drivers and subscriptions.

use async_trait::async_trait;
use sqlx::PgPool;

use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_entity::PlanQuota;

use crate::store::FleetDirectory;

/// Fleet directory backed by the `drivers` and `subscriptions` tables.
#[derive(Debug, Clone)]
pub struct FleetRepository {
    pool: PgPool,
}

impl FleetRepository {
    /// Create a new fleet repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FleetDirectory for FleetRepository {
    async fn driver_tenant(&self, driver_id: DriverId) -> AppResult<Option<TenantId>> {
        let row: Option<Option<TenantId>> =
            sqlx::query_scalar("SELECT tenant_id FROM drivers WHERE id = $1")
                .bind(driver_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to find driver", e)
                })?;

        row.ok_or_else(|| AppError::not_found(format!("Driver {driver_id} not found")))
    }

    async fn tenant_exists(&self, tenant_id: TenantId) -> AppResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE id = $1)")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find tenant", e))
    }

    async fn active_quota(&self, tenant_id: TenantId) -> AppResult<Option<PlanQuota>> {
        sqlx::query_as::<_, PlanQuota>(
            "SELECT max_drivers, max_simultaneous_connections, alert_threshold_percent \
             FROM subscriptions \
             WHERE tenant_id = $1 AND status = 'active' \
               AND starts_at <= NOW() AND (ends_at IS NULL OR ends_at > NOW()) \
             ORDER BY starts_at DESC LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to resolve active subscription", e)
        })
    }

    async fn driver_count(&self, tenant_id: TenantId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drivers WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count tenant drivers", e)
            })?;
        Ok(count.max(0) as u64)
    }
}
