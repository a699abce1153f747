//! Driver position repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use fleetpulse_core::error::{AppError, ErrorKind};
use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_entity::Position;

use crate::store::PositionStore;

/// Repository for the one-row-per-driver position table.
#[derive(Debug, Clone)]
pub struct PositionRepository {
    pool: PgPool,
}

impl PositionRepository {
    /// Create a new position repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionStore for PositionRepository {
    async fn replace(&self, position: &Position) -> AppResult<Position> {
        // Concurrent writes for one driver serialize on the primary key; an
        // older report never overwrites a newer row.
        let written = sqlx::query_as::<_, Position>(
            "INSERT INTO driver_positions (driver_id, tenant_id, latitude, longitude, captured_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (driver_id) DO UPDATE SET \
                 tenant_id = EXCLUDED.tenant_id, \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 captured_at = EXCLUDED.captured_at \
             WHERE driver_positions.captured_at <= EXCLUDED.captured_at \
             RETURNING driver_id, tenant_id, latitude, longitude, captured_at",
        )
        .bind(position.driver_id)
        .bind(position.tenant_id)
        .bind(position.latitude)
        .bind(position.longitude)
        .bind(position.captured_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to store position", e))?;

        let stored = match written {
            Some(stored) => stored,
            None => {
                debug!(driver_id = %position.driver_id, "Older position ignored");
                self.find_by_driver(position.driver_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::new(
                            ErrorKind::Database,
                            format!("Position of driver {} vanished", position.driver_id),
                        )
                    })?
            }
        };

        debug!(driver_id = %stored.driver_id, "Position stored");
        Ok(stored)
    }

    async fn find_by_driver(&self, driver_id: DriverId) -> AppResult<Option<Position>> {
        sqlx::query_as::<_, Position>(
            "SELECT driver_id, tenant_id, latitude, longitude, captured_at \
             FROM driver_positions WHERE driver_id = $1",
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find position", e))
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> AppResult<Vec<Position>> {
        sqlx::query_as::<_, Position>(
            "SELECT p.driver_id, p.tenant_id, p.latitude, p.longitude, p.captured_at \
             FROM driver_positions p \
             JOIN drivers d ON d.id = p.driver_id \
             WHERE d.tenant_id = $1 \
             ORDER BY p.captured_at DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list tenant positions", e)
        })
    }
}
