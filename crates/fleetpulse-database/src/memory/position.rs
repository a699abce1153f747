//! In-memory position store.

use async_trait::async_trait;
use dashmap::DashMap;

use fleetpulse_core::result::AppResult;
use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_entity::Position;

use crate::store::PositionStore;

/// Position store keyed by driver; inserting replaces the previous row
/// unless that row is newer.
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    rows: DashMap<DriverId, Position>,
}

impl MemoryPositionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn replace(&self, position: &Position) -> AppResult<Position> {
        let mut row = self
            .rows
            .entry(position.driver_id)
            .or_insert_with(|| position.clone());
        if row.captured_at <= position.captured_at {
            *row = position.clone();
        }
        Ok(row.clone())
    }

    async fn find_by_driver(&self, driver_id: DriverId) -> AppResult<Option<Position>> {
        Ok(self.rows.get(&driver_id).map(|r| r.value().clone()))
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> AppResult<Vec<Position>> {
        let mut positions: Vec<Position> = self
            .rows
            .iter()
            .filter(|r| r.value().tenant_id == tenant_id)
            .map(|r| r.value().clone())
            .collect();
        positions.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        Ok(positions)
    }
}
