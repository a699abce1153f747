//! Open driver connections, grouped per tenant.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::debug;

use fleetpulse_core::types::{DriverId, TenantId};
use fleetpulse_entity::ConnectionRecord;

/// Connection records of every tenant.
///
/// Each tenant's records live behind their own map entry, so admissions for
/// different tenants never contend and the purge/count/insert sequence for
/// one tenant is atomic.
#[derive(Debug)]
pub struct ConnectionTable {
    /// Tenant → (driver → record).
    tenants: DashMap<TenantId, HashMap<DriverId, ConnectionRecord>>,
    /// Idle time after which a record is abandoned.
    staleness: TimeDelta,
}

impl ConnectionTable {
    /// Creates an empty table with the given staleness window.
    pub fn new(staleness: TimeDelta) -> Self {
        Self {
            tenants: DashMap::new(),
            staleness,
        }
    }

    /// Admits `driver_id` if fewer than `limit` other drivers of the tenant
    /// hold a live connection.
    ///
    /// Stale records are purged first. A driver that already holds a record
    /// is not counted against itself; its record is refreshed. On refusal the
    /// number of other open connections is returned.
    pub fn try_open(
        &self,
        tenant_id: TenantId,
        driver_id: DriverId,
        limit: u64,
        now: DateTime<Utc>,
    ) -> Result<ConnectionRecord, u64> {
        let mut records = self.tenants.entry(tenant_id).or_default();
        purge(&mut records, now, self.staleness);

        let others = records.keys().filter(|id| **id != driver_id).count() as u64;
        if others >= limit {
            return Err(others);
        }

        let record = records
            .entry(driver_id)
            .and_modify(|r| r.last_activity_at = now)
            .or_insert_with(|| ConnectionRecord::open(driver_id, tenant_id, now))
            .clone();
        Ok(record)
    }

    /// Inserts or refreshes a record without any limit.
    pub fn open_unchecked(
        &self,
        tenant_id: TenantId,
        driver_id: DriverId,
        now: DateTime<Utc>,
    ) -> ConnectionRecord {
        self.tenants
            .entry(tenant_id)
            .or_default()
            .entry(driver_id)
            .and_modify(|r| r.last_activity_at = now)
            .or_insert_with(|| ConnectionRecord::open(driver_id, tenant_id, now))
            .clone()
    }

    /// Removes a driver's record. Returns `false` when there was none.
    pub fn release(&self, tenant_id: TenantId, driver_id: DriverId) -> bool {
        let removed = match self.tenants.get_mut(&tenant_id) {
            Some(mut records) => records.remove(&driver_id).is_some(),
            None => false,
        };
        self.tenants.remove_if(&tenant_id, |_, records| records.is_empty());
        removed
    }

    /// Refreshes the activity timestamp of an open record.
    pub fn touch(&self, tenant_id: TenantId, driver_id: DriverId, now: DateTime<Utc>) -> bool {
        self.tenants
            .get_mut(&tenant_id)
            .and_then(|mut records| {
                records
                    .get_mut(&driver_id)
                    .map(|r| r.last_activity_at = now)
            })
            .is_some()
    }

    /// Open (non-stale) records of a tenant.
    pub fn open_count(&self, tenant_id: TenantId, now: DateTime<Utc>) -> u64 {
        self.tenants
            .get(&tenant_id)
            .map(|records| {
                records
                    .values()
                    .filter(|r| !r.is_stale(now, self.staleness))
                    .count() as u64
            })
            .unwrap_or(0)
    }

    /// Whether the driver holds a live record.
    pub fn is_open(&self, tenant_id: TenantId, driver_id: DriverId, now: DateTime<Utc>) -> bool {
        self.tenants
            .get(&tenant_id)
            .and_then(|records| records.get(&driver_id).map(|r| !r.is_stale(now, self.staleness)))
            .unwrap_or(false)
    }

    /// Purges stale records of every tenant. Returns the number removed.
    pub fn purge_stale(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for mut entry in self.tenants.iter_mut() {
            removed += purge(entry.value_mut(), now, self.staleness);
        }
        self.tenants.retain(|_, records| !records.is_empty());
        removed
    }
}

fn purge(
    records: &mut HashMap<DriverId, ConnectionRecord>,
    now: DateTime<Utc>,
    staleness: TimeDelta,
) -> usize {
    let before = records.len();
    records.retain(|driver_id, r| {
        let keep = !r.is_stale(now, staleness);
        if !keep {
            debug!(driver_id = %driver_id, last_activity = %r.last_activity_at, "Purging stale connection record");
        }
        keep
    });
    before - records.len()
}
