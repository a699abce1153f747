//! Live driver connection record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use fleetpulse_core::types::{DriverId, TenantId};

/// An open driver connection, counted against the tenant's
/// simultaneous-connection quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Connected driver.
    pub driver_id: DriverId,
    /// Tenant the connection counts against.
    pub tenant_id: TenantId,
    /// When the connection was admitted.
    pub connected_at: DateTime<Utc>,
    /// Last admission or position message on this connection.
    pub last_activity_at: DateTime<Utc>,
}

impl ConnectionRecord {
    /// New record opened at `now`.
    pub fn open(driver_id: DriverId, tenant_id: TenantId, now: DateTime<Utc>) -> Self {
        Self {
            driver_id,
            tenant_id,
            connected_at: now,
            last_activity_at: now,
        }
    }

    /// Whether the record has been idle for longer than `staleness`.
    pub fn is_stale(&self, now: DateTime<Utc>, staleness: Duration) -> bool {
        now - self.last_activity_at > staleness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staleness_boundary() {
        let now = Utc::now();
        let record = ConnectionRecord::open(DriverId::new(), TenantId::new(), now);
        let hour = Duration::hours(1);
        assert!(!record.is_stale(now + hour, hour));
        assert!(record.is_stale(now + hour + Duration::seconds(1), hour));
    }
}
